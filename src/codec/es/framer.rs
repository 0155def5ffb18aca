use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Result, VdkError};
use crate::utils::rbsp::trimmed_len;

/// A NAL unit cut out of the input, without start code or size field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nalu {
    /// NALU bytes starting with the NAL unit header
    pub data: Bytes,
    /// Absolute offset of the start code (or size field) in the input
    pub position: u64,
}

/// Splits Annex-B byte streams and length-prefixed buffers into NAL units.
///
/// Input may be cut at any byte; an unfinished NALU is carried over until the
/// next start code or [`NaluFramer::flush`].
#[derive(Debug, Default)]
pub struct NaluFramer {
    unparsed: BytesMut,
    // absolute offset of unparsed[0]
    position: u64,
    // marker length of the NALU open at unparsed[0]
    open: Option<usize>,
    scan_from: usize,
}

impl NaluFramer {
    /// Creates an empty framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bytes handed to the framer so far.
    pub fn stream_position(&self) -> u64 {
        self.position + self.unparsed.len() as u64
    }

    /// Appends Annex-B data and returns every NALU completed by it.
    pub fn add_bytes(&mut self, data: &[u8]) -> Vec<Nalu> {
        self.unparsed.extend_from_slice(data);
        let mut nalus = Vec::new();

        while let Some(marker) = find_start_code(&self.unparsed, self.scan_from) {
            let lower_bound = self.open.unwrap_or(0);
            let (marker_start, marker_len) = if marker > lower_bound && self.unparsed[marker - 1] == 0 {
                (marker - 1, 4)
            } else {
                (marker, 3)
            };

            match self.open {
                Some(header_len) => {
                    let chunk = self.unparsed.split_to(marker_start).freeze();
                    if let Some(nalu) = Self::cut(chunk, header_len, self.position) {
                        nalus.push(nalu);
                    }
                }
                None => self.unparsed.advance(marker_start),
            }

            self.position += marker_start as u64;
            self.open = Some(marker_len);
            self.scan_from = marker_len;
        }

        match self.open {
            Some(header_len) => {
                self.scan_from = self.unparsed.len().saturating_sub(2).max(header_len);
            }
            None => {
                // Garbage before the first start code; keep what may be a partial marker.
                let keep = self.unparsed.len().min(3);
                let dropped = self.unparsed.len() - keep;
                self.unparsed.advance(dropped);
                self.position += dropped as u64;
                self.scan_from = 0;
            }
        }

        nalus
    }

    /// Splits a buffer of big-endian length-prefixed NALUs.
    ///
    /// `width` is the size field length in bytes and must be 1-4. A size
    /// overrunning the buffer ends processing of the buffer.
    pub fn add_bytes_framed(&mut self, data: &[u8], width: usize) -> Result<Vec<Nalu>> {
        if !(1..=4).contains(&width) {
            return Err(VdkError::InvalidData(format!(
                "invalid NALU size field width {}",
                width
            )));
        }

        let base = self.stream_position();
        let mut nalus = Vec::new();
        let mut offset = 0;

        while offset + width <= data.len() {
            let size = data[offset..offset + width]
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize);
            let start = offset + width;

            if size == 0 {
                offset = start;
                continue;
            }
            if start + size > data.len() {
                log::warn!(
                    "NALU size {} at offset {} exceeds the {} bytes left in the buffer",
                    size,
                    offset,
                    data.len() - start
                );
                break;
            }

            nalus.push(Nalu {
                data: Bytes::copy_from_slice(&data[start..start + size]),
                position: base + offset as u64,
            });
            offset = start + size;
        }

        self.position += data.len() as u64;
        Ok(nalus)
    }

    /// Emits the carried tail as a final NALU if it holds a start code and payload.
    pub fn flush(&mut self) -> Option<Nalu> {
        let tail_len = self.unparsed.len() as u64;
        let nalu = match self.open {
            Some(header_len) if tail_len >= 5 => {
                let chunk = self.unparsed.split().freeze();
                Self::cut(chunk, header_len, self.position)
            }
            _ => None,
        };

        self.position += tail_len;
        self.unparsed.clear();
        self.open = None;
        self.scan_from = 0;
        nalu
    }

    /// Drops the carried tail without emitting it.
    pub fn clear(&mut self) {
        self.position += self.unparsed.len() as u64;
        self.unparsed.clear();
        self.open = None;
        self.scan_from = 0;
    }

    fn cut(chunk: Bytes, header_len: usize, position: u64) -> Option<Nalu> {
        let end = header_len + trimmed_len(&chunk[header_len..]);
        if end == header_len {
            return None;
        }
        Some(Nalu {
            data: chunk.slice(header_len..end),
            position,
        })
    }
}

fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    if data.len() < 3 {
        return None;
    }
    (from..data.len() - 2).find(|&i| data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    fn payloads(nalus: &[Nalu]) -> Vec<Vec<u8>> {
        nalus.iter().map(|n| n.data.to_vec()).collect()
    }

    #[test]
    fn test_start_code_forms() {
        let mut framer = NaluFramer::new();
        let stream = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, // 4-byte marker
            0x00, 0x00, 0x01, 0x68, 0xCE, 0x00, 0x00, // 3-byte marker, padded
            0x00, 0x00, 0x01, 0x65, 0x88, 0x84,
        ];

        let nalus = framer.add_bytes(&stream);
        assert_eq!(payloads(&nalus), vec![vec![0x67, 0x42], vec![0x68, 0xCE]]);
        assert_eq!(nalus[0].position, 0);
        assert_eq!(nalus[1].position, 6);

        let last = framer.flush().unwrap();
        assert_eq!(last.data.to_vec(), vec![0x65, 0x88, 0x84]);
        assert_eq!(last.position, 12);
    }

    #[test]
    fn test_leading_garbage_is_discarded() {
        let mut framer = NaluFramer::new();
        let nalus = framer.add_bytes(&[0xAA, 0xBB, 0x00, 0x00, 0x01, 0x09, 0xF0, 0x00, 0x00, 0x01]);
        assert_eq!(payloads(&nalus), vec![vec![0x09, 0xF0]]);
        assert_eq!(nalus[0].position, 2);
    }

    #[test]
    fn test_start_code_split_across_calls() {
        let mut framer = NaluFramer::new();
        assert!(framer.add_bytes(&[0x00, 0x00]).is_empty());
        assert!(framer.add_bytes(&[0x01, 0x67, 0x42, 0x00]).is_empty());
        let nalus = framer.add_bytes(&[0x00, 0x01, 0x68, 0xCE, 0x3C, 0x80]);
        assert_eq!(payloads(&nalus), vec![vec![0x67, 0x42]]);
        assert_eq!(framer.flush().unwrap().data.to_vec(), vec![0x68, 0xCE, 0x3C, 0x80]);
    }

    #[test]
    fn test_flush_requires_complete_tail() {
        let mut framer = NaluFramer::new();
        framer.add_bytes(&[0x00, 0x00, 0x01, 0x09]);
        assert_eq!(framer.flush(), None);

        framer.add_bytes(&[0x12, 0x34]);
        assert_eq!(framer.flush(), None);
        assert_eq!(framer.stream_position(), 6);
    }

    #[test]
    fn test_empty_nalus_are_dropped() {
        let mut framer = NaluFramer::new();
        let nalus = framer.add_bytes(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x09, 0x10, 0x00, 0x00, 0x01]);
        assert_eq!(payloads(&nalus), vec![vec![0x09, 0x10]]);
    }

    #[test]
    fn test_framed_input() {
        let mut framer = NaluFramer::new();
        let data = [0x00, 0x02, 0x67, 0x42, 0x00, 0x00, 0x00, 0x01, 0x68, 0x00, 0x05, 0x65];

        let nalus = framer.add_bytes_framed(&data, 2).unwrap();
        assert_eq!(payloads(&nalus), vec![vec![0x67, 0x42], vec![0x68]]);
        assert_eq!(nalus[1].position, 6);
        assert_eq!(framer.stream_position(), data.len() as u64);

        assert!(framer.add_bytes_framed(&data, 0).is_err());
        assert!(framer.add_bytes_framed(&data, 5).is_err());
    }

    #[test]
    fn test_framed_one_byte_sizes() {
        let mut framer = NaluFramer::new();
        let nalus = framer.add_bytes_framed(&[0x01, 0x09, 0x02, 0x41, 0x9A], 1).unwrap();
        assert_eq!(payloads(&nalus), vec![vec![0x09], vec![0x41, 0x9A]]);
    }

    #[quickcheck]
    fn prop_chunking_does_not_change_output(payload: Vec<Vec<u8>>, cuts: Vec<u8>) -> bool {
        let mut stream = Vec::new();
        for body in &payload {
            stream.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x41]);
            // keep bodies free of start codes
            stream.extend(body.iter().map(|&b| b | 0x80));
        }

        let mut whole = NaluFramer::new();
        let mut expected = whole.add_bytes(&stream);
        expected.extend(whole.flush());

        let mut chunked = NaluFramer::new();
        let mut actual = Vec::new();
        let mut offset = 0;
        for cut in cuts {
            let end = (offset + cut as usize % 7).min(stream.len());
            actual.extend(chunked.add_bytes(&stream[offset..end]));
            offset = end;
        }
        actual.extend(chunked.add_bytes(&stream[offset..]));
        actual.extend(chunked.flush());

        expected == actual
    }
}
