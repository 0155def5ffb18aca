//! Raw Annex-B elementary stream demuxer.
//!
//! Reads an `.h264`/`.h265` byte stream from any [`AsyncRead`] and hands out
//! one [`Packet`] per frame. Raw streams carry no timestamps, so packet
//! timestamps come from the SPS timing info or the configured defaults.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::Demuxer;
use crate::av::{CodecData, CodecType, Packet};
use crate::codec::es::{Codec, EsParser};
use crate::codec::h264::Avc;
use crate::codec::h265::Hevc;
use crate::{Result, VdkError};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Demuxer for raw H.264 streams
pub type AvcDemuxer<R> = EsDemuxer<R, Avc>;

/// Demuxer for raw H.265 streams
pub type HevcDemuxer<R> = EsDemuxer<R, Hevc>;

/// Stream description built from the parser's parameter sets.
#[derive(Debug, Clone)]
pub struct EsCodecData {
    codec_type: CodecType,
    width: u32,
    height: u32,
    record: Bytes,
}

impl CodecData for EsCodecData {
    fn codec_type(&self) -> CodecType {
        self.codec_type
    }

    fn width(&self) -> Option<u32> {
        Some(self.width)
    }

    fn height(&self) -> Option<u32> {
        Some(self.height)
    }

    fn extra_data(&self) -> Option<&[u8]> {
        Some(&self.record)
    }
}

pub struct EsDemuxer<R: AsyncRead + Unpin + Send, C: Codec> {
    reader: R,
    parser: EsParser<C>,
    chunk_size: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin + Send, C: Codec> EsDemuxer<R, C> {
    pub fn new(reader: R) -> Self {
        Self::with_parser(reader, EsParser::new())
    }

    /// Uses a preconfigured parser, e.g. one with a container default duration.
    pub fn with_parser(reader: R, parser: EsParser<C>) -> Self {
        Self {
            reader,
            parser,
            chunk_size: DEFAULT_CHUNK_SIZE,
            eof: false,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn parser(&self) -> &EsParser<C> {
        &self.parser
    }

    /// Reads one chunk into the parser, flushing it at end of input.
    async fn fill(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            log::debug!("{} stream ended", C::NAME);
            self.parser.flush();
            self.eof = true;
        } else {
            self.parser.add_bytes(&buf[..n]);
        }
        Ok(())
    }

    /// Packets until the end of the input.
    pub fn into_stream(self) -> impl Stream<Item = Result<Packet>> {
        stream::unfold(Some(self), |state| async move {
            let mut demuxer = state?;
            match demuxer.read_packet().await {
                Ok(packet) => Some((Ok(packet), Some(demuxer))),
                Err(VdkError::EndOfStream) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send, C: Codec> Demuxer for EsDemuxer<R, C> {
    async fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if self.parser.frame_available() {
                let frame = self.parser.get_frame()?;
                return Ok(Packet::from(frame).with_stream_index(0));
            }
            if self.eof {
                return Err(VdkError::EndOfStream);
            }
            self.fill().await?;
        }
    }

    async fn streams(&mut self) -> Result<Vec<Box<dyn CodecData>>> {
        while !self.parser.headers_parsed() && !self.eof {
            self.fill().await?;
        }

        let record = self
            .parser
            .get_configuration_record()
            .ok_or_else(|| VdkError::InvalidData(format!("no {} parameter sets in stream", C::NAME)))?;
        Ok(vec![Box::new(EsCodecData {
            codec_type: C::CODEC_TYPE,
            width: self.parser.width()?,
            height: self.parser.height()?,
            record,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const AUD: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x09, 0xF0];

    #[tokio::test]
    async fn test_stream_without_parameter_sets() {
        let mut demuxer = AvcDemuxer::new(AUD);
        assert!(matches!(demuxer.streams().await, Err(VdkError::InvalidData(_))));
        assert!(matches!(demuxer.read_packet().await, Err(VdkError::EndOfStream)));
    }

    #[tokio::test]
    async fn test_read_error_is_propagated() {
        let reader = Builder::new()
            .read(AUD)
            .read_error(std::io::Error::new(std::io::ErrorKind::Other, "gone"))
            .build();
        let mut demuxer = HevcDemuxer::new(reader).with_chunk_size(4);
        assert!(matches!(demuxer.read_packet().await, Err(VdkError::Io(_))));
    }
}
