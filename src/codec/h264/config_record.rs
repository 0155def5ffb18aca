use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::types::AVCC_EXTENDED_PROFILES;
use crate::error::{Result, VdkError};

/// AVCDecoderConfigurationRecord (ISO/IEC 14496-15, 5.3.3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvccRecord {
    pub profile_idc: u8,
    pub profile_compatibility: u8,
    pub level_idc: u8,
    pub length_size_minus_one: u8,
    pub sps: Vec<Bytes>,
    pub pps: Vec<Bytes>,
    /// chroma_format, bit_depth_luma_minus8, bit_depth_chroma_minus8 for high profiles
    pub high_profile: Option<HighProfileExtension>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighProfileExtension {
    pub chroma_format: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
}

const CONFIGURATION_VERSION: u8 = 1;

fn truncated() -> VdkError {
    VdkError::InvalidData("truncated avcC record".into())
}

impl AvccRecord {
    pub fn to_bytes(&self) -> Bytes {
        let size = 7
            + self.sps.iter().map(|s| s.len() + 2).sum::<usize>()
            + self.pps.iter().map(|p| p.len() + 2).sum::<usize>()
            + 4;
        let mut buf = BytesMut::with_capacity(size);

        buf.put_u8(CONFIGURATION_VERSION);
        buf.put_u8(self.profile_idc);
        buf.put_u8(self.profile_compatibility);
        buf.put_u8(self.level_idc);
        buf.put_u8(0xFC | (self.length_size_minus_one & 0x03));

        buf.put_u8(0xE0 | (self.sps.len() as u8 & 0x1F));
        for sps in &self.sps {
            buf.put_u16(sps.len() as u16);
            buf.put_slice(sps);
        }
        buf.put_u8(self.pps.len() as u8);
        for pps in &self.pps {
            buf.put_u16(pps.len() as u16);
            buf.put_slice(pps);
        }

        if let Some(ext) = self.high_profile {
            buf.put_u8(0xFC | (ext.chroma_format & 0x03));
            buf.put_u8(0xF8 | (ext.bit_depth_luma_minus8 & 0x07));
            buf.put_u8(0xF8 | (ext.bit_depth_chroma_minus8 & 0x07));
            buf.put_u8(0); // numOfSequenceParameterSetExt
        }

        buf.freeze()
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        if buf.remaining() < 6 {
            return Err(truncated());
        }

        let version = buf.get_u8();
        if version != CONFIGURATION_VERSION {
            return Err(VdkError::InvalidData(format!("unsupported avcC version {}", version)));
        }
        let profile_idc = buf.get_u8();
        let profile_compatibility = buf.get_u8();
        let level_idc = buf.get_u8();
        let length_size_minus_one = buf.get_u8() & 0x03;

        let num_sps = (buf.get_u8() & 0x1F) as usize;
        let sps = read_nalus(&mut buf, num_sps)?;
        if !buf.has_remaining() {
            return Err(truncated());
        }
        let num_pps = buf.get_u8() as usize;
        let pps = read_nalus(&mut buf, num_pps)?;

        // Many muxers leave out the extension even for high profiles
        let high_profile = if AVCC_EXTENDED_PROFILES.contains(&profile_idc) && buf.remaining() >= 4 {
            Some(HighProfileExtension {
                chroma_format: buf.get_u8() & 0x03,
                bit_depth_luma_minus8: buf.get_u8() & 0x07,
                bit_depth_chroma_minus8: buf.get_u8() & 0x07,
            })
        } else {
            None
        };

        Ok(AvccRecord {
            profile_idc,
            profile_compatibility,
            level_idc,
            length_size_minus_one,
            sps,
            pps,
            high_profile,
        })
    }
}

fn read_nalus(buf: &mut &[u8], count: usize) -> Result<Vec<Bytes>> {
    let mut nalus = Vec::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < 2 {
            return Err(truncated());
        }
        let size = buf.get_u16() as usize;
        if buf.remaining() < size {
            return Err(truncated());
        }
        nalus.push(buf.copy_to_bytes(size));
    }
    Ok(nalus)
}
