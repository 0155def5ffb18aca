use bytes::{BufMut, Bytes, BytesMut};

use super::parameter_sets::ProfileTierLevel;
use crate::error::{Result, VdkError};
use crate::utils::{BitReader, BitWriter};

/// One NALU array of an hvcC record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaluArray {
    pub array_completeness: bool,
    pub nalu_type: u8,
    pub nalus: Vec<Bytes>,
}

/// HEVCDecoderConfigurationRecord (ISO/IEC 14496-15, 8.3.3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HvccRecord {
    pub profile_tier_level: ProfileTierLevel,
    pub min_spatial_segmentation_idc: u16,
    pub parallelism_type: u8,
    pub chroma_format_idc: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub avg_frame_rate: u16,
    pub constant_frame_rate: u8,
    pub num_temporal_layers: u8,
    pub temporal_id_nested: bool,
    pub length_size_minus_one: u8,
    pub arrays: Vec<NaluArray>,
}

const CONFIGURATION_VERSION: u8 = 1;
const HEADER_SIZE: usize = 23;

impl HvccRecord {
    /// Serializes the record.
    pub fn to_bytes(&self) -> Bytes {
        let ptl = &self.profile_tier_level;
        let mut header = BitWriter::new();
        header.write_bits(CONFIGURATION_VERSION as u64, 8);
        header.write_bits(ptl.profile_space as u64, 2);
        header.write_bit(ptl.tier_flag);
        header.write_bits(ptl.profile_idc as u64, 5);
        header.write_bits(ptl.profile_compatibility_flags as u64, 32);
        header.write_bits(ptl.constraint_indicator_flags, 48);
        header.write_bits(ptl.level_idc as u64, 8);
        header.write_bits(0b1111, 4);
        header.write_bits(self.min_spatial_segmentation_idc as u64, 12);
        header.write_bits(0b11_1111, 6);
        header.write_bits(self.parallelism_type as u64, 2);
        header.write_bits(0b11_1111, 6);
        header.write_bits(self.chroma_format_idc as u64, 2);
        header.write_bits(0b1_1111, 5);
        header.write_bits(self.bit_depth_luma_minus8 as u64, 3);
        header.write_bits(0b1_1111, 5);
        header.write_bits(self.bit_depth_chroma_minus8 as u64, 3);
        header.write_bits(self.avg_frame_rate as u64, 16);
        header.write_bits(self.constant_frame_rate as u64, 2);
        header.write_bits(self.num_temporal_layers as u64, 3);
        header.write_bit(self.temporal_id_nested);
        header.write_bits(self.length_size_minus_one as u64, 2);
        header.write_bits(self.arrays.len() as u64, 8);

        let mut buf = BytesMut::from(&header.into_bytes()[..]);
        for array in &self.arrays {
            buf.put_u8(((array.array_completeness as u8) << 7) | (array.nalu_type & 0x3F));
            buf.put_u16(array.nalus.len() as u16);
            for nalu in &array.nalus {
                buf.put_u16(nalu.len() as u16);
                buf.put_slice(nalu);
            }
        }
        buf.freeze()
    }

    /// Parses a serialized record.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(VdkError::InvalidData(format!(
                "hvcC record of {} bytes is too short",
                data.len()
            )));
        }

        let mut reader = BitReader::new(&data[..HEADER_SIZE]);
        let version = reader.read_bits(8)? as u8;
        if version != CONFIGURATION_VERSION {
            return Err(VdkError::InvalidData(format!("unsupported hvcC version {}", version)));
        }

        let profile_tier_level = ProfileTierLevel {
            profile_space: reader.read_bits(2)? as u8,
            tier_flag: reader.read_bit()?,
            profile_idc: reader.read_bits(5)? as u8,
            profile_compatibility_flags: reader.read_bits(32)?,
            constraint_indicator_flags: reader.read_bits_u64(48)?,
            level_idc: reader.read_bits(8)? as u8,
        };
        reader.skip_bits(4)?;
        let min_spatial_segmentation_idc = reader.read_bits(12)? as u16;
        reader.skip_bits(6)?;
        let parallelism_type = reader.read_bits(2)? as u8;
        reader.skip_bits(6)?;
        let chroma_format_idc = reader.read_bits(2)? as u8;
        reader.skip_bits(5)?;
        let bit_depth_luma_minus8 = reader.read_bits(3)? as u8;
        reader.skip_bits(5)?;
        let bit_depth_chroma_minus8 = reader.read_bits(3)? as u8;
        let avg_frame_rate = reader.read_bits(16)? as u16;
        let constant_frame_rate = reader.read_bits(2)? as u8;
        let num_temporal_layers = reader.read_bits(3)? as u8;
        let temporal_id_nested = reader.read_bit()?;
        let length_size_minus_one = reader.read_bits(2)? as u8;
        let num_arrays = reader.read_bits(8)? as usize;

        let mut pos = HEADER_SIZE;
        let mut arrays = Vec::with_capacity(num_arrays);
        for _ in 0..num_arrays {
            let header = read_slice(data, &mut pos, 3)?;
            let mut array = NaluArray {
                array_completeness: header[0] & 0x80 != 0,
                nalu_type: header[0] & 0x3F,
                nalus: Vec::new(),
            };
            let count = u16::from_be_bytes([header[1], header[2]]);
            for _ in 0..count {
                let size = read_slice(data, &mut pos, 2)?;
                let size = u16::from_be_bytes([size[0], size[1]]) as usize;
                array.nalus.push(Bytes::copy_from_slice(read_slice(data, &mut pos, size)?));
            }
            arrays.push(array);
        }

        Ok(HvccRecord {
            profile_tier_level,
            min_spatial_segmentation_idc,
            parallelism_type,
            chroma_format_idc,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            avg_frame_rate,
            constant_frame_rate,
            num_temporal_layers,
            temporal_id_nested,
            length_size_minus_one,
            arrays,
        })
    }
}

fn read_slice<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let slice = data
        .get(*pos..*pos + len)
        .ok_or_else(|| VdkError::InvalidData("truncated hvcC NALU array".into()))?;
    *pos += len;
    Ok(slice)
}
