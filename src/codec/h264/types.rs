use lazy_static::lazy_static;
use std::collections::HashMap;

/// H.264 NAL unit types (ITU-T H.264 table 7-1).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    Unspecified = 0,
    CodedSliceNonIdr = 1,
    CodedSliceDataPartitionA = 2,
    CodedSliceDataPartitionB = 3,
    CodedSliceDataPartitionC = 4,
    CodedSliceIdr = 5,
    Sei = 6,
    Sps = 7,
    Pps = 8,
    AccessUnitDelimiter = 9,
    EndOfSequence = 10,
    EndOfStream = 11,
    FillerData = 12,
    SpsExtension = 13,
    PrefixNalu = 14,
    SubsetSps = 15,
    AuxiliarySlice = 19,
    SliceExtension = 20,
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NalUnitType::CodedSliceNonIdr,
            2 => NalUnitType::CodedSliceDataPartitionA,
            3 => NalUnitType::CodedSliceDataPartitionB,
            4 => NalUnitType::CodedSliceDataPartitionC,
            5 => NalUnitType::CodedSliceIdr,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::AccessUnitDelimiter,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::FillerData,
            13 => NalUnitType::SpsExtension,
            14 => NalUnitType::PrefixNalu,
            15 => NalUnitType::SubsetSps,
            19 => NalUnitType::AuxiliarySlice,
            20 => NalUnitType::SliceExtension,
            _ => NalUnitType::Unspecified,
        }
    }
}

/// nal_unit_type from the low five bits of the header byte.
pub fn nalu_type(data: &[u8]) -> u8 {
    data.first().map_or(0, |b| b & 0x1F)
}

pub fn nal_ref_idc(data: &[u8]) -> u8 {
    data.first().map_or(0, |b| (b >> 5) & 0x03)
}

/// slice_type values after reducing modulo 5.
pub const SLICE_TYPE_P: u32 = 0;
pub const SLICE_TYPE_B: u32 = 1;
pub const SLICE_TYPE_I: u32 = 2;
pub const SLICE_TYPE_SP: u32 = 3;
pub const SLICE_TYPE_SI: u32 = 4;

/// profile_idc values whose SPS carries chroma format and bit depth fields.
pub const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// profile_idc values whose avcC record carries the chroma/bit depth extension.
pub const AVCC_EXTENDED_PROFILES: [u8; 4] = [100, 110, 122, 144];

lazy_static! {
    static ref NALU_TYPE_NAMES: HashMap<u8, &'static str> = {
        let mut names = HashMap::new();
        names.insert(0, "unspecified");
        names.insert(1, "non-IDR slice");
        names.insert(2, "slice data partition A");
        names.insert(3, "slice data partition B");
        names.insert(4, "slice data partition C");
        names.insert(5, "IDR slice");
        names.insert(6, "SEI");
        names.insert(7, "SPS");
        names.insert(8, "PPS");
        names.insert(9, "access unit delimiter");
        names.insert(10, "end of sequence");
        names.insert(11, "end of stream");
        names.insert(12, "filler data");
        names.insert(13, "SPS extension");
        names.insert(14, "prefix NALU");
        names.insert(15, "subset SPS");
        names.insert(19, "auxiliary slice");
        names.insert(20, "slice extension");
        names
    };
}

pub fn nalu_type_name(nalu_type: u8) -> &'static str {
    NALU_TYPE_NAMES.get(&nalu_type).copied().unwrap_or("reserved")
}
