use lazy_static::lazy_static;
use std::collections::HashMap;

/// H.265 NAL unit types (ITU-T H.265 table 7-1).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    TrailN = 0,
    TrailR = 1,
    TsaN = 2,
    TsaR = 3,
    StsaN = 4,
    StsaR = 5,
    RadlN = 6,
    RadlR = 7,
    RaslN = 8,
    RaslR = 9,
    RsvVclN10 = 10,
    RsvVclN12 = 12,
    RsvVclN14 = 14,
    BlaWLp = 16,
    BlaWRadl = 17,
    BlaNLp = 18,
    IdrWRadl = 19,
    IdrNLp = 20,
    CraNut = 21,
    RsvIrapVcl22 = 22,
    RsvIrapVcl23 = 23,
    Vps = 32,
    Sps = 33,
    Pps = 34,
    Aud = 35,
    Eos = 36,
    Eob = 37,
    Fd = 38,
    PrefixSei = 39,
    SuffixSei = 40,
    /// Dolby Vision RPU
    Unspec62 = 62,
    /// Dolby Vision enhancement layer
    Unspec63 = 63,
}

impl NalUnitType {
    pub fn from_u8(value: u8) -> Option<Self> {
        use NalUnitType::*;
        let nal_type = match value {
            0 => TrailN,
            1 => TrailR,
            2 => TsaN,
            3 => TsaR,
            4 => StsaN,
            5 => StsaR,
            6 => RadlN,
            7 => RadlR,
            8 => RaslN,
            9 => RaslR,
            10 => RsvVclN10,
            12 => RsvVclN12,
            14 => RsvVclN14,
            16 => BlaWLp,
            17 => BlaWRadl,
            18 => BlaNLp,
            19 => IdrWRadl,
            20 => IdrNLp,
            21 => CraNut,
            22 => RsvIrapVcl22,
            23 => RsvIrapVcl23,
            32 => Vps,
            33 => Sps,
            34 => Pps,
            35 => Aud,
            36 => Eos,
            37 => Eob,
            38 => Fd,
            39 => PrefixSei,
            40 => SuffixSei,
            62 => Unspec62,
            63 => Unspec63,
            _ => return None,
        };
        Some(nal_type)
    }
}

/// nal_unit_type of a NALU, from bits 1-6 of its first byte.
pub fn nalu_type(data: &[u8]) -> u8 {
    data.first().map_or(0, |b| (b >> 1) & 0x3F)
}

/// nuh_temporal_id_plus1 - 1, from the second header byte.
pub fn temporal_id(data: &[u8]) -> u8 {
    data.get(1).map_or(0, |b| (b & 0x07).saturating_sub(1))
}

/// Slice types a coded slice can carry.
pub fn is_slice(nalu_type: u8) -> bool {
    nalu_type <= 9 || (16..=21).contains(&nalu_type)
}

pub fn is_idr(nalu_type: u8) -> bool {
    nalu_type == NalUnitType::IdrWRadl as u8 || nalu_type == NalUnitType::IdrNLp as u8
}

pub fn is_bla(nalu_type: u8) -> bool {
    (16..=18).contains(&nalu_type)
}

pub fn is_irap(nalu_type: u8) -> bool {
    (16..=23).contains(&nalu_type)
}

/// Sub-layer non-reference picture types (TRAIL_N, TSA_N, ... RSV_VCL_N14).
pub fn is_sub_layer_non_reference(nalu_type: u8) -> bool {
    nalu_type <= 14 && nalu_type % 2 == 0
}

/// Slice types as coded in slice_type.
pub const SLICE_TYPE_B: u32 = 0;
pub const SLICE_TYPE_P: u32 = 1;
pub const SLICE_TYPE_I: u32 = 2;

lazy_static! {
    static ref NALU_TYPE_NAMES: HashMap<u8, &'static str> = {
        let mut names = HashMap::new();
        names.insert(0, "TRAIL_N");
        names.insert(1, "TRAIL_R");
        names.insert(2, "TSA_N");
        names.insert(3, "TSA_R");
        names.insert(4, "STSA_N");
        names.insert(5, "STSA_R");
        names.insert(6, "RADL_N");
        names.insert(7, "RADL_R");
        names.insert(8, "RASL_N");
        names.insert(9, "RASL_R");
        names.insert(10, "RSV_VCL_N10");
        names.insert(11, "RSV_VCL_R11");
        names.insert(12, "RSV_VCL_N12");
        names.insert(13, "RSV_VCL_R13");
        names.insert(14, "RSV_VCL_N14");
        names.insert(15, "RSV_VCL_R15");
        names.insert(16, "BLA_W_LP");
        names.insert(17, "BLA_W_RADL");
        names.insert(18, "BLA_N_LP");
        names.insert(19, "IDR_W_RADL");
        names.insert(20, "IDR_N_LP");
        names.insert(21, "CRA_NUT");
        names.insert(22, "RSV_IRAP_VCL22");
        names.insert(23, "RSV_IRAP_VCL23");
        names.insert(32, "VPS_NUT");
        names.insert(33, "SPS_NUT");
        names.insert(34, "PPS_NUT");
        names.insert(35, "AUD_NUT");
        names.insert(36, "EOS_NUT");
        names.insert(37, "EOB_NUT");
        names.insert(38, "FD_NUT");
        names.insert(39, "PREFIX_SEI_NUT");
        names.insert(40, "SUFFIX_SEI_NUT");
        names.insert(62, "UNSPEC62 (Dolby Vision RPU)");
        names.insert(63, "UNSPEC63 (Dolby Vision EL)");
        names
    };
}

/// Name of a NALU type, "unknown" for reserved values.
pub fn nalu_type_name(nalu_type: u8) -> &'static str {
    NALU_TYPE_NAMES.get(&nalu_type).copied().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_unit_header_parsing() {
        let test_cases = [
            (0x40, NalUnitType::Vps),
            (0x42, NalUnitType::Sps),
            (0x44, NalUnitType::Pps),
            (0x02, NalUnitType::TrailR),
            (0x26, NalUnitType::IdrWRadl),
            (0x28, NalUnitType::IdrNLp),
            (0x2A, NalUnitType::CraNut),
            (0x7E, NalUnitType::Unspec63),
        ];

        for (header_byte, expected_type) in test_cases {
            assert_eq!(NalUnitType::from_u8(nalu_type(&[header_byte, 0x01])), Some(expected_type));
        }
        assert_eq!(NalUnitType::from_u8(45), None);
    }

    #[test]
    fn test_type_classes() {
        assert!(is_slice(1) && is_slice(21) && !is_slice(22) && !is_slice(32));
        assert!(is_sub_layer_non_reference(0) && is_sub_layer_non_reference(14));
        assert!(!is_sub_layer_non_reference(1) && !is_sub_layer_non_reference(16));
        assert!(is_irap(23) && !is_irap(24));
        assert_eq!(temporal_id(&[0x02, 0x03]), 2);
        assert_eq!(nalu_type_name(39), "PREFIX_SEI_NUT");
        assert_eq!(nalu_type_name(50), "unknown");
    }
}
