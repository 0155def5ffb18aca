use super::parameter_sets::{Pps, Sps};
use super::types::{self, SLICE_TYPE_B, SLICE_TYPE_I};
use crate::codec::es::{FrameType, ParameterSetList};
use crate::error::{Result, VdkError};
use crate::utils::{nalu_to_rbsp, BitReader};

/// The leading fields of an HEVC slice segment header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceInfo {
    pub nalu_type: u8,
    pub temporal_id: u8,
    pub first_slice_segment_in_pic_flag: bool,
    pub dependent_slice_segment_flag: bool,
    /// 0 = B, 1 = P, 2 = I; meaningless for dependent segments
    pub slice_type: u32,
    pub pps_id: u32,
    pub sps_id: u32,
    pub pic_order_cnt_lsb: u32,
}

impl SliceInfo {
    pub fn frame_type(&self) -> FrameType {
        match self.slice_type {
            SLICE_TYPE_I => FrameType::I,
            SLICE_TYPE_B => FrameType::B,
            _ => FrameType::P,
        }
    }

    pub fn is_i_slice(&self) -> bool {
        self.slice_type == SLICE_TYPE_I
    }
}

/// Bits used by slice_segment_address: Ceil(Log2(PicSizeInCtbsY)).
pub fn slice_segment_address_bits(pic_size_in_ctbs: u32) -> u32 {
    if pic_size_in_ctbs <= 1 {
        0
    } else {
        32 - (pic_size_in_ctbs - 1).leading_zeros()
    }
}

/// Parses a slice segment NALU (header included) up to slice_pic_order_cnt_lsb.
pub fn parse_slice_header(
    data: &[u8],
    sps_list: &ParameterSetList<Sps>,
    pps_list: &ParameterSetList<Pps>,
) -> Result<SliceInfo> {
    if data.len() < 3 {
        return Err(VdkError::InvalidData("slice NALU too short".into()));
    }
    let rbsp = nalu_to_rbsp(&data[2..]);
    let mut reader = BitReader::new(&rbsp);

    let mut slice = SliceInfo {
        nalu_type: types::nalu_type(data),
        temporal_id: types::temporal_id(data),
        ..Default::default()
    };

    slice.first_slice_segment_in_pic_flag = reader.read_bit()?;
    if types::is_irap(slice.nalu_type) {
        reader.skip_bits(1)?; // no_output_of_prior_pics_flag
    }

    slice.pps_id = reader.read_golomb()?;
    let pps = pps_list.get(slice.pps_id).ok_or(VdkError::MissingParameterSet {
        kind: "PPS",
        id: slice.pps_id,
    })?;
    let sps = sps_list.get(pps.sps_id).ok_or(VdkError::MissingParameterSet {
        kind: "SPS",
        id: pps.sps_id,
    })?;
    slice.sps_id = sps.id;

    if !slice.first_slice_segment_in_pic_flag {
        if pps.dependent_slice_segments_enabled_flag {
            slice.dependent_slice_segment_flag = reader.read_bit()?;
        }
        reader.skip_bits(slice_segment_address_bits(sps.pic_size_in_ctbs()))?;
    }

    if slice.dependent_slice_segment_flag {
        return Ok(slice);
    }

    reader.skip_bits(pps.num_extra_slice_header_bits)?;
    slice.slice_type = reader.read_golomb()?;
    if slice.slice_type > SLICE_TYPE_I {
        return Err(VdkError::InvalidData(format!("invalid slice_type {}", slice.slice_type)));
    }
    if pps.output_flag_present_flag {
        reader.skip_bits(1)?; // pic_output_flag
    }
    if sps.separate_colour_plane_flag {
        reader.skip_bits(2)?; // colour_plane_id
    }
    if !types::is_idr(slice.nalu_type) {
        slice.pic_order_cnt_lsb = reader.read_bits(sps.log2_max_pic_order_cnt_lsb)?;
    }

    Ok(slice)
}

/// Picture order count state (8.3.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct PocState {
    prev_pic_order_cnt_lsb: u32,
    prev_pic_order_cnt_msb: i64,
}

impl PocState {
    /// Picture order count of the picture starting with `slice`.
    pub fn calculate(&mut self, slice: &SliceInfo, log2_max_pic_order_cnt_lsb: u32) -> i64 {
        if types::is_idr(slice.nalu_type) {
            *self = PocState::default();
            return 0;
        }

        let max_lsb = 1i64 << log2_max_pic_order_cnt_lsb;
        let lsb = slice.pic_order_cnt_lsb as i64;
        let prev_lsb = self.prev_pic_order_cnt_lsb as i64;

        let msb = if types::is_bla(slice.nalu_type) {
            0
        } else if lsb < prev_lsb && prev_lsb - lsb >= max_lsb / 2 {
            self.prev_pic_order_cnt_msb + max_lsb
        } else if lsb > prev_lsb && lsb - prev_lsb > max_lsb / 2 {
            self.prev_pic_order_cnt_msb - max_lsb
        } else {
            self.prev_pic_order_cnt_msb
        };

        if slice.temporal_id == 0 && !types::is_sub_layer_non_reference(slice.nalu_type) {
            self.prev_pic_order_cnt_lsb = slice.pic_order_cnt_lsb;
            self.prev_pic_order_cnt_msb = msb;
        }

        msb + lsb
    }
}
