use super::parameter_sets::{Pps, Sps};
use super::types::{self, NalUnitType, SLICE_TYPE_B, SLICE_TYPE_I, SLICE_TYPE_SI};
use crate::codec::es::{FrameType, ParameterSetList};
use crate::error::{Result, VdkError};
use crate::utils::{nalu_to_rbsp, BitReader};

/// The leading fields of an AVC slice header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceInfo {
    pub nalu_type: u8,
    pub nal_ref_idc: u8,
    pub first_mb_in_slice: u32,
    /// slice_type modulo 5
    pub slice_type: u32,
    pub pps_id: u32,
    pub sps_id: u32,
    pub frame_num: u32,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    pub idr_pic_id: u32,
    pub pic_order_cnt_lsb: u32,
    pub delta_pic_order_cnt_bottom: i32,
    pub delta_pic_order_cnt: [i32; 2],
}

impl SliceInfo {
    pub fn is_idr(&self) -> bool {
        self.nalu_type == NalUnitType::CodedSliceIdr as u8
    }

    pub fn is_i_slice(&self) -> bool {
        self.slice_type == SLICE_TYPE_I || self.slice_type == SLICE_TYPE_SI
    }

    pub fn is_b_slice(&self) -> bool {
        self.slice_type == SLICE_TYPE_B
    }

    pub fn frame_type(&self) -> FrameType {
        if self.is_i_slice() {
            FrameType::I
        } else if self.is_b_slice() {
            FrameType::B
        } else {
            FrameType::P
        }
    }

    /// Whether this slice belongs to a different picture than `previous` (7.4.1.2.4).
    pub fn starts_new_picture(&self, previous: &SliceInfo) -> bool {
        self.first_mb_in_slice == 0
            || self.frame_num != previous.frame_num
            || self.pps_id != previous.pps_id
            || self.field_pic_flag != previous.field_pic_flag
            || self.bottom_field_flag != previous.bottom_field_flag
            || (self.nal_ref_idc == 0) != (previous.nal_ref_idc == 0)
            || self.is_idr() != previous.is_idr()
            || (self.is_idr() && self.idr_pic_id != previous.idr_pic_id)
            || self.pic_order_cnt_lsb != previous.pic_order_cnt_lsb
            || self.delta_pic_order_cnt_bottom != previous.delta_pic_order_cnt_bottom
            || self.delta_pic_order_cnt != previous.delta_pic_order_cnt
    }

    /// Whether this slice is the opposite-parity second field of `first`.
    pub fn completes_field_pair(&self, first: &SliceInfo) -> bool {
        self.field_pic_flag
            && first.field_pic_flag
            && self.bottom_field_flag != first.bottom_field_flag
            && self.frame_num == first.frame_num
            && self.first_mb_in_slice == 0
    }
}

/// Parses a slice NALU (header byte included) up to the POC fields.
pub fn parse_slice_header(
    data: &[u8],
    sps_list: &ParameterSetList<Sps>,
    pps_list: &ParameterSetList<Pps>,
) -> Result<SliceInfo> {
    if data.len() < 2 {
        return Err(VdkError::InvalidData("slice NALU too short".into()));
    }
    let rbsp = nalu_to_rbsp(&data[1..]);
    let mut reader = BitReader::new(&rbsp);

    let mut slice = SliceInfo {
        nalu_type: types::nalu_type(data),
        nal_ref_idc: types::nal_ref_idc(data),
        ..Default::default()
    };

    slice.first_mb_in_slice = reader.read_golomb()?;
    let slice_type = reader.read_golomb()?;
    if slice_type > 9 {
        return Err(VdkError::InvalidData(format!("invalid slice_type {}", slice_type)));
    }
    slice.slice_type = slice_type % 5;

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

    if sps.separate_colour_plane_flag {
        reader.skip_bits(2)?; // colour_plane_id
    }
    slice.frame_num = reader.read_bits(sps.log2_max_frame_num)?;

    if !sps.frame_mbs_only_flag {
        slice.field_pic_flag = reader.read_bit()?;
        if slice.field_pic_flag {
            slice.bottom_field_flag = reader.read_bit()?;
        }
    }

    if slice.is_idr() {
        slice.idr_pic_id = reader.read_golomb()?;
    }

    match sps.pic_order_cnt_type {
        0 => {
            slice.pic_order_cnt_lsb = reader.read_bits(sps.log2_max_pic_order_cnt_lsb)?;
            if pps.bottom_field_pic_order_in_frame_present_flag && !slice.field_pic_flag {
                slice.delta_pic_order_cnt_bottom = reader.read_signed_golomb()?;
            }
        }
        1 if !sps.delta_pic_order_always_zero_flag => {
            slice.delta_pic_order_cnt[0] = reader.read_signed_golomb()?;
            if pps.bottom_field_pic_order_in_frame_present_flag && !slice.field_pic_flag {
                slice.delta_pic_order_cnt[1] = reader.read_signed_golomb()?;
            }
        }
        _ => {}
    }

    Ok(slice)
}

/// Picture order count state (8.2.1).
///
/// Memory management operation 5 is not tracked since the reference
/// picture marking syntax is not decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct PocState {
    prev_pic_order_cnt_msb: i64,
    prev_pic_order_cnt_lsb: i64,
    prev_frame_num_offset: i64,
    prev_frame_num: i64,
}

impl PocState {
    /// Picture order count of the frame or field starting with `slice`.
    ///
    /// For frames this is the smaller of the top and bottom field counts.
    pub fn calculate(&mut self, slice: &SliceInfo, sps: &Sps) -> i64 {
        let (top, bottom) = match sps.pic_order_cnt_type {
            0 => self.type0(slice, sps),
            1 => self.type1(slice, sps),
            _ => self.type2(slice, sps),
        };

        if !slice.field_pic_flag {
            top.min(bottom)
        } else if slice.bottom_field_flag {
            bottom
        } else {
            top
        }
    }

    fn type0(&mut self, slice: &SliceInfo, sps: &Sps) -> (i64, i64) {
        if slice.is_idr() {
            self.prev_pic_order_cnt_msb = 0;
            self.prev_pic_order_cnt_lsb = 0;
        }

        let max_lsb = 1i64 << sps.log2_max_pic_order_cnt_lsb;
        let lsb = slice.pic_order_cnt_lsb as i64;
        let prev_lsb = self.prev_pic_order_cnt_lsb;

        let msb = if lsb < prev_lsb && prev_lsb - lsb >= max_lsb / 2 {
            self.prev_pic_order_cnt_msb + max_lsb
        } else if lsb > prev_lsb && lsb - prev_lsb > max_lsb / 2 {
            self.prev_pic_order_cnt_msb - max_lsb
        } else {
            self.prev_pic_order_cnt_msb
        };

        if slice.nal_ref_idc != 0 {
            self.prev_pic_order_cnt_msb = msb;
            self.prev_pic_order_cnt_lsb = lsb;
        }

        if slice.field_pic_flag {
            (msb + lsb, msb + lsb)
        } else {
            let top = msb + lsb;
            (top, top + slice.delta_pic_order_cnt_bottom as i64)
        }
    }

    fn frame_num_offset(&mut self, slice: &SliceInfo, sps: &Sps) -> i64 {
        let frame_num = slice.frame_num as i64;
        let offset = if slice.is_idr() {
            0
        } else if self.prev_frame_num > frame_num {
            self.prev_frame_num_offset + sps.max_frame_num() as i64
        } else {
            self.prev_frame_num_offset
        };
        self.prev_frame_num_offset = offset;
        self.prev_frame_num = frame_num;
        offset
    }

    fn type1(&mut self, slice: &SliceInfo, sps: &Sps) -> (i64, i64) {
        let frame_num_offset = self.frame_num_offset(slice, sps);
        let cycle = &sps.offset_for_ref_frame;

        let mut abs_frame_num = if cycle.is_empty() {
            0
        } else {
            frame_num_offset + slice.frame_num as i64
        };
        if slice.nal_ref_idc == 0 && abs_frame_num > 0 {
            abs_frame_num -= 1;
        }

        let mut expected = 0i64;
        if abs_frame_num > 0 {
            let delta_per_cycle: i64 = cycle.iter().map(|&o| o as i64).sum();
            let cycle_count = (abs_frame_num - 1) / cycle.len() as i64;
            let in_cycle = ((abs_frame_num - 1) % cycle.len() as i64) as usize;
            expected = cycle_count * delta_per_cycle
                + cycle[..=in_cycle].iter().map(|&o| o as i64).sum::<i64>();
        }
        if slice.nal_ref_idc == 0 {
            expected += sps.offset_for_non_ref_pic as i64;
        }

        let top_to_bottom = sps.offset_for_top_to_bottom_field as i64;
        let delta = slice.delta_pic_order_cnt.map(|d| d as i64);
        if !slice.field_pic_flag {
            let top = expected + delta[0];
            (top, top + top_to_bottom + delta[1])
        } else {
            (expected + delta[0], expected + top_to_bottom + delta[0])
        }
    }

    fn type2(&mut self, slice: &SliceInfo, sps: &Sps) -> (i64, i64) {
        let frame_num_offset = self.frame_num_offset(slice, sps);
        let poc = if slice.is_idr() {
            0
        } else if slice.nal_ref_idc == 0 {
            2 * (frame_num_offset + slice.frame_num as i64) - 1
        } else {
            2 * (frame_num_offset + slice.frame_num as i64)
        };
        (poc, poc)
    }
}
