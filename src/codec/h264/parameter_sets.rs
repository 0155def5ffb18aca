use bytes::Bytes;

use super::types::HIGH_PROFILES;
use crate::codec::es::vui::read_aspect_ratio;
use crate::codec::es::ParameterSet;
use crate::error::{Result, VdkError};
use crate::utils::{nalu_to_rbsp, BitReader, Fingerprint};

/// Upper bound for the coded width and height in macroblocks.
const MAX_PIC_SIZE_IN_MBS: u32 = 1 << 16;

fn rbsp_payload(raw: &Bytes, kind: &str) -> Result<Bytes> {
    if raw.len() < 2 {
        return Err(VdkError::InvalidData(format!("{} too short", kind)));
    }
    Ok(nalu_to_rbsp(&raw[1..]))
}

/// Sequence parameter set, decoded through the VUI timing info.
#[derive(Debug, Clone)]
pub struct Sps {
    pub profile_idc: u8,
    /// constraint_set0..5 flags and the reserved bits
    pub profile_compatibility: u8,
    pub level_idc: u8,
    pub id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub log2_max_frame_num: u32,
    pub pic_order_cnt_type: u32,
    pub log2_max_pic_order_cnt_lsb: u32,
    pub delta_pic_order_always_zero_flag: bool,
    pub offset_for_non_ref_pic: i32,
    pub offset_for_top_to_bottom_field: i32,
    pub offset_for_ref_frame: Vec<i32>,
    pub max_num_ref_frames: u32,
    pub pic_width_in_mbs: u32,
    pub pic_height_in_map_units: u32,
    pub frame_mbs_only_flag: bool,
    /// Frame cropping offsets: left, right, top, bottom
    pub frame_cropping: [u32; 4],
    pub sample_aspect_ratio: Option<(u32, u32)>,
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub fixed_frame_rate_flag: bool,
    raw: Bytes,
    fingerprint: Fingerprint,
}

impl Sps {
    /// Decodes an SPS NALU, header byte included.
    pub fn parse(raw: Bytes) -> Result<Self> {
        let rbsp = rbsp_payload(&raw, "SPS")?;
        let mut reader = BitReader::new(&rbsp);

        let profile_idc = reader.read_bits(8)? as u8;
        let profile_compatibility = reader.read_bits(8)? as u8;
        let level_idc = reader.read_bits(8)? as u8;
        let id = reader.read_golomb()?;
        if id > 31 {
            return Err(VdkError::InvalidData(format!("SPS id {} out of range", id)));
        }

        let mut chroma_format_idc = 1;
        let mut separate_colour_plane_flag = false;
        let mut bit_depth_luma_minus8 = 0;
        let mut bit_depth_chroma_minus8 = 0;
        if HIGH_PROFILES.contains(&profile_idc) {
            chroma_format_idc = reader.read_golomb()?;
            if chroma_format_idc > 3 {
                return Err(VdkError::InvalidData(format!(
                    "chroma_format_idc {} out of range",
                    chroma_format_idc
                )));
            }
            if chroma_format_idc == 3 {
                separate_colour_plane_flag = reader.read_bit()?;
            }
            bit_depth_luma_minus8 = reader.read_golomb()?;
            bit_depth_chroma_minus8 = reader.read_golomb()?;
            reader.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag

            if reader.read_bit()? {
                let count = if chroma_format_idc != 3 { 8 } else { 12 };
                for i in 0..count {
                    if reader.read_bit()? {
                        skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        let log2_max_frame_num = reader.read_golomb_max(12, "log2_max_frame_num_minus4")? + 4;

        let pic_order_cnt_type = reader.read_golomb()?;
        let mut log2_max_pic_order_cnt_lsb = 0;
        let mut delta_pic_order_always_zero_flag = false;
        let mut offset_for_non_ref_pic = 0;
        let mut offset_for_top_to_bottom_field = 0;
        let mut offset_for_ref_frame = Vec::new();
        match pic_order_cnt_type {
            0 => {
                log2_max_pic_order_cnt_lsb =
                    reader.read_golomb_max(12, "log2_max_pic_order_cnt_lsb_minus4")? + 4;
            }
            1 => {
                delta_pic_order_always_zero_flag = reader.read_bit()?;
                offset_for_non_ref_pic = reader.read_signed_golomb()?;
                offset_for_top_to_bottom_field = reader.read_signed_golomb()?;
                let num_ref_frames_in_pic_order_cnt_cycle = reader.read_golomb()?;
                if num_ref_frames_in_pic_order_cnt_cycle > 255 {
                    return Err(VdkError::InvalidData(
                        "num_ref_frames_in_pic_order_cnt_cycle out of range".into(),
                    ));
                }
                for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
                    offset_for_ref_frame.push(reader.read_signed_golomb()?);
                }
            }
            2 => {}
            other => {
                return Err(VdkError::InvalidData(format!(
                    "pic_order_cnt_type {} out of range",
                    other
                )))
            }
        }

        let max_num_ref_frames = reader.read_golomb()?;
        reader.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag
        let pic_width_in_mbs = reader.read_golomb_max(MAX_PIC_SIZE_IN_MBS, "pic_width_in_mbs_minus1")? + 1;
        let pic_height_in_map_units =
            reader.read_golomb_max(MAX_PIC_SIZE_IN_MBS, "pic_height_in_map_units_minus1")? + 1;
        let frame_mbs_only_flag = reader.read_bit()?;
        if !frame_mbs_only_flag {
            reader.skip_bits(1)?; // mb_adaptive_frame_field_flag
        }
        reader.skip_bits(1)?; // direct_8x8_inference_flag

        let mut frame_cropping = [0u32; 4];
        if reader.read_bit()? {
            for offset in frame_cropping.iter_mut() {
                *offset = reader.read_golomb()?;
            }
        }

        let mut sps = Sps {
            profile_idc,
            profile_compatibility,
            level_idc,
            id,
            chroma_format_idc,
            separate_colour_plane_flag,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            log2_max_frame_num,
            pic_order_cnt_type,
            log2_max_pic_order_cnt_lsb,
            delta_pic_order_always_zero_flag,
            offset_for_non_ref_pic,
            offset_for_top_to_bottom_field,
            offset_for_ref_frame,
            max_num_ref_frames,
            pic_width_in_mbs,
            pic_height_in_map_units,
            frame_mbs_only_flag,
            frame_cropping,
            sample_aspect_ratio: None,
            num_units_in_tick: 0,
            time_scale: 0,
            fixed_frame_rate_flag: false,
            fingerprint: Fingerprint::of(&raw),
            raw,
        };

        if reader.read_bit()? {
            sps.parse_vui(&mut reader)?;
        }

        Ok(sps)
    }

    fn parse_vui(&mut self, reader: &mut BitReader) -> Result<()> {
        if reader.read_bit()? {
            self.sample_aspect_ratio = read_aspect_ratio(reader)?;
        }
        if reader.read_bit()? {
            reader.skip_bits(1)?; // overscan_appropriate_flag
        }
        if reader.read_bit()? {
            reader.skip_bits(4)?; // video_format, video_full_range_flag
            if reader.read_bit()? {
                reader.skip_bits(24)?;
            }
        }
        if reader.read_bit()? {
            reader.skip_golomb()?; // chroma_sample_loc_type_top_field
            reader.skip_golomb()?;
        }
        if reader.read_bit()? {
            self.num_units_in_tick = reader.read_bits(32)?;
            self.time_scale = reader.read_bits(32)?;
            self.fixed_frame_rate_flag = reader.read_bit()?;
        }
        Ok(())
    }

    /// ChromaArrayType
    pub fn chroma_array_type(&self) -> u32 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    fn crop_units(&self) -> (u32, u32) {
        let (sub_width_c, sub_height_c) = match self.chroma_array_type() {
            0 => (1, 1),
            1 => (2, 2),
            2 => (2, 1),
            _ => (1, 1),
        };
        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        (sub_width_c, sub_height_c * field_factor)
    }

    /// Luma width after frame cropping.
    pub fn width(&self) -> u32 {
        let (crop_x, _) = self.crop_units();
        let crop = crop_x.saturating_mul(self.frame_cropping[0].saturating_add(self.frame_cropping[1]));
        self.pic_width_in_mbs.saturating_mul(16).saturating_sub(crop)
    }

    /// Luma frame height after frame cropping.
    pub fn height(&self) -> u32 {
        let (_, crop_y) = self.crop_units();
        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        let crop = crop_y.saturating_mul(self.frame_cropping[2].saturating_add(self.frame_cropping[3]));
        self.pic_height_in_map_units
            .saturating_mul(16 * field_factor)
            .saturating_sub(crop)
    }

    /// Duration of one field from the VUI timing info in nanoseconds.
    pub fn field_duration(&self) -> Option<i64> {
        if self.num_units_in_tick == 0 || self.time_scale == 0 {
            return None;
        }
        Some((1_000_000_000i128 * self.num_units_in_tick as i128 / self.time_scale as i128) as i64)
    }

    pub fn max_frame_num(&self) -> u32 {
        1 << self.log2_max_frame_num
    }
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8;
    let mut next_scale = 8;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_signed_golomb()?;
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        last_scale = if next_scale == 0 { last_scale } else { next_scale };
    }

    Ok(())
}

/// Picture parameter set, decoded up to the fields slice headers depend on.
#[derive(Debug, Clone)]
pub struct Pps {
    pub id: u32,
    pub sps_id: u32,
    pub entropy_coding_mode_flag: bool,
    pub bottom_field_pic_order_in_frame_present_flag: bool,
    raw: Bytes,
    fingerprint: Fingerprint,
}

impl Pps {
    pub fn parse(raw: Bytes) -> Result<Self> {
        let rbsp = rbsp_payload(&raw, "PPS")?;
        let mut reader = BitReader::new(&rbsp);

        let id = reader.read_golomb()?;
        if id > 255 {
            return Err(VdkError::InvalidData(format!("PPS id {} out of range", id)));
        }
        let sps_id = reader.read_golomb()?;
        if sps_id > 31 {
            return Err(VdkError::InvalidData(format!("SPS id {} out of range", sps_id)));
        }
        let entropy_coding_mode_flag = reader.read_bit()?;
        let bottom_field_pic_order_in_frame_present_flag = reader.read_bit()?;

        Ok(Pps {
            id,
            sps_id,
            entropy_coding_mode_flag,
            bottom_field_pic_order_in_frame_present_flag,
            fingerprint: Fingerprint::of(&raw),
            raw,
        })
    }
}

impl ParameterSet for Sps {
    const KIND: &'static str = "SPS";

    fn id(&self) -> u32 {
        self.id
    }

    fn parent_id(&self) -> Option<u32> {
        None
    }

    fn raw(&self) -> &Bytes {
        &self.raw
    }

    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

impl ParameterSet for Pps {
    const KIND: &'static str = "PPS";

    fn id(&self) -> u32 {
        self.id
    }

    fn parent_id(&self) -> Option<u32> {
        Some(self.sps_id)
    }

    fn raw(&self) -> &Bytes {
        &self.raw
    }

    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}
