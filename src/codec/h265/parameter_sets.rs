use bytes::Bytes;

use crate::codec::es::vui::read_aspect_ratio;
use crate::codec::es::ParameterSet;
use crate::error::{Result, VdkError};
use crate::utils::{nalu_to_rbsp, BitReader, Fingerprint};

/// Upper bound for pic_width/height_in_luma_samples.
const MAX_PIC_SIZE_IN_LUMA_SAMPLES: u32 = 1 << 20;

/// general_* fields of profile_tier_level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileTierLevel {
    pub profile_space: u8,
    pub tier_flag: bool,
    pub profile_idc: u8,
    pub profile_compatibility_flags: u32,
    /// progressive/interlaced/non-packed/frame-only flags plus the 44 constraint bits
    pub constraint_indicator_flags: u64,
    pub level_idc: u8,
}

/// Parses profile_tier_level(1, max_sub_layers_minus1).
fn parse_profile_tier_level(reader: &mut BitReader, max_sub_layers_minus1: u8) -> Result<ProfileTierLevel> {
    let ptl = ProfileTierLevel {
        profile_space: reader.read_bits(2)? as u8,
        tier_flag: reader.read_bit()?,
        profile_idc: reader.read_bits(5)? as u8,
        profile_compatibility_flags: reader.read_bits(32)?,
        constraint_indicator_flags: reader.read_bits_u64(48)?,
        level_idc: reader.read_bits(8)? as u8,
    };

    let mut profile_present = [false; 8];
    let mut level_present = [false; 8];
    for i in 0..max_sub_layers_minus1 as usize {
        profile_present[i] = reader.read_bit()?;
        level_present[i] = reader.read_bit()?;
    }
    if max_sub_layers_minus1 > 0 {
        for _ in max_sub_layers_minus1..8 {
            reader.skip_bits(2)?; // reserved_zero_2bits
        }
    }
    for i in 0..max_sub_layers_minus1 as usize {
        if profile_present[i] {
            reader.skip_bits(88)?;
        }
        if level_present[i] {
            reader.skip_bits(8)?;
        }
    }

    Ok(ptl)
}

fn rbsp_payload(raw: &Bytes, kind: &str) -> Result<Bytes> {
    if raw.len() < 3 {
        return Err(VdkError::InvalidData(format!("{} too short", kind)));
    }
    Ok(nalu_to_rbsp(&raw[2..]))
}

/// Video parameter set
#[derive(Debug, Clone)]
pub struct Vps {
    pub id: u32,
    pub max_sub_layers_minus1: u8,
    pub temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    raw: Bytes,
    fingerprint: Fingerprint,
}

impl Vps {
    /// Decodes a VPS NALU, header included.
    pub fn parse(raw: Bytes) -> Result<Self> {
        let rbsp = rbsp_payload(&raw, "VPS")?;
        let mut reader = BitReader::new(&rbsp);

        let id = reader.read_bits(4)?;
        reader.skip_bits(2)?; // base layer internal/available flags
        reader.skip_bits(6)?; // vps_max_layers_minus1
        let max_sub_layers_minus1 = reader.read_bits(3)? as u8;
        let temporal_id_nesting_flag = reader.read_bit()?;
        reader.skip_bits(16)?; // vps_reserved_0xffff_16bits
        let profile_tier_level = parse_profile_tier_level(&mut reader, max_sub_layers_minus1)?;

        Ok(Vps {
            id,
            max_sub_layers_minus1,
            temporal_id_nesting_flag,
            profile_tier_level,
            fingerprint: Fingerprint::of(&raw),
            raw,
        })
    }
}

/// Sequence parameter set, decoded up to the VUI bitstream restrictions.
#[derive(Debug, Clone)]
pub struct Sps {
    pub id: u32,
    pub vps_id: u32,
    pub max_sub_layers_minus1: u8,
    pub temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub pic_width_in_luma_samples: u32,
    pub pic_height_in_luma_samples: u32,
    /// Conformance window offsets: left, right, top, bottom
    pub conformance_window: [u32; 4],
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub log2_max_pic_order_cnt_lsb: u32,
    pub log2_min_luma_coding_block_size: u32,
    pub log2_diff_max_min_luma_coding_block_size: u32,
    pub sample_aspect_ratio: Option<(u32, u32)>,
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub min_spatial_segmentation_idc: u32,
    raw: Bytes,
    fingerprint: Fingerprint,
}

impl Sps {
    /// Decodes an SPS NALU, header included.
    pub fn parse(raw: Bytes) -> Result<Self> {
        let rbsp = rbsp_payload(&raw, "SPS")?;
        let mut reader = BitReader::new(&rbsp);

        let vps_id = reader.read_bits(4)?;
        let max_sub_layers_minus1 = reader.read_bits(3)? as u8;
        if max_sub_layers_minus1 > 6 {
            return Err(VdkError::InvalidData(format!(
                "sps_max_sub_layers_minus1 {} out of range",
                max_sub_layers_minus1
            )));
        }
        let temporal_id_nesting_flag = reader.read_bit()?;
        let profile_tier_level = parse_profile_tier_level(&mut reader, max_sub_layers_minus1)?;

        let id = reader.read_golomb()?;
        if id > 15 {
            return Err(VdkError::InvalidData(format!("SPS id {} out of range", id)));
        }
        let chroma_format_idc = reader.read_golomb_max(3, "chroma_format_idc")?;
        let separate_colour_plane_flag = chroma_format_idc == 3 && reader.read_bit()?;

        let pic_width_in_luma_samples =
            reader.read_golomb_max(MAX_PIC_SIZE_IN_LUMA_SAMPLES, "pic_width_in_luma_samples")?;
        let pic_height_in_luma_samples =
            reader.read_golomb_max(MAX_PIC_SIZE_IN_LUMA_SAMPLES, "pic_height_in_luma_samples")?;

        let mut conformance_window = [0u32; 4];
        if reader.read_bit()? {
            for offset in conformance_window.iter_mut() {
                *offset = reader.read_golomb()?;
            }
        }

        let bit_depth_luma_minus8 = reader.read_golomb()?;
        let bit_depth_chroma_minus8 = reader.read_golomb()?;
        let log2_max_pic_order_cnt_lsb =
            reader.read_golomb_max(12, "log2_max_pic_order_cnt_lsb_minus4")? + 4;

        let sub_layer_ordering_info_present = reader.read_bit()?;
        let first = if sub_layer_ordering_info_present { 0 } else { max_sub_layers_minus1 };
        for _ in first..=max_sub_layers_minus1 {
            reader.skip_golomb()?; // sps_max_dec_pic_buffering_minus1
            reader.skip_golomb()?; // sps_max_num_reorder_pics
            reader.skip_golomb()?; // sps_max_latency_increase_plus1
        }

        // CTBs range from 8x8 to 64x64
        let log2_min_luma_coding_block_size =
            reader.read_golomb_max(3, "log2_min_luma_coding_block_size_minus3")? + 3;
        let log2_diff_max_min_luma_coding_block_size = reader.read_golomb_max(
            6 - log2_min_luma_coding_block_size,
            "log2_diff_max_min_luma_coding_block_size",
        )?;
        reader.skip_golomb()?; // log2_min_luma_transform_block_size_minus2
        reader.skip_golomb()?; // log2_diff_max_min_luma_transform_block_size
        reader.skip_golomb()?; // max_transform_hierarchy_depth_inter
        reader.skip_golomb()?; // max_transform_hierarchy_depth_intra

        if reader.read_bit()? && reader.read_bit()? {
            skip_scaling_list_data(&mut reader)?;
        }

        reader.skip_bits(2)?; // amp_enabled_flag, sample_adaptive_offset_enabled_flag

        if reader.read_bit()? {
            reader.skip_bits(8)?; // pcm sample bit depths
            reader.skip_golomb()?;
            reader.skip_golomb()?;
            reader.skip_bits(1)?; // pcm_loop_filter_disabled_flag
        }

        let num_short_term_ref_pic_sets = reader.read_golomb()?;
        if num_short_term_ref_pic_sets > 64 {
            return Err(VdkError::InvalidData(format!(
                "num_short_term_ref_pic_sets {} out of range",
                num_short_term_ref_pic_sets
            )));
        }
        let mut num_delta_pocs = Vec::with_capacity(num_short_term_ref_pic_sets as usize);
        for idx in 0..num_short_term_ref_pic_sets as usize {
            let count = parse_short_term_ref_pic_set(&mut reader, idx, &num_delta_pocs)?;
            num_delta_pocs.push(count);
        }

        if reader.read_bit()? {
            let num_long_term_ref_pics = reader.read_golomb()?;
            for _ in 0..num_long_term_ref_pics {
                reader.skip_bits(log2_max_pic_order_cnt_lsb)?; // lt_ref_pic_poc_lsb_sps
                reader.skip_bits(1)?; // used_by_curr_pic_lt_sps_flag
            }
        }

        reader.skip_bits(2)?; // sps_temporal_mvp_enabled_flag, strong_intra_smoothing_enabled_flag

        let mut sps = Sps {
            id,
            vps_id,
            max_sub_layers_minus1,
            temporal_id_nesting_flag,
            profile_tier_level,
            chroma_format_idc,
            separate_colour_plane_flag,
            pic_width_in_luma_samples,
            pic_height_in_luma_samples,
            conformance_window,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            log2_max_pic_order_cnt_lsb,
            log2_min_luma_coding_block_size,
            log2_diff_max_min_luma_coding_block_size,
            sample_aspect_ratio: None,
            num_units_in_tick: 0,
            time_scale: 0,
            min_spatial_segmentation_idc: 0,
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
                reader.skip_bits(24)?; // colour primaries, transfer, matrix
            }
        }

        if reader.read_bit()? {
            reader.skip_golomb()?;
            reader.skip_golomb()?;
        }

        reader.skip_bits(3)?; // neutral_chroma_indication, field_seq, frame_field_info_present

        if reader.read_bit()? {
            for _ in 0..4 {
                reader.skip_golomb()?; // default display window offsets
            }
        }

        if reader.read_bit()? {
            self.num_units_in_tick = reader.read_bits(32)?;
            self.time_scale = reader.read_bits(32)?;
            if reader.read_bit()? {
                reader.skip_golomb()?; // vui_num_ticks_poc_diff_one_minus1
            }
            if reader.read_bit()? {
                skip_hrd_parameters(reader, true, self.max_sub_layers_minus1)?;
            }
        }

        if reader.read_bit()? {
            reader.skip_bits(3)?; // tiles_fixed_structure, mv over boundaries, restricted ref lists
            self.min_spatial_segmentation_idc = reader.read_golomb()?;
        }

        Ok(())
    }

    /// Luma width after the conformance window.
    pub fn width(&self) -> u32 {
        let (sub_width_c, _) = self.chroma_subsampling();
        let offsets = self.conformance_window[0].saturating_add(self.conformance_window[1]);
        let crop = sub_width_c.saturating_mul(offsets);
        self.pic_width_in_luma_samples.saturating_sub(crop)
    }

    /// Luma height after the conformance window.
    pub fn height(&self) -> u32 {
        let (_, sub_height_c) = self.chroma_subsampling();
        let offsets = self.conformance_window[2].saturating_add(self.conformance_window[3]);
        let crop = sub_height_c.saturating_mul(offsets);
        self.pic_height_in_luma_samples.saturating_sub(crop)
    }

    fn chroma_subsampling(&self) -> (u32, u32) {
        match self.chroma_format_idc {
            1 => (2, 2),
            2 => (2, 1),
            _ => (1, 1),
        }
    }

    /// Number of coding tree blocks in a picture.
    pub fn pic_size_in_ctbs(&self) -> u32 {
        let log2_ctb = self.log2_min_luma_coding_block_size + self.log2_diff_max_min_luma_coding_block_size;
        let ctb = 1u32 << log2_ctb.min(31);
        let width = self.pic_width_in_luma_samples.div_ceil(ctb);
        let height = self.pic_height_in_luma_samples.div_ceil(ctb);
        width.saturating_mul(height)
    }

    /// Picture duration from the VUI timing info in nanoseconds.
    pub fn frame_duration(&self) -> Option<i64> {
        if self.num_units_in_tick == 0 || self.time_scale == 0 {
            return None;
        }
        Some((1_000_000_000i128 * self.num_units_in_tick as i128 / self.time_scale as i128) as i64)
    }
}

fn skip_scaling_list_data(reader: &mut BitReader) -> Result<()> {
    for size_id in 0..4 {
        let step = if size_id == 3 { 3 } else { 1 };
        for _ in (0..6).step_by(step) {
            if !reader.read_bit()? {
                reader.skip_golomb()?; // scaling_list_pred_matrix_id_delta
            } else {
                let coef_num = 64.min(1 << (4 + (size_id << 1)));
                if size_id > 1 {
                    reader.read_signed_golomb()?; // scaling_list_dc_coef_minus8
                }
                for _ in 0..coef_num {
                    reader.read_signed_golomb()?;
                }
            }
        }
    }
    Ok(())
}

/// Parses st_ref_pic_set(idx) and returns its NumDeltaPocs.
fn parse_short_term_ref_pic_set(reader: &mut BitReader, idx: usize, num_delta_pocs: &[u32]) -> Result<u32> {
    let inter_ref_pic_set_prediction = idx != 0 && reader.read_bit()?;

    if inter_ref_pic_set_prediction {
        reader.skip_bits(1)?; // delta_rps_sign
        reader.skip_golomb()?; // abs_delta_rps_minus1
        let reference = num_delta_pocs[idx - 1];
        let mut count = 0;
        for _ in 0..=reference {
            let used_by_curr_pic = reader.read_bit()?;
            let use_delta = used_by_curr_pic || reader.read_bit()?;
            if use_delta {
                count += 1;
            }
        }
        return Ok(count);
    }

    let num_negative_pics = reader.read_golomb()?;
    let num_positive_pics = reader.read_golomb()?;
    if num_negative_pics > 16 || num_positive_pics > 16 {
        return Err(VdkError::InvalidData("too many pictures in short-term RPS".into()));
    }
    for _ in 0..num_negative_pics + num_positive_pics {
        reader.skip_golomb()?; // delta_poc_s0/s1_minus1
        reader.skip_bits(1)?; // used_by_curr_pic_s0/s1_flag
    }
    Ok(num_negative_pics + num_positive_pics)
}

fn skip_hrd_parameters(reader: &mut BitReader, common_inf_present: bool, max_sub_layers_minus1: u8) -> Result<()> {
    let mut nal_hrd = false;
    let mut vcl_hrd = false;
    let mut sub_pic_hrd_params = false;

    if common_inf_present {
        nal_hrd = reader.read_bit()?;
        vcl_hrd = reader.read_bit()?;
        if nal_hrd || vcl_hrd {
            sub_pic_hrd_params = reader.read_bit()?;
            if sub_pic_hrd_params {
                reader.skip_bits(8 + 5 + 1 + 5)?;
            }
            reader.skip_bits(8)?; // bit_rate_scale, cpb_size_scale
            if sub_pic_hrd_params {
                reader.skip_bits(4)?; // cpb_size_du_scale
            }
            reader.skip_bits(15)?; // delay length fields
        }
    }

    for _ in 0..=max_sub_layers_minus1 {
        let fixed_pic_rate_general = reader.read_bit()?;
        let fixed_pic_rate_within_cvs = fixed_pic_rate_general || reader.read_bit()?;
        let mut low_delay_hrd = false;
        if fixed_pic_rate_within_cvs {
            reader.skip_golomb()?; // elemental_duration_in_tc_minus1
        } else {
            low_delay_hrd = reader.read_bit()?;
        }
        let cpb_cnt = if low_delay_hrd { 1 } else { reader.read_golomb()? + 1 };
        if cpb_cnt > 32 {
            return Err(VdkError::InvalidData("cpb_cnt_minus1 out of range".into()));
        }

        for present in [nal_hrd, vcl_hrd] {
            if !present {
                continue;
            }
            for _ in 0..cpb_cnt {
                reader.skip_golomb()?; // bit_rate_value_minus1
                reader.skip_golomb()?; // cpb_size_value_minus1
                if sub_pic_hrd_params {
                    reader.skip_golomb()?;
                    reader.skip_golomb()?;
                }
                reader.skip_bits(1)?; // cbr_flag
            }
        }
    }
    Ok(())
}

/// Picture parameter set
#[derive(Debug, Clone)]
pub struct Pps {
    pub id: u32,
    pub sps_id: u32,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u32,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    raw: Bytes,
    fingerprint: Fingerprint,
}

impl Pps {
    /// Decodes a PPS NALU, header included.
    pub fn parse(raw: Bytes) -> Result<Self> {
        let rbsp = rbsp_payload(&raw, "PPS")?;
        let mut reader = BitReader::new(&rbsp);

        let id = reader.read_golomb()?;
        if id > 63 {
            return Err(VdkError::InvalidData(format!("PPS id {} out of range", id)));
        }
        let sps_id = reader.read_golomb()?;
        let dependent_slice_segments_enabled_flag = reader.read_bit()?;
        let output_flag_present_flag = reader.read_bit()?;
        let num_extra_slice_header_bits = reader.read_bits(3)?;
        reader.skip_bits(2)?; // sign_data_hiding_enabled_flag, cabac_init_present_flag
        reader.skip_golomb()?; // num_ref_idx_l0_default_active_minus1
        reader.skip_golomb()?; // num_ref_idx_l1_default_active_minus1
        reader.read_signed_golomb()?; // init_qp_minus26
        reader.skip_bits(2)?; // constrained_intra_pred_flag, transform_skip_enabled_flag
        if reader.read_bit()? {
            reader.skip_golomb()?; // diff_cu_qp_delta_depth
        }
        reader.read_signed_golomb()?; // pps_cb_qp_offset
        reader.read_signed_golomb()?; // pps_cr_qp_offset
        reader.skip_bits(4)?; // chroma qp offsets present, weighted pred/bipred, transquant bypass
        let tiles_enabled_flag = reader.read_bit()?;
        let entropy_coding_sync_enabled_flag = reader.read_bit()?;

        Ok(Pps {
            id,
            sps_id,
            dependent_slice_segments_enabled_flag,
            output_flag_present_flag,
            num_extra_slice_header_bits,
            tiles_enabled_flag,
            entropy_coding_sync_enabled_flag,
            fingerprint: Fingerprint::of(&raw),
            raw,
        })
    }

    /// parallelismType of the hvcC record.
    pub fn parallelism_type(&self) -> u8 {
        match (self.tiles_enabled_flag, self.entropy_coding_sync_enabled_flag) {
            (true, true) => 0,
            (false, true) => 3,
            (true, false) => 2,
            (false, false) => 1,
        }
    }
}

macro_rules! impl_parameter_set {
    ($ty:ty, $kind:expr, $($parent:ident)?) => {
        impl ParameterSet for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> u32 {
                self.id
            }

            fn parent_id(&self) -> Option<u32> {
                None $(.or(Some(self.$parent)))?
            }

            fn raw(&self) -> &Bytes {
                &self.raw
            }

            fn fingerprint(&self) -> Fingerprint {
                self.fingerprint
            }
        }
    };
}

impl_parameter_set!(Vps, "VPS",);
impl_parameter_set!(Sps, "SPS", vps_id);
impl_parameter_set!(Pps, "PPS", sps_id);
