use bytes::Bytes;

use super::config_record::{HvccRecord, NaluArray};
use super::parameter_sets::{Pps, Sps, Vps};
use super::slice::{parse_slice_header, PocState, SliceInfo};
use super::types::{self, NalUnitType};
use crate::av::CodecType;
use crate::codec::es::sei::{sei_messages, SEI_RECOVERY_POINT, SEI_USER_DATA_UNREGISTERED};
use crate::codec::es::{Codec, EsCore, EsParser, FrameType, Nalu, ParameterSet, ParameterSetList, PendingFrame};
use crate::config::ParserConfig;
use crate::error::{Result, VdkError};
use crate::utils::{nalu_to_rbsp, Fingerprint};

/// Enhancement layer frames kept until the caller fetches them; older ones are dropped.
pub const MAX_QUEUED_ENHANCEMENT_LAYER_FRAMES: usize = 64;

/// H.265 elementary stream parser
pub type HevcParser = EsParser<Hevc>;

/// H.265/HEVC side of [`EsParser`].
///
/// Keeps the VPS, SPS and PPS lists, user data SEIs for the hvcC record, the
/// picture order count state and, once NALU type 63 shows up, a nested parser
/// for the Dolby Vision enhancement layer.
#[derive(Debug)]
pub struct Hevc {
    vps_list: ParameterSetList<Vps>,
    sps_list: ParameterSetList<Sps>,
    pps_list: ParameterSetList<Pps>,
    sei_list: Vec<Bytes>,
    poc: PocState,
    config: ParserConfig,
    dovi_el: Option<Box<EsParser<Hevc>>>,
}

impl Hevc {
    pub fn vps_list(&self) -> &ParameterSetList<Vps> {
        &self.vps_list
    }

    pub fn sps_list(&self) -> &ParameterSetList<Sps> {
        &self.sps_list
    }

    pub fn pps_list(&self) -> &ParameterSetList<Pps> {
        &self.pps_list
    }

    /// User data unregistered SEIs carried in the hvcC record
    pub fn sei_list(&self) -> &[Bytes] {
        &self.sei_list
    }

    /// Parser of the Dolby Vision enhancement layer, if one was found
    pub fn enhancement_layer(&self) -> Option<&EsParser<Hevc>> {
        self.dovi_el.as_deref()
    }

    /// Enhancement layer frames are only fetched through this accessor. Once
    /// more than [`MAX_QUEUED_ENHANCEMENT_LAYER_FRAMES`] pile up, the oldest
    /// are dropped.
    pub fn enhancement_layer_mut(&mut self) -> Option<&mut EsParser<Hevc>> {
        self.dovi_el.as_deref_mut()
    }

    fn headers_complete(&self) -> bool {
        !self.vps_list.is_empty() && !self.sps_list.is_empty() && !self.pps_list.is_empty()
    }

    fn all_fingerprints(&self) -> Vec<Fingerprint> {
        let vps = self.vps_list.iter().map(|s| s.fingerprint());
        let sps = self.sps_list.iter().map(|s| s.fingerprint());
        let pps = self.pps_list.iter().map(|s| s.fingerprint());
        vps.chain(sps).chain(pps).collect()
    }

    fn handle_parameter_set(&mut self, core: &mut EsCore<SliceInfo>, nalu: Nalu) {
        let nalu_type = types::nalu_type(&nalu.data);
        let stored = match NalUnitType::from_u8(nalu_type) {
            Some(NalUnitType::Vps) => {
                Vps::parse(nalu.data).map(|vps| core.store_parameter_set(&mut self.vps_list, vps))
            }
            Some(NalUnitType::Sps) => Sps::parse(nalu.data).map(|sps| {
                if let Some(duration) = sps.frame_duration() {
                    core.reorder.durations.stream_default.get_or_insert(duration / 2);
                }
                core.store_parameter_set(&mut self.sps_list, sps)
            }),
            _ => Pps::parse(nalu.data).map(|pps| core.store_parameter_set(&mut self.pps_list, pps)),
        };

        if let Err(e) = stored {
            log::debug!("ignoring undecodable {}: {}", types::nalu_type_name(nalu_type), e);
            return;
        }

        self.check_headers_complete(core);
    }

    fn check_headers_complete(&mut self, core: &mut EsCore<SliceInfo>) {
        if self.headers_complete() && core.set_headers_parsed(self.all_fingerprints()) {
            for nalu in core.take_deferred() {
                self.handle_slice(core, nalu);
            }
        }
    }

    fn handle_sei(&mut self, core: &mut EsCore<SliceInfo>, data: &Bytes) {
        if data.len() <= 2 {
            return;
        }
        let rbsp = nalu_to_rbsp(&data[2..]);
        for (payload_type, _) in sei_messages(&rbsp) {
            match payload_type {
                SEI_RECOVERY_POINT => core.recovery_point_valid = true,
                SEI_USER_DATA_UNREGISTERED if !self.sei_list.contains(data) => {
                    self.sei_list.push(data.clone());
                }
                _ => {}
            }
        }
    }

    fn handle_slice(&mut self, core: &mut EsCore<SliceInfo>, nalu: Nalu) {
        if !core.headers_parsed() {
            core.defer(nalu);
            return;
        }

        let slice = match parse_slice_header(&nalu.data, &self.sps_list, &self.pps_list) {
            Ok(slice) => slice,
            Err(e) => {
                log::debug!("dropping slice at {}: {}", nalu.position, e);
                core.stats.num_slice_parse_failures += 1;
                return;
            }
        };

        if !slice.dependent_slice_segment_flag {
            core.stats.count_slice(slice.frame_type());
        }

        if core.pending().is_some() && slice.first_slice_segment_in_pic_flag {
            core.flush_pending();
        }
        if core.append_to_pending(nalu.data.clone()) {
            return;
        }

        let Some(sps) = self.sps_list.get(slice.sps_id) else {
            return;
        };

        let keyframe = core.recovery_point_valid
            || (slice.is_i_slice()
                && (types::is_idr(slice.nalu_type)
                    || types::is_bla(slice.nalu_type)
                    || slice.nalu_type == NalUnitType::CraNut as u8));
        let discardable = types::is_sub_layer_non_reference(slice.nalu_type)
            && slice.temporal_id == sps.max_sub_layers_minus1;
        let frame_type = match (keyframe, slice.frame_type()) {
            (true, _) => FrameType::I,
            (false, FrameType::B) => FrameType::B,
            // non-key I pictures are reported as P
            (false, _) => FrameType::P,
        };
        let picture_order_count = self.poc.calculate(&slice, sps.log2_max_pic_order_cnt_lsb);

        core.start_frame(PendingFrame {
            nalus: vec![nalu.data],
            keyframe,
            discardable,
            frame_type,
            position: nalu.position,
            picture_order_count,
            field: false,
            sps_id: sps.id,
            sps_duration: sps.frame_duration(),
            slice,
        });
    }

    fn handle_enhancement_layer(&mut self, nalu: &Nalu) {
        if !self.config.parse_dovi_enhancement_layer || nalu.data.len() <= 2 {
            return;
        }
        let config = &self.config;
        let el = self.dovi_el.get_or_insert_with(|| {
            log::debug!("found Dolby Vision enhancement layer");
            Box::new(EsParser::with_config(config.clone()))
        });
        el.handle_nalu(Nalu {
            data: nalu.data.slice(2..),
            position: nalu.position,
        });
        self.trim_enhancement_layer();
    }

    fn trim_enhancement_layer(&mut self) {
        let Some(el) = self.dovi_el.as_mut() else {
            return;
        };
        let excess = el.queued_frames().saturating_sub(MAX_QUEUED_ENHANCEMENT_LAYER_FRAMES);
        if excess > 0 {
            log::debug!("dropping {} unfetched enhancement layer frames", excess);
            for _ in 0..excess {
                let _ = el.get_frame();
            }
        }
    }

    fn build_record(&self, nalu_size_length: usize) -> Option<HvccRecord> {
        let sps = self.sps_list.first()?;
        let pps = self.pps_list.first()?;

        let mut arrays = vec![
            array(NalUnitType::Vps, self.vps_list.iter().map(|s| s.raw().clone()).collect()),
            array(NalUnitType::Sps, self.sps_list.iter().map(|s| s.raw().clone()).collect()),
            array(NalUnitType::Pps, self.pps_list.iter().map(|s| s.raw().clone()).collect()),
        ];
        if !self.sei_list.is_empty() {
            arrays.push(array(NalUnitType::PrefixSei, self.sei_list.clone()));
        }

        Some(HvccRecord {
            profile_tier_level: sps.profile_tier_level,
            min_spatial_segmentation_idc: sps.min_spatial_segmentation_idc.min(0x0FFF) as u16,
            parallelism_type: pps.parallelism_type(),
            chroma_format_idc: sps.chroma_format_idc.min(3) as u8,
            bit_depth_luma_minus8: sps.bit_depth_luma_minus8.min(7) as u8,
            bit_depth_chroma_minus8: sps.bit_depth_chroma_minus8.min(7) as u8,
            avg_frame_rate: 0,
            constant_frame_rate: 0,
            num_temporal_layers: sps.max_sub_layers_minus1 + 1,
            temporal_id_nested: sps.temporal_id_nesting_flag,
            length_size_minus_one: (nalu_size_length - 1) as u8,
            arrays,
        })
    }
}

fn array(nalu_type: NalUnitType, nalus: Vec<Bytes>) -> NaluArray {
    NaluArray {
        array_completeness: true,
        nalu_type: nalu_type as u8,
        nalus,
    }
}

impl Codec for Hevc {
    type SliceInfo = SliceInfo;

    const CODEC_TYPE: CodecType = CodecType::H265;
    const NAME: &'static str = "HEVC";

    fn new(config: &ParserConfig) -> Self {
        Hevc {
            vps_list: ParameterSetList::new(),
            sps_list: ParameterSetList::new(),
            pps_list: ParameterSetList::new(),
            sei_list: Vec::new(),
            poc: PocState::default(),
            config: config.clone(),
            dovi_el: None,
        }
    }

    fn nalu_type(data: &[u8]) -> u8 {
        types::nalu_type(data)
    }

    fn nalu_type_name(nalu_type: u8) -> &'static str {
        types::nalu_type_name(nalu_type)
    }

    fn handle_nalu(&mut self, core: &mut EsCore<SliceInfo>, nalu: Nalu) {
        if nalu.data.len() < 2 {
            return;
        }
        let nalu_type = types::nalu_type(&nalu.data);

        match NalUnitType::from_u8(nalu_type) {
            Some(NalUnitType::Vps | NalUnitType::Sps | NalUnitType::Pps) => {
                core.flush_pending();
                self.handle_parameter_set(core, nalu);
            }
            Some(NalUnitType::PrefixSei) => {
                core.flush_pending();
                self.handle_sei(core, &nalu.data);
                core.add_aux_nalu(nalu.data);
            }
            Some(NalUnitType::Aud | NalUnitType::Eos | NalUnitType::Eob) => core.flush_pending(),
            Some(NalUnitType::Fd) => {}
            Some(NalUnitType::Unspec63) => {
                self.handle_enhancement_layer(&nalu);
                core.append_to_pending(nalu.data);
            }
            _ if types::is_slice(nalu_type) => self.handle_slice(core, nalu),
            // suffix SEI, RPU and everything else belongs to the current picture
            _ => {
                core.append_to_pending(nalu.data);
            }
        }
    }

    fn flush(&mut self, _core: &mut EsCore<SliceInfo>) {
        if let Some(el) = self.dovi_el.as_mut() {
            el.flush();
        }
        self.trim_enhancement_layer();
    }

    fn clear(&mut self) {
        self.vps_list.clear();
        self.sps_list.clear();
        self.pps_list.clear();
        self.sei_list.clear();
        self.poc = PocState::default();
        if let Some(el) = self.dovi_el.as_mut() {
            el.clear();
        }
    }

    fn configuration_record(&self, nalu_size_length: usize) -> Option<Bytes> {
        self.build_record(nalu_size_length).map(|record| record.to_bytes())
    }

    fn set_configuration_record(&mut self, core: &mut EsCore<SliceInfo>, data: &[u8]) -> Result<()> {
        let record = HvccRecord::parse(data)?;
        core.set_nalu_size_length(record.length_size_minus_one as usize + 1)?;

        for array in record.arrays {
            for raw in array.nalus {
                match NalUnitType::from_u8(array.nalu_type) {
                    Some(NalUnitType::Vps) => core.store_parameter_set(&mut self.vps_list, Vps::parse(raw)?),
                    Some(NalUnitType::Sps) => core.store_parameter_set(&mut self.sps_list, Sps::parse(raw)?),
                    Some(NalUnitType::Pps) => core.store_parameter_set(&mut self.pps_list, Pps::parse(raw)?),
                    Some(NalUnitType::PrefixSei) => {
                        if !self.sei_list.contains(&raw) {
                            self.sei_list.push(raw);
                        }
                    }
                    _ => log::debug!("skipping hvcC array of NALU type {}", array.nalu_type),
                }
            }
        }

        if !self.headers_complete() {
            return Err(VdkError::InvalidData(
                "hvcC record lacks a VPS, SPS or PPS".into(),
            ));
        }
        self.check_headers_complete(core);
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.sps_list.first().map(|sps| (sps.width(), sps.height()))
    }

    fn sample_aspect_ratio(&self) -> Option<(u32, u32)> {
        self.sps_list.first().and_then(|sps| sps.sample_aspect_ratio)
    }
}

impl EsParser<Hevc> {
    /// hvcC record of the Dolby Vision enhancement layer
    pub fn dovi_el_configuration_record(&self) -> Option<Bytes> {
        self.codec()
            .enhancement_layer()
            .and_then(|el| el.get_configuration_record())
    }
}
