use bytes::Bytes;

use super::config_record::{AvccRecord, HighProfileExtension};
use super::parameter_sets::{Pps, Sps};
use super::slice::{parse_slice_header, PocState, SliceInfo};
use super::types::{self, NalUnitType, AVCC_EXTENDED_PROFILES};
use crate::av::CodecType;
use crate::codec::es::sei::{sei_messages, SEI_RECOVERY_POINT};
use crate::codec::es::{Codec, EsCore, EsParser, FrameType, Nalu, ParameterSet, ParameterSetList, PendingFrame};
use crate::config::ParserConfig;
use crate::error::{Result, VdkError};
use crate::utils::nalu_to_rbsp;

/// H.264 elementary stream parser
pub type AvcParser = EsParser<Avc>;

/// H.264/AVC side of [`EsParser`].
#[derive(Debug, Default)]
pub struct Avc {
    sps_list: ParameterSetList<Sps>,
    pps_list: ParameterSetList<Pps>,
    poc: PocState,
    b_frames_since_keyframe: bool,
}

impl Avc {
    pub fn sps_list(&self) -> &ParameterSetList<Sps> {
        &self.sps_list
    }

    pub fn pps_list(&self) -> &ParameterSetList<Pps> {
        &self.pps_list
    }

    fn headers_complete(&self) -> bool {
        !self.sps_list.is_empty() && !self.pps_list.is_empty()
    }

    fn check_headers_complete(&mut self, core: &mut EsCore<SliceInfo>) {
        if !self.headers_complete() {
            return;
        }
        let fingerprints: Vec<_> = self
            .sps_list
            .iter()
            .map(|s| s.fingerprint())
            .chain(self.pps_list.iter().map(|p| p.fingerprint()))
            .collect();
        if core.set_headers_parsed(fingerprints) {
            for nalu in core.take_deferred() {
                self.handle_slice(core, nalu);
            }
        }
    }

    fn store_sps(&mut self, core: &mut EsCore<SliceInfo>, sps: Sps) {
        if let Some(duration) = sps.field_duration() {
            core.reorder.durations.stream_default.get_or_insert(duration);
        }
        core.store_parameter_set(&mut self.sps_list, sps);
    }

    fn handle_parameter_set(&mut self, core: &mut EsCore<SliceInfo>, nalu: Nalu) {
        let nalu_type = types::nalu_type(&nalu.data);
        let stored = if nalu_type == NalUnitType::Sps as u8 {
            Sps::parse(nalu.data).map(|sps| self.store_sps(core, sps))
        } else {
            Pps::parse(nalu.data).map(|pps| core.store_parameter_set(&mut self.pps_list, pps))
        };

        match stored {
            Ok(()) => self.check_headers_complete(core),
            Err(e) => log::debug!("ignoring undecodable {}: {}", types::nalu_type_name(nalu_type), e),
        }
    }

    fn handle_sei(&self, core: &mut EsCore<SliceInfo>, data: &[u8]) {
        if data.len() <= 1 {
            return;
        }
        let rbsp = nalu_to_rbsp(&data[1..]);
        if sei_messages(&rbsp).iter().any(|(t, _)| *t == SEI_RECOVERY_POINT) {
            core.recovery_point_valid = true;
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
        let Some(sps) = self.sps_list.get(slice.sps_id) else {
            return;
        };
        core.stats.count_slice(slice.frame_type());

        if let Some(pending) = core.pending() {
            if pending.field && slice.completes_field_pair(&pending.slice) {
                let poc = self.poc.calculate(&slice, sps);
                let frame_duration = sps.field_duration().map(|d| d * 2);
                if let Some(pending) = core.pending_mut() {
                    pending.picture_order_count = pending.picture_order_count.min(poc);
                    pending.field = false;
                    pending.sps_duration = frame_duration;
                    pending.nalus.push(nalu.data);
                }
                return;
            }
            if slice.starts_new_picture(&pending.slice) {
                core.flush_pending();
            }
        }
        if core.append_to_pending(nalu.data.clone()) {
            return;
        }

        let mut keyframe = core.recovery_point_valid;
        if slice.is_i_slice() {
            keyframe |= slice.is_idr() || !self.b_frames_since_keyframe || core.next_i_slice_is_key_frame;
            core.next_i_slice_is_key_frame = false;
        }

        let frame_type = match (keyframe, slice.frame_type()) {
            (true, _) => FrameType::I,
            (false, FrameType::B) => FrameType::B,
            // non-key I pictures are reported as P
            (false, _) => FrameType::P,
        };
        if keyframe {
            self.b_frames_since_keyframe = false;
        } else if frame_type == FrameType::B {
            self.b_frames_since_keyframe = true;
        }

        let field = slice.field_pic_flag;
        let picture_order_count = self.poc.calculate(&slice, sps);
        let sps_duration = sps.field_duration().map(|d| if field { d } else { d * 2 });

        core.start_frame(PendingFrame {
            nalus: vec![nalu.data],
            keyframe,
            discardable: slice.is_b_slice() && slice.nal_ref_idc == 0,
            frame_type,
            position: nalu.position,
            picture_order_count,
            field,
            sps_id: sps.id,
            sps_duration,
            slice,
        });
    }

    fn build_record(&self, nalu_size_length: usize) -> Option<AvccRecord> {
        let sps = self.sps_list.first()?;

        let high_profile = AVCC_EXTENDED_PROFILES
            .contains(&sps.profile_idc)
            .then_some(HighProfileExtension {
                chroma_format: sps.chroma_format_idc as u8,
                bit_depth_luma_minus8: sps.bit_depth_luma_minus8 as u8,
                bit_depth_chroma_minus8: sps.bit_depth_chroma_minus8 as u8,
            });

        Some(AvccRecord {
            profile_idc: sps.profile_idc,
            profile_compatibility: sps.profile_compatibility,
            level_idc: sps.level_idc,
            length_size_minus_one: (nalu_size_length - 1) as u8,
            sps: self.sps_list.iter().map(|s| s.raw().clone()).collect(),
            pps: self.pps_list.iter().map(|p| p.raw().clone()).collect(),
            high_profile,
        })
    }
}

impl Codec for Avc {
    type SliceInfo = SliceInfo;

    const CODEC_TYPE: CodecType = CodecType::H264;
    const NAME: &'static str = "AVC";

    fn new(_config: &ParserConfig) -> Self {
        Avc::default()
    }

    fn nalu_type(data: &[u8]) -> u8 {
        types::nalu_type(data)
    }

    fn nalu_type_name(nalu_type: u8) -> &'static str {
        types::nalu_type_name(nalu_type)
    }

    fn handle_nalu(&mut self, core: &mut EsCore<SliceInfo>, nalu: Nalu) {
        match NalUnitType::from(types::nalu_type(&nalu.data)) {
            NalUnitType::CodedSliceNonIdr | NalUnitType::CodedSliceIdr => self.handle_slice(core, nalu),
            NalUnitType::Sps | NalUnitType::Pps => {
                core.flush_pending();
                self.handle_parameter_set(core, nalu);
            }
            NalUnitType::Sei => {
                core.flush_pending();
                self.handle_sei(core, &nalu.data);
                core.add_aux_nalu(nalu.data);
            }
            NalUnitType::AccessUnitDelimiter | NalUnitType::EndOfSequence | NalUnitType::EndOfStream => {
                core.flush_pending();
            }
            NalUnitType::FillerData => {}
            // data partitions, extensions and the rest belong to the current picture
            _ => {
                core.append_to_pending(nalu.data);
            }
        }
    }

    fn clear(&mut self) {
        *self = Avc::default();
    }

    fn configuration_record(&self, nalu_size_length: usize) -> Option<Bytes> {
        self.build_record(nalu_size_length).map(|record| record.to_bytes())
    }

    fn set_configuration_record(&mut self, core: &mut EsCore<SliceInfo>, data: &[u8]) -> Result<()> {
        let record = AvccRecord::parse(data)?;
        core.set_nalu_size_length(record.length_size_minus_one as usize + 1)?;
        for raw in record.sps {
            self.store_sps(core, Sps::parse(raw)?);
        }
        for raw in record.pps {
            core.store_parameter_set(&mut self.pps_list, Pps::parse(raw)?);
        }

        if !self.headers_complete() {
            return Err(VdkError::InvalidData("avcC record lacks an SPS or PPS".into()));
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
