use bytes::Bytes;
use pretty_assertions::assert_eq;

use super::config_record::AvccRecord;
use super::parameter_sets::Sps;
use super::parser::AvcParser;
use super::slice::{PocState, SliceInfo};
use crate::codec::es::{Frame, FrameType};
use crate::config::ParserConfig;
use crate::utils::{rbsp_to_nalu, BitWriter};

const SLICE_P: u32 = 5;
const SLICE_B: u32 = 6;
const SLICE_I: u32 = 7;

fn nalu(nal_ref_idc: u8, nalu_type: u8, rbsp: BitWriter) -> Vec<u8> {
    let mut data = vec![(nal_ref_idc << 5) | nalu_type];
    data.extend_from_slice(&rbsp_to_nalu(&rbsp.into_bytes()));
    data
}

#[derive(Clone, Copy)]
struct SpsOptions {
    profile_idc: u8,
    pic_order_cnt_type: u32,
    interlaced: bool,
    timing: bool,
    pic_width_in_mbs_minus1: u32,
}

impl Default for SpsOptions {
    fn default() -> Self {
        SpsOptions {
            profile_idc: 66,
            pic_order_cnt_type: 0,
            interlaced: false,
            timing: true,
            pic_width_in_mbs_minus1: 119,
        }
    }
}

/// 1920x1080 SPS with 4 bit frame_num, 8 bit POC lsb and 50 fields per second.
fn sps(options: SpsOptions) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bits(options.profile_idc as u64, 8);
    w.write_bits(0xC0, 8);
    w.write_bits(40, 8);
    w.write_golomb(0); // sps id
    if options.profile_idc == 100 {
        w.write_golomb(1); // 4:2:0
        w.write_golomb(2); // 10 bit luma
        w.write_golomb(2);
        w.write_bit(false);
        w.write_bit(true); // seq_scaling_matrix_present_flag
        w.write_bit(true);
        w.write_signed_golomb(-8); // ends the first list
        for _ in 1..8 {
            w.write_bit(false);
        }
    }
    w.write_golomb(0); // log2_max_frame_num_minus4
    w.write_golomb(options.pic_order_cnt_type);
    if options.pic_order_cnt_type == 0 {
        w.write_golomb(4);
    }
    w.write_golomb(2); // max_num_ref_frames
    w.write_bit(false);
    w.write_golomb(options.pic_width_in_mbs_minus1);
    if options.interlaced {
        w.write_golomb(33);
        w.write_bit(false); // frame_mbs_only_flag
        w.write_bit(false);
    } else {
        w.write_golomb(67);
        w.write_bit(true);
    }
    w.write_bit(true); // direct_8x8_inference_flag
    w.write_bit(true); // frame_cropping_flag
    w.write_golomb(0);
    w.write_golomb(0);
    w.write_golomb(0);
    w.write_golomb(if options.interlaced { 2 } else { 4 });
    w.write_bit(true); // vui
    w.write_bit(true);
    w.write_bits(14, 8); // SAR 4:3
    w.write_bit(false);
    w.write_bit(false);
    w.write_bit(false);
    w.write_bit(options.timing);
    if options.timing {
        w.write_bits(1, 32);
        w.write_bits(50, 32);
        w.write_bit(true);
    }
    w.write_trailing_bits();
    nalu(3, 7, w)
}

fn pps(id: u32) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_golomb(id);
    w.write_golomb(0);
    w.write_bit(false);
    w.write_bit(false);
    w.write_golomb(0); // num_slice_groups_minus1
    w.write_trailing_bits();
    nalu(3, 8, w)
}

struct Slice {
    nal_ref_idc: u8,
    idr: bool,
    slice_type: u32,
    frame_num: u32,
    poc_lsb: u32,
    /// None for frames, Some(bottom) for fields
    field: Option<bool>,
    pps_id: u32,
}

impl Slice {
    fn new(slice_type: u32, frame_num: u32, poc_lsb: u32) -> Self {
        Slice {
            nal_ref_idc: if slice_type == SLICE_B { 0 } else { 2 },
            idr: false,
            slice_type,
            frame_num,
            poc_lsb,
            field: None,
            pps_id: 0,
        }
    }

    fn idr() -> Self {
        Slice {
            idr: true,
            nal_ref_idc: 3,
            ..Slice::new(SLICE_I, 0, 0)
        }
    }

    fn field(mut self, bottom: bool) -> Self {
        self.field = Some(bottom);
        self
    }

    fn encode(&self, interlaced: bool) -> Vec<u8> {
        let mut w = BitWriter::new();
        w.write_golomb(0); // first_mb_in_slice
        w.write_golomb(self.slice_type);
        w.write_golomb(self.pps_id);
        w.write_bits(self.frame_num as u64, 4);
        if interlaced {
            w.write_bit(self.field.is_some());
            if let Some(bottom) = self.field {
                w.write_bit(bottom);
            }
        }
        if self.idr {
            w.write_golomb(0);
        }
        w.write_bits(self.poc_lsb as u64, 8);
        w.write_bits(0x5A, 8);
        w.write_trailing_bits();
        nalu(self.nal_ref_idc, if self.idr { 5 } else { 1 }, w)
    }
}

fn annex_b(nalus: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = Vec::new();
    for nalu in nalus {
        stream.extend_from_slice(&[0, 0, 1]);
        stream.extend_from_slice(nalu);
    }
    stream
}

fn parse(nalus: &[Vec<u8>]) -> (AvcParser, Vec<Frame>) {
    let mut parser = AvcParser::with_config(ParserConfig::default());
    parser.add_bytes(&annex_b(nalus));
    parser.flush();
    let frames = std::iter::from_fn(|| parser.get_frame().ok()).collect();
    (parser, frames)
}

fn progressive(slices: &[Slice]) -> Vec<Vec<u8>> {
    let mut nalus = vec![sps(SpsOptions::default()), pps(0)];
    nalus.extend(slices.iter().map(|s| s.encode(false)));
    nalus
}

#[test]
fn test_sps_parsing() {
    let parsed = Sps::parse(Bytes::from(sps(SpsOptions::default()))).unwrap();
    assert_eq!((parsed.width(), parsed.height()), (1920, 1080));
    assert_eq!(parsed.log2_max_frame_num, 4);
    assert_eq!(parsed.log2_max_pic_order_cnt_lsb, 8);
    assert_eq!(parsed.sample_aspect_ratio, Some((4, 3)));
    assert_eq!(parsed.field_duration(), Some(20_000_000));

    let interlaced = SpsOptions {
        interlaced: true,
        ..SpsOptions::default()
    };
    let parsed = Sps::parse(Bytes::from(sps(interlaced))).unwrap();
    assert!(!parsed.frame_mbs_only_flag);
    assert_eq!((parsed.width(), parsed.height()), (1920, 1080));
}

#[test]
fn test_oversized_sps_is_rejected() {
    let huge = SpsOptions {
        pic_width_in_mbs_minus1: 1 << 30,
        ..SpsOptions::default()
    };
    assert!(Sps::parse(Bytes::from(sps(huge))).is_err());

    let (parser, frames) = parse(&[sps(huge), pps(0), Slice::idr().encode(false)]);
    assert!(frames.is_empty());
    assert!(!parser.headers_parsed());
    assert!(parser.width().is_err());
}

#[test]
fn test_high_profile_sps_and_avcc() {
    let high = SpsOptions {
        profile_idc: 100,
        ..SpsOptions::default()
    };
    let parsed = Sps::parse(Bytes::from(sps(high))).unwrap();
    assert_eq!(parsed.bit_depth_luma_minus8, 2);
    assert_eq!((parsed.width(), parsed.height()), (1920, 1080));

    let mut parser = AvcParser::with_config(ParserConfig::default());
    parser.add_bytes(&annex_b(&[sps(high), pps(0), Slice::idr().encode(false)]));
    let record = AvccRecord::parse(&parser.get_configuration_record().unwrap()).unwrap();
    let ext = record.high_profile.unwrap();
    assert_eq!((ext.chroma_format, ext.bit_depth_luma_minus8), (1, 2));
}

#[test]
fn test_idr_then_p() {
    let (parser, frames) = parse(&progressive(&[Slice::idr(), Slice::new(SLICE_P, 1, 2)]));

    assert_eq!(frames.len(), 2);
    assert!(frames[0].keyframe);
    assert_eq!(frames[0].frame_type, FrameType::I);
    assert_eq!((frames[0].start, frames[0].end), (0, 40_000_000));
    assert_eq!(frames[1].frame_type, FrameType::P);
    assert_eq!((frames[1].start, frames[1].end), (40_000_000, 80_000_000));
    assert_eq!(frames[1].ref1, Some(-40_000_000));
    assert_eq!(parser.width().unwrap(), 1920);
    assert_eq!(parser.sample_aspect_ratio().unwrap(), (4, 3));
    assert!((parser.display_aspect_ratio().unwrap() - 1920.0 * 4.0 / (1080.0 * 3.0)).abs() < 1e-9);
}

#[test]
fn test_b_frames_are_reordered() {
    let slices = [
        Slice::idr(),
        Slice::new(SLICE_P, 1, 8),
        Slice::new(SLICE_B, 2, 4),
        Slice::new(SLICE_P, 2, 12),
    ];
    let (_, frames) = parse(&progressive(&slices));

    let pocs: Vec<_> = frames.iter().map(|f| f.picture_order_count).collect();
    assert_eq!(pocs, vec![0, 8, 4, 12]);
    let starts: Vec<_> = frames.iter().map(|f| f.start / 1_000_000).collect();
    assert_eq!(starts, vec![0, 80, 40, 120]);
    let order: Vec<_> = frames.iter().map(|f| f.presentation_order).collect();
    assert_eq!(order, vec![0, 2, 1, 3]);

    assert!(frames[2].discardable);
    assert!(!frames[1].discardable);
    assert_eq!(frames[2].frame_type, FrameType::B);
    assert_eq!(frames[2].ref2, Some(80_000_000));
}

#[test]
fn test_non_idr_i_frames() {
    let slices = [
        Slice::idr(),
        Slice::new(SLICE_I, 1, 2),
        Slice::new(SLICE_P, 2, 8),
        Slice::new(SLICE_B, 3, 6),
        Slice::new(SLICE_I, 3, 10),
    ];
    let (_, frames) = parse(&progressive(&slices));

    let keys: Vec<_> = frames.iter().map(|f| f.keyframe).collect();
    assert_eq!(keys, vec![true, true, false, false, false]);
    assert_eq!(frames[4].frame_type, FrameType::P);
    assert_eq!(frames[4].ref1, Some(frames[2].start - frames[4].start));
}

#[test]
fn test_next_i_slice_is_key_frame() {
    let mut parser = AvcParser::with_config(ParserConfig::default());
    let slices = [
        Slice::idr(),
        Slice::new(SLICE_P, 1, 4),
        Slice::new(SLICE_B, 2, 2),
    ];
    parser.add_bytes(&annex_b(&progressive(&slices)));
    parser.set_next_i_slice_is_key_frame();
    parser.add_bytes(&annex_b(&[Slice::new(SLICE_I, 2, 6).encode(false)]));
    parser.flush();

    let frames: Vec<_> = std::iter::from_fn(|| parser.get_frame().ok()).collect();
    assert_eq!(frames.len(), 4);
    assert!(frames[3].keyframe);
}

#[test]
fn test_recovery_point_sei() {
    let mut sei = BitWriter::new();
    sei.write_bits(6, 8);
    sei.write_bits(1, 8);
    sei.write_bits(0x84, 8);
    sei.write_trailing_bits();

    let nalus = vec![
        sps(SpsOptions::default()),
        pps(0),
        nalu(0, 6, sei),
        Slice::new(SLICE_P, 3, 6).encode(false),
        Slice::new(SLICE_P, 4, 8).encode(false),
    ];
    let (_, frames) = parse(&nalus);

    assert_eq!(frames.len(), 2);
    assert!(frames[0].keyframe);
    assert_eq!(frames[0].frame_type, FrameType::I);
    assert!(!frames[1].keyframe);
}

#[test]
fn test_leading_non_keyframes_are_discarded() {
    let slices = [Slice::new(SLICE_P, 1, 2), Slice::new(SLICE_P, 2, 4), Slice::idr()];
    let (parser, frames) = parse(&progressive(&slices));

    assert_eq!(frames.len(), 1);
    assert!(frames[0].keyframe);
    assert_eq!(parser.stats().num_frames_discarded, 2);
}

#[test]
fn test_field_pairs_are_merged() {
    let interlaced = SpsOptions {
        interlaced: true,
        ..SpsOptions::default()
    };
    let second_field = Slice {
        nal_ref_idc: 3,
        ..Slice::new(SLICE_P, 0, 1)
    };
    let nalus = vec![
        sps(interlaced),
        pps(0),
        Slice::idr().field(false).encode(true),
        second_field.field(true).encode(true),
        Slice::new(SLICE_P, 1, 4).field(false).encode(true),
        Slice::new(SLICE_P, 1, 5).field(true).encode(true),
        Slice::new(SLICE_P, 2, 8).field(false).encode(true),
    ];
    let (_, frames) = parse(&nalus);

    assert_eq!(frames.len(), 3);
    let pocs: Vec<_> = frames.iter().map(|f| f.picture_order_count).collect();
    assert_eq!(pocs, vec![0, 4, 8]);
    let durations: Vec<_> = frames.iter().map(|f| f.duration()).collect();
    assert_eq!(durations, vec![40_000_000, 40_000_000, 20_000_000]);
    assert!(frames[0].keyframe);
}

#[test]
fn test_configuration_record_round_trip() {
    let mut parser = AvcParser::with_config(ParserConfig::default());
    parser.add_bytes(&annex_b(&progressive(&[Slice::idr()])));
    let record = parser.get_configuration_record().unwrap();

    let avcc = AvccRecord::parse(&record).unwrap();
    assert_eq!(avcc.profile_idc, 66);
    assert_eq!(avcc.level_idc, 40);
    assert_eq!(avcc.sps[0].to_vec(), sps(SpsOptions::default()));
    assert_eq!(avcc.pps[0].to_vec(), pps(0));
    assert!(avcc.high_profile.is_none());

    let mut other = AvcParser::with_config(ParserConfig::default());
    other.set_configuration_record(&record).unwrap();
    assert_eq!(other.get_configuration_record(), Some(record));
    assert!(other.set_configuration_record(&[1, 66]).is_err());
}

#[test]
fn test_configuration_record_keeps_nalu_size_length() {
    let mut parser = AvcParser::with_config(ParserConfig::default());
    parser.set_nalu_size_length(2).unwrap();
    parser.add_bytes(&annex_b(&progressive(&[Slice::idr()])));
    let record = parser.get_configuration_record().unwrap();
    assert_eq!(AvccRecord::parse(&record).unwrap().length_size_minus_one, 1);

    let mut other = AvcParser::with_config(ParserConfig::default());
    other.set_configuration_record(&record).unwrap();
    assert_eq!(other.nalu_size_length(), 2);
    assert_eq!(other.get_configuration_record(), Some(record));
}

#[test]
fn test_identical_sps_does_not_change_record() {
    let mut parser = AvcParser::with_config(ParserConfig::default());
    parser.add_bytes(&annex_b(&progressive(&[Slice::idr()])));
    parser.reset_configuration_record_changed();

    parser.add_bytes(&annex_b(&[sps(SpsOptions::default()), Slice::idr().encode(false)]));
    assert!(!parser.configuration_record_changed());

    parser.add_bytes(&annex_b(&[pps(1), Slice::idr().encode(false)]));
    assert!(parser.configuration_record_changed());
    assert_eq!(parser.codec().pps_list().len(), 2);
}

#[test]
fn test_unknown_pps_counts_as_parse_failure() {
    let broken = Slice {
        pps_id: 7,
        ..Slice::new(SLICE_P, 1, 2)
    };
    let (parser, frames) = parse(&progressive(&[Slice::idr(), broken]));

    assert_eq!(frames.len(), 1);
    assert_eq!(parser.stats().num_slice_parse_failures, 1);
}

#[test]
fn test_poc_type_2() {
    let options = SpsOptions {
        pic_order_cnt_type: 2,
        ..SpsOptions::default()
    };
    let parsed = Sps::parse(Bytes::from(sps(options))).unwrap();
    let slice = |nalu_type, nal_ref_idc, frame_num| SliceInfo {
        nalu_type,
        nal_ref_idc,
        frame_num,
        ..Default::default()
    };

    let mut poc = PocState::default();
    assert_eq!(poc.calculate(&slice(5, 3, 0), &parsed), 0);
    assert_eq!(poc.calculate(&slice(1, 2, 1), &parsed), 2);
    assert_eq!(poc.calculate(&slice(1, 0, 2), &parsed), 3);
    assert_eq!(poc.calculate(&slice(1, 2, 15), &parsed), 30);
    // frame_num wrapped around
    assert_eq!(poc.calculate(&slice(1, 2, 0), &parsed), 32);
}
