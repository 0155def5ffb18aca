//! H.264 stream builders shared by the integration tests.

#![allow(dead_code)]

use vdkes::codec::h264::AvcParser;
use vdkes::codec::Frame;
use vdkes::config::ParserConfig;
use vdkes::utils::{rbsp_to_nalu, BitWriter};

pub const SLICE_P: u32 = 5;
pub const SLICE_B: u32 = 6;
pub const SLICE_I: u32 = 7;

pub const FRAME_DURATION: i64 = 40_000_000;

pub fn nalu(nal_ref_idc: u8, nalu_type: u8, rbsp: BitWriter) -> Vec<u8> {
    let mut data = vec![(nal_ref_idc << 5) | nalu_type];
    data.extend_from_slice(&rbsp_to_nalu(&rbsp.into_bytes()));
    data
}

/// Baseline 1920x1080 SPS, 4 bit frame_num, 8 bit POC lsb, 25 frames per
/// second when `timing` is set.
pub fn sps(id: u32, timing: bool) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bits(66, 8);
    w.write_bits(0xC0, 8);
    w.write_bits(31, 8);
    w.write_golomb(id);
    w.write_golomb(0); // log2_max_frame_num_minus4
    w.write_golomb(0); // pic_order_cnt_type
    w.write_golomb(4);
    w.write_golomb(2);
    w.write_bit(false);
    w.write_golomb(119);
    w.write_golomb(67);
    w.write_bit(true); // frame_mbs_only_flag
    w.write_bit(true);
    w.write_bit(true); // frame_cropping_flag
    w.write_golomb(0);
    w.write_golomb(0);
    w.write_golomb(0);
    w.write_golomb(4);
    w.write_bit(timing); // vui
    if timing {
        w.write_bit(false);
        w.write_bit(false);
        w.write_bit(false);
        w.write_bit(false);
        w.write_bit(true);
        w.write_bits(1, 32);
        w.write_bits(50, 32);
        w.write_bit(true);
    }
    w.write_trailing_bits();
    nalu(3, 7, w)
}

pub fn pps(id: u32, sps_id: u32) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_golomb(id);
    w.write_golomb(sps_id);
    w.write_bit(false);
    w.write_bit(false);
    w.write_golomb(0);
    w.write_trailing_bits();
    nalu(3, 8, w)
}

/// A single-slice picture; B slices are non-reference.
pub fn slice(slice_type: u32, frame_num: u32, poc_lsb: u32, pps_id: u32) -> Vec<u8> {
    let idr = slice_type == SLICE_I && frame_num == 0;
    let mut w = BitWriter::new();
    w.write_golomb(0);
    w.write_golomb(slice_type);
    w.write_golomb(pps_id);
    w.write_bits(frame_num as u64, 4);
    if idr {
        w.write_golomb(0);
    }
    w.write_bits(poc_lsb as u64, 8);
    w.write_bits(0xA5, 8);
    w.write_trailing_bits();

    let nal_ref_idc = match slice_type {
        SLICE_B => 0,
        _ if idr => 3,
        _ => 2,
    };
    nalu(nal_ref_idc, if idr { 5 } else { 1 }, w)
}

pub fn idr() -> Vec<u8> {
    slice(SLICE_I, 0, 0, 0)
}

pub fn annex_b(nalus: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = Vec::new();
    for nalu in nalus {
        stream.extend_from_slice(&[0, 0, 0, 1]);
        stream.extend_from_slice(nalu);
    }
    stream
}

pub fn length_prefixed(nalus: &[Vec<u8>]) -> Vec<u8> {
    let mut buffer = Vec::new();
    for nalu in nalus {
        buffer.extend_from_slice(&(nalu.len() as u32).to_be_bytes());
        buffer.extend_from_slice(nalu);
    }
    buffer
}

pub fn parser() -> AvcParser {
    AvcParser::with_config(ParserConfig::default())
}

pub fn drain(parser: &mut AvcParser) -> Vec<Frame> {
    std::iter::from_fn(|| parser.get_frame().ok()).collect()
}

/// Size-prefixed frame payload holding exactly `nalus`.
pub fn frame_payload(nalus: &[&[u8]]) -> Vec<u8> {
    let mut data = Vec::new();
    for nalu in nalus {
        data.extend_from_slice(&(nalu.len() as u32).to_be_bytes());
        data.extend_from_slice(nalu);
    }
    data
}
