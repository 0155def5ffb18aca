mod common;

use common::*;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio_test::io::Builder;
use vdkes::av::{CodecData, CodecType};
use vdkes::codec::h264::AvccRecord;
use vdkes::codec::FrameType;
use vdkes::config::ParserConfig;
use vdkes::format::{AvcDemuxer, Demuxer};
use vdkes::VdkError;

#[test]
fn test_sps_pps_idr_p() {
    let (sps, pps, idr, p) = (sps(0, true), pps(0, 0), idr(), slice(SLICE_P, 1, 2, 0));
    let mut parser = parser();
    parser.add_bytes(&annex_b(&[sps.clone(), pps.clone(), idr.clone(), p.clone()]));
    parser.flush();

    let frames = drain(&mut parser);
    assert_eq!(frames.len(), 2);

    assert!(frames[0].keyframe);
    assert_eq!(frames[0].frame_type, FrameType::I);
    assert_eq!(frames[0].data.to_vec(), frame_payload(&[&idr]));
    assert_eq!((frames[0].start, frames[0].end), (0, FRAME_DURATION));

    assert!(!frames[1].keyframe);
    assert_eq!(frames[1].frame_type, FrameType::P);
    assert_eq!(frames[1].data.to_vec(), frame_payload(&[&p]));
    assert_eq!(frames[1].start, FRAME_DURATION);
    assert_eq!(frames[1].ref1, Some(-FRAME_DURATION));

    let record = AvccRecord::parse(&parser.get_configuration_record().unwrap()).unwrap();
    assert_eq!(record.sps[0].to_vec(), sps);
    assert_eq!(record.pps[0].to_vec(), pps);
    assert_eq!((parser.width().unwrap(), parser.height().unwrap()), (1920, 1080));
    assert_eq!(parser.stats().num_frames_emitted, 2);
}

#[test]
fn test_start_codes_split_across_calls() {
    let stream = annex_b(&[
        sps(0, true),
        pps(0, 0),
        idr(),
        slice(SLICE_P, 1, 4, 0),
        slice(SLICE_B, 2, 2, 0),
        slice(SLICE_P, 2, 6, 0),
    ]);

    let mut whole = parser();
    whole.add_bytes(&stream);
    whole.flush();
    let expected = drain(&mut whole);
    assert_eq!(expected.len(), 4);

    for split in 1..stream.len() {
        let mut parser = parser();
        parser.add_bytes(&stream[..split]);
        parser.add_bytes(&stream[split..]);
        parser.flush();
        assert_eq!(drain(&mut parser), expected, "split at {}", split);
    }

    let mut bytewise = parser();
    for byte in &stream {
        bytewise.add_bytes(std::slice::from_ref(byte));
    }
    bytewise.flush();
    assert_eq!(drain(&mut bytewise), expected);
}

#[test]
fn test_provided_timestamps_snap_to_ntsc_rate() {
    let mut parser = parser();
    parser.add_bytes(&annex_b(&[sps(0, false), pps(0, 0)]));

    let timestamps: Vec<i64> = (0..10).map(|i| i * 1_000_000_000 * 1001 / 30_000).collect();
    for (i, &timestamp) in timestamps.iter().enumerate() {
        parser.add_timestamp(timestamp);
        let nalu = match i {
            0 => idr(),
            _ => slice(SLICE_P, i as u32, 2 * i as u32, 0),
        };
        parser.add_bytes(&annex_b(&[nalu]));
    }
    parser.flush();

    let frames = drain(&mut parser);
    let starts: Vec<i64> = frames.iter().map(|f| f.start).collect();
    assert_eq!(starts, timestamps);
    assert!(frames.iter().all(|f| f.has_provided_timestamp));

    assert_eq!(parser.get_most_often_used_duration(), Some(1_000_000_000 * 1001 / 30_000));
    assert_eq!(parser.stats().num_timestamps_used, 10);
}

#[test]
fn test_configuration_record_feeds_second_parser() {
    let mut first = parser();
    first.add_bytes(&annex_b(&[sps(0, true), pps(0, 0), idr()]));
    let record = first.get_configuration_record().unwrap();

    let mut second = parser();
    assert!(second.get_configuration_record().is_none());
    second.set_configuration_record(&record).unwrap();
    assert!(second.headers_parsed());
    assert_eq!(second.get_configuration_record(), Some(record));

    let (idr, p) = (idr(), slice(SLICE_P, 1, 2, 0));
    second.add_bytes(&annex_b(&[idr.clone(), p]));
    second.flush();

    let frames = drain(&mut second);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].data.to_vec(), frame_payload(&[&idr]));
}

#[test]
fn test_repeated_sps_is_not_a_change() {
    let mut parser = parser();
    parser.add_bytes(&annex_b(&[sps(0, true), pps(0, 0), idr()]));
    assert!(parser.configuration_record_changed());
    parser.reset_configuration_record_changed();

    let (sps, p) = (sps(0, true), slice(SLICE_P, 1, 2, 0));
    parser.add_bytes(&annex_b(&[sps, p.clone(), idr()]));
    parser.flush();

    assert!(!parser.configuration_record_changed());
    let frames = drain(&mut parser);
    assert_eq!(frames[1].data.to_vec(), frame_payload(&[&p]));
    assert_eq!(parser.stats().num_parameter_set_changes, 0);
}

#[test]
fn test_new_sps_inside_batch_keeps_decode_order() {
    let (sps1, pps1) = (sps(1, true), pps(1, 1));
    let b = slice(SLICE_B, 2, 4, 1);
    let mut parser = parser();
    parser.add_bytes(&annex_b(&[
        sps(0, true),
        pps(0, 0),
        idr(),
        slice(SLICE_P, 1, 8, 0),
        sps1.clone(),
        pps1.clone(),
        b.clone(),
    ]));
    parser.flush();

    let frames = drain(&mut parser);
    let pocs: Vec<i64> = frames.iter().map(|f| f.picture_order_count).collect();
    assert_eq!(pocs, vec![0, 8, 4]);
    let presentation: Vec<u64> = frames.iter().map(|f| f.presentation_order).collect();
    assert_eq!(presentation, vec![0, 1, 2]);
    let starts: Vec<i64> = frames.iter().map(|f| f.start).collect();
    assert_eq!(starts, vec![0, FRAME_DURATION, 2 * FRAME_DURATION]);

    assert_eq!(frames[2].data.to_vec(), frame_payload(&[&sps1, &pps1, &b]));
    assert!(parser.configuration_record_changed());
    assert_eq!(AvccRecord::parse(&parser.get_configuration_record().unwrap()).unwrap().sps.len(), 2);
}

#[test]
fn test_orders_line_up_after_leading_frames_are_discarded() {
    let mut parser = parser();
    parser.add_bytes(&annex_b(&[
        sps(0, true),
        pps(0, 0),
        slice(SLICE_P, 1, 2, 0),
        slice(SLICE_P, 2, 4, 0),
        idr(),
        slice(SLICE_P, 1, 8, 0),
        sps(1, true),
        pps(1, 1),
        slice(SLICE_B, 2, 4, 1),
    ]));
    parser.flush();

    let frames = drain(&mut parser);
    assert_eq!(parser.stats().num_frames_discarded, 2);
    let orders: Vec<(u64, u64)> = frames.iter().map(|f| (f.decode_order, f.presentation_order)).collect();
    assert_eq!(orders, vec![(0, 0), (1, 1), (2, 2)]);
}

#[test]
fn test_leading_batch_without_keyframe() {
    let nalus = [
        sps(0, true),
        pps(0, 0),
        slice(SLICE_P, 1, 2, 0),
        slice(SLICE_P, 2, 4, 0),
        idr(),
        slice(SLICE_P, 1, 2, 0),
    ];

    let mut discarding = parser();
    discarding.add_bytes(&annex_b(&nalus));
    discarding.flush();
    let frames = drain(&mut discarding);
    assert_eq!(frames.len(), 2);
    assert!(frames[0].keyframe);
    assert_eq!(frames[0].start, 0);
    assert_eq!(discarding.stats().num_frames_discarded, 2);

    let config = ParserConfig {
        discard_leading_non_keyframes: false,
        ..ParserConfig::default()
    };
    let mut keeping = vdkes::codec::AvcParser::with_config(config);
    keeping.add_bytes(&annex_b(&nalus));
    keeping.flush();
    let keys: Vec<bool> = drain(&mut keeping).iter().map(|f| f.keyframe).collect();
    assert_eq!(keys, vec![false, false, true, false]);
}

#[test]
fn test_length_prefixed_input_matches_annex_b() {
    let nalus = [
        sps(0, true),
        pps(0, 0),
        idr(),
        slice(SLICE_P, 1, 4, 0),
        slice(SLICE_B, 2, 2, 0),
    ];

    let mut annex = parser();
    annex.add_bytes(&annex_b(&nalus));
    annex.flush();

    let mut framed = parser();
    framed.add_bytes_framed(&length_prefixed(&nalus), 4).unwrap();
    framed.flush();

    let summary = |frames: Vec<vdkes::codec::Frame>| -> Vec<(Vec<u8>, bool, i64)> {
        frames.into_iter().map(|f| (f.data.to_vec(), f.keyframe, f.start)).collect()
    };
    assert_eq!(summary(drain(&mut framed)), summary(drain(&mut annex)));
    assert!(framed.add_bytes_framed(&[0, 1, 0x09], 5).is_err());
}

#[test]
fn test_smaller_size_fields() {
    let mut parser = parser();
    parser.set_nalu_size_length(2).unwrap();
    assert!(parser.set_nalu_size_length(0).is_err());

    let idr = idr();
    parser.add_bytes(&annex_b(&[sps(0, true), pps(0, 0), idr.clone()]));
    parser.flush();

    let frame = parser.get_frame().unwrap();
    let mut expected = (idr.len() as u16).to_be_bytes().to_vec();
    expected.extend_from_slice(&idr);
    assert_eq!(frame.data.to_vec(), expected);

    let record = AvccRecord::parse(&parser.get_configuration_record().unwrap()).unwrap();
    assert_eq!(record.length_size_minus_one, 1);
    assert!(matches!(parser.get_frame(), Err(VdkError::Precondition(_))));
}

#[tokio::test]
async fn test_demuxer_packets() {
    let stream = annex_b(&[
        sps(0, true),
        pps(0, 0),
        idr(),
        slice(SLICE_P, 1, 2, 0),
        slice(SLICE_P, 2, 4, 0),
    ]);
    let (a, rest) = stream.split_at(30);
    let (b, c) = rest.split_at(7);
    let reader = Builder::new().read(a).read(b).read(c).build();
    let mut demuxer = AvcDemuxer::new(reader);

    let streams = demuxer.streams().await.unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].codec_type(), CodecType::H264);
    assert_eq!((streams[0].width(), streams[0].height()), (Some(1920), Some(1080)));
    let record = AvccRecord::parse(streams[0].extra_data().unwrap()).unwrap();
    assert_eq!(record.profile_idc, 66);

    let mut packets = Vec::new();
    loop {
        match demuxer.read_packet().await {
            Ok(packet) => packets.push(packet),
            Err(VdkError::EndOfStream) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(packets.len(), 3);
    let pts: Vec<Option<i64>> = packets.iter().map(|p| p.pts).collect();
    assert_eq!(pts, vec![Some(0), Some(FRAME_DURATION), Some(2 * FRAME_DURATION)]);
    assert!(packets[0].is_key);
    assert!(!packets[1].is_key);
    assert!(packets.iter().all(|p| p.duration == Some(Duration::from_millis(40))));
}

#[tokio::test]
async fn test_demuxer_as_stream() {
    let stream = annex_b(&[sps(0, true), pps(0, 0), idr(), slice(SLICE_P, 1, 2, 0)]);
    let demuxer = AvcDemuxer::new(&stream[..]).with_chunk_size(5);

    let packets: Vec<_> = demuxer.into_stream().collect().await;
    assert_eq!(packets.len(), 2);
    assert!(packets.iter().all(|p| p.is_ok()));
}
