use std::collections::{BTreeMap, VecDeque};

use super::frame::{BatchFrame, Frame, FrameType};
use super::stats::ParserStats;

/// Fallback field duration: 50 fields per second.
pub const DEFAULT_FIELD_DURATION: i64 = 20_000_000;

// Frame durations of common frame rates, in ns.
const WELL_KNOWN_DURATIONS: [i64; 8] = [
    41_708_333, // 23.976
    41_666_666, // 24
    40_000_000, // 25
    33_366_666, // 29.97
    33_333_333, // 30
    20_000_000, // 50
    16_683_333, // 59.94
    16_666_666, // 60
];

const SNAP_TOLERANCE: i64 = 20_000;

/// Sources a frame's duration is derived from, besides the SPS timing info.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationSources {
    /// Forced by the caller, field units
    pub forced: Option<i64>,
    /// From the first SPS that carried timing info, field units
    pub stream_default: Option<i64>,
    /// Set by the container, field units
    pub container: Option<i64>,
}

impl DurationSources {
    fn duration_for(&self, frame: &BatchFrame) -> i64 {
        let factor = if frame.field { 1 } else { 2 };

        if let Some(forced) = self.forced {
            return forced * factor;
        }
        if let Some(duration) = frame.sps_duration {
            return duration;
        }
        self.stream_default
            .or(self.container)
            .unwrap_or(DEFAULT_FIELD_DURATION)
            * factor
    }
}

/// Counts frame durations and reports the most common one.
#[derive(Debug, Default, Clone)]
pub struct DurationHistogram {
    counts: BTreeMap<i64, u64>,
}

impl DurationHistogram {
    pub fn record(&mut self, duration: i64) {
        if duration > 0 {
            *self.counts.entry(duration).or_insert(0) += 1;
        }
    }

    /// Most frequent duration, snapped to a well-known frame rate within 20 µs.
    pub fn most_often_used(&self) -> Option<i64> {
        let (&duration, _) = self.counts.iter().max_by_key(|(_, &count)| count)?;

        Some(
            WELL_KNOWN_DURATIONS
                .iter()
                .copied()
                .find(|known| (known - duration).abs() <= SNAP_TOLERANCE)
                .unwrap_or(duration),
        )
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// Turns frames in decode order into timestamped frames.
///
/// Frames collect in a batch until a keyframe starts, a parameter-set change
/// invalidates the ordering context or the stream is flushed. Draining a
/// batch ranks its frames by picture order count, assigns timestamps in
/// presentation order and computes reference offsets in decode order.
#[derive(Debug)]
pub struct ReorderEngine {
    batch: Vec<BatchFrame>,
    output: VecDeque<Frame>,
    provided: VecDeque<(i64, u64)>,
    pub(crate) durations: DurationSources,
    histogram: DurationHistogram,
    max_timestamp: i64,
    decode_counter: u64,
    presentation_counter: u64,
    previous_ip_start: Option<i64>,
    first_batch_seen: bool,
    discard_leading_non_keyframes: bool,
    simple_order: bool,
}

impl ReorderEngine {
    pub fn new(discard_leading_non_keyframes: bool) -> Self {
        ReorderEngine {
            batch: Vec::new(),
            output: VecDeque::new(),
            provided: VecDeque::new(),
            durations: DurationSources::default(),
            histogram: DurationHistogram::default(),
            max_timestamp: 0,
            decode_counter: 0,
            presentation_counter: 0,
            previous_ip_start: None,
            first_batch_seen: false,
            discard_leading_non_keyframes,
            simple_order: false,
        }
    }

    /// Records a timestamp for the frame starting at or after `position`.
    pub fn add_provided_timestamp(&mut self, timestamp: i64, position: u64, stats: &mut ParserStats) {
        stats.num_timestamps_provided += 1;
        self.provided.push_back((timestamp, position));
    }

    pub(crate) fn push(&mut self, frame: BatchFrame) {
        if let Some(first) = self.batch.first() {
            if first.sps_id != frame.sps_id && !self.simple_order {
                log::debug!(
                    "SPS {} differs from batch SPS {}, keeping decode order",
                    frame.sps_id,
                    first.sps_id
                );
                self.simple_order = true;
            }
        }
        self.batch.push(frame);
    }

    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// Moves the current batch to the output queue.
    pub fn drain(&mut self, stats: &mut ParserStats) {
        if self.batch.is_empty() {
            return;
        }
        let mut batch = std::mem::take(&mut self.batch);
        let simple_order = std::mem::replace(&mut self.simple_order, false);

        if !self.first_batch_seen {
            self.first_batch_seen = true;
            if self.discard_leading_non_keyframes && !batch[0].frame.keyframe {
                log::debug!("discarding {} frames before the first keyframe", batch.len());
                stats.num_frames_discarded += batch.len() as u64;
                return;
            }
        }

        // Indices count emitted frames only, like the presentation counter
        for entry in batch.iter_mut() {
            entry.frame.decode_order = self.decode_counter;
            self.decode_counter += 1;
        }

        let presentation = Self::presentation_order(&batch, simple_order);
        for (rank, &index) in presentation.iter().enumerate() {
            batch[index].frame.presentation_order = self.presentation_counter + rank as u64;
        }
        self.presentation_counter += batch.len() as u64;

        self.assign_timestamps(&mut batch, &presentation, stats);
        self.assign_references(&mut batch);
        self.record_durations(&batch, &presentation);

        log::debug!(
            "drained batch of {} frames{}",
            batch.len(),
            if simple_order { " in decode order" } else { "" }
        );
        stats.num_frames_emitted += batch.len() as u64;
        self.output.extend(batch.into_iter().map(|b| b.frame));
    }

    // Batch indices sorted by presentation.
    fn presentation_order(batch: &[BatchFrame], simple_order: bool) -> Vec<usize> {
        let mut order: Vec<usize> = (0..batch.len()).collect();
        if !simple_order {
            order.sort_by_key(|&i| (batch[i].frame.picture_order_count, i));
        }
        order
    }

    fn assign_timestamps(&mut self, batch: &mut [BatchFrame], presentation: &[usize], stats: &mut ParserStats) {
        let mut timestamps = Vec::new();
        for entry in batch.iter_mut() {
            let mut matched = None;
            while let Some(&(timestamp, position)) = self.provided.front() {
                if position > entry.frame.position {
                    break;
                }
                matched = Some(timestamp);
                self.provided.pop_front();
            }
            if let Some(timestamp) = matched {
                entry.frame.has_provided_timestamp = true;
                timestamps.push(timestamp);
            }
        }
        timestamps.sort_unstable();
        stats.num_timestamps_used += timestamps.len() as u64;

        let mut provided = timestamps.into_iter();
        let mut previous_end = None;
        for &index in presentation {
            let duration = self.durations.duration_for(&batch[index]);
            let frame = &mut batch[index].frame;

            frame.start = match frame.has_provided_timestamp {
                true => provided.next().unwrap_or(self.max_timestamp),
                false => {
                    stats.num_timestamps_generated += 1;
                    previous_end.unwrap_or(self.max_timestamp)
                }
            };
            frame.end = frame.start + duration;
            previous_end = Some(frame.end);
            self.max_timestamp = self.max_timestamp.max(frame.end);
        }
    }

    fn assign_references(&mut self, batch: &mut [BatchFrame]) {
        for index in 0..batch.len() {
            let start = batch[index].frame.start;
            match batch[index].frame.frame_type {
                FrameType::I => {
                    self.previous_ip_start = Some(start);
                }
                FrameType::P => {
                    batch[index].frame.ref1 = self.previous_ip_start.map(|prev| prev - start);
                    self.previous_ip_start = Some(start);
                }
                FrameType::B => {
                    let next_ip = batch[index + 1..]
                        .iter()
                        .find(|b| b.frame.frame_type != FrameType::B)
                        .map_or(self.max_timestamp, |b| b.frame.start);
                    let frame = &mut batch[index].frame;
                    frame.ref1 = self.previous_ip_start.map(|prev| prev - start);
                    frame.ref2 = Some(next_ip - start);
                }
            }
        }
    }

    fn record_durations(&mut self, batch: &[BatchFrame], presentation: &[usize]) {
        let mut previous: Option<&Frame> = None;
        for &index in presentation {
            let frame = &batch[index].frame;
            match (frame.has_provided_timestamp, previous) {
                (true, Some(prev)) if prev.has_provided_timestamp => {
                    self.histogram.record(frame.start - prev.start)
                }
                (true, _) => {}
                (false, _) => self.histogram.record(frame.end - frame.start),
            }
            previous = Some(frame);
        }
    }

    pub fn frame_available(&self) -> bool {
        !self.output.is_empty()
    }

    pub fn next_frame(&mut self) -> Option<Frame> {
        self.output.pop_front()
    }

    pub fn queued_frames(&self) -> usize {
        self.output.len()
    }

    pub fn most_often_used_duration(&self) -> Option<i64> {
        self.histogram.most_often_used()
    }

    /// Forgets all frames and timestamps; counters and duration sources stay.
    pub fn clear(&mut self) {
        self.batch.clear();
        self.output.clear();
        self.provided.clear();
        self.simple_order = false;
    }
}
