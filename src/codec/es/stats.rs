use std::collections::BTreeMap;

use super::frame::FrameType;

/// Counters collected while parsing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParserStats {
    /// NALUs seen, keyed by NAL unit type
    pub nalus_by_type: BTreeMap<u8, u64>,
    /// Slices parsed, indexed I, P, B
    pub slices_by_type: [u64; 3],
    pub num_slice_parse_failures: u64,
    pub num_parameter_set_changes: u64,
    pub num_timestamps_provided: u64,
    pub num_timestamps_used: u64,
    pub num_timestamps_generated: u64,
    pub num_frames_emitted: u64,
    pub num_frames_discarded: u64,
    pub num_deferred_replayed: u64,
    pub num_deferred_dropped: u64,
}

impl ParserStats {
    /// True when nothing has been counted.
    pub fn is_empty(&self) -> bool {
        *self == ParserStats::default()
    }

    pub(crate) fn count_slice(&mut self, frame_type: FrameType) {
        let index = match frame_type {
            FrameType::I => 0,
            FrameType::P => 1,
            FrameType::B => 2,
        };
        self.slices_by_type[index] += 1;
    }

    pub(crate) fn count_nalu(&mut self, nalu_type: u8) {
        *self.nalus_by_type.entry(nalu_type).or_insert(0) += 1;
    }

    /// Renders the counters on one line, naming NALU types with `name_of`.
    pub fn summary(&self, name_of: impl Fn(u8) -> &'static str) -> String {
        let nalus = self
            .nalus_by_type
            .iter()
            .map(|(t, n)| format!("{}={}", name_of(*t), n))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "nalus [{}] slices I={} P={} B={} slice_failures={} ps_changes={} \
             timestamps provided={} used={} generated={} frames emitted={} discarded={} \
             deferred replayed={} dropped={}",
            nalus,
            self.slices_by_type[0],
            self.slices_by_type[1],
            self.slices_by_type[2],
            self.num_slice_parse_failures,
            self.num_parameter_set_changes,
            self.num_timestamps_provided,
            self.num_timestamps_used,
            self.num_timestamps_generated,
            self.num_frames_emitted,
            self.num_frames_discarded,
            self.num_deferred_replayed,
            self.num_deferred_dropped,
        )
    }
}
