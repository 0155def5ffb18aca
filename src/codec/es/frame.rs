use bytes::Bytes;
use std::fmt;

/// Coding type of a frame as seen by a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Keyframe
    I,
    /// Forward-predicted frame
    P,
    /// Bidirectionally predicted frame
    B,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameType::I => "I",
            FrameType::P => "P",
            FrameType::B => "B",
        };
        f.write_str(name)
    }
}

/// A complete picture ready for a container.
///
/// `data` holds every NALU of the picture, each preceded by a big-endian size
/// field of the parser's configured width. Timestamps are in nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Size-prefixed NALUs
    pub data: Bytes,
    /// Random access point
    pub keyframe: bool,
    /// Not referenced by any other picture
    pub discardable: bool,
    /// I, P or B
    pub frame_type: FrameType,
    /// Input offset of the frame's first slice
    pub position: u64,
    /// Index in decode order, counted over the whole stream
    pub decode_order: u64,
    /// Index in presentation order, counted over the whole stream
    pub presentation_order: u64,
    /// Picture order count as coded in the stream
    pub picture_order_count: i64,
    /// Presentation timestamp
    pub start: i64,
    /// `start` plus the frame's duration
    pub end: i64,
    /// Offset to the previous I/P frame's timestamp
    pub ref1: Option<i64>,
    /// Offset to the following I/P frame's timestamp (B frames only)
    pub ref2: Option<i64>,
    /// `start` came from a timestamp passed to `add_timestamp`
    pub has_provided_timestamp: bool,
}

impl Frame {
    /// Frame duration in nanoseconds
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

/// The picture currently being assembled.
#[derive(Debug, Clone)]
pub struct PendingFrame<S> {
    /// NALUs in arrival order, without size fields
    pub nalus: Vec<Bytes>,
    /// Header of the picture's first slice
    pub slice: S,
    pub keyframe: bool,
    pub discardable: bool,
    pub frame_type: FrameType,
    pub position: u64,
    pub picture_order_count: i64,
    /// Single field rather than a frame or a field pair
    pub field: bool,
    pub sps_id: u32,
    /// Duration derived from the SPS timing info, if it has any
    pub sps_duration: Option<i64>,
}

/// A finalized frame waiting in the reorder batch.
#[derive(Debug, Clone)]
pub(crate) struct BatchFrame {
    pub frame: Frame,
    pub field: bool,
    pub sps_id: u32,
    pub sps_duration: Option<i64>,
}
