use bytes::Bytes;
use std::time::Duration;

use crate::codec::es::Frame;

/// A compressed frame as handed to a container.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Size-prefixed NALUs
    pub data: Bytes,
    /// Presentation timestamp in nanoseconds
    pub pts: Option<i64>,
    pub stream_index: usize,
    pub is_key: bool,
    /// May be dropped without affecting other frames
    pub is_discardable: bool,
    pub duration: Option<Duration>,
}

impl Packet {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pts: None,
            stream_index: 0,
            is_key: false,
            is_discardable: false,
            duration: None,
        }
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_stream_index(mut self, index: usize) -> Self {
        self.stream_index = index;
        self
    }

    pub fn with_key_flag(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn with_discardable_flag(mut self, is_discardable: bool) -> Self {
        self.is_discardable = is_discardable;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

impl From<Frame> for Packet {
    fn from(frame: Frame) -> Self {
        let duration = Duration::from_nanos(frame.duration().max(0) as u64);
        Packet::new(frame.data)
            .with_pts(frame.start)
            .with_key_flag(frame.keyframe)
            .with_discardable_flag(frame.discardable)
            .with_duration(duration)
    }
}
