//! Container-facing types: codec descriptions and packets.

/// Video codecs an elementary stream parser can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecType {
    /// H.264/AVC
    H264,
    /// H.265/HEVC
    H265,
}

/// Stream description handed to muxers.
pub trait CodecData: Send + Sync {
    /// Codec of the stream
    fn codec_type(&self) -> CodecType;
    /// Cropped picture width
    fn width(&self) -> Option<u32>;
    /// Cropped picture height
    fn height(&self) -> Option<u32>;
    /// avcC/hvcC configuration record
    fn extra_data(&self) -> Option<&[u8]>;
}

mod packet;
pub use packet::*;
