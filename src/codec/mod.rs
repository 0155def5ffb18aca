/// Codec independent elementary stream machinery
pub mod es;

/// H.264/AVC parsing
pub mod h264;

/// H.265/HEVC parsing, including Dolby Vision enhancement layers
pub mod h265;

pub use es::{Codec, EsParser, Frame, FrameType};
pub use h264::AvcParser;
pub use h265::HevcParser;
