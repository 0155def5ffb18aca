//! # Elementary Stream Parsing
//!
//! Codec independent machinery shared by the H.264 and H.265 parsers:
//!
//! - [`framer`]: start code and length-prefixed NALU splitting
//! - [`store`]: parameter set lists keyed by id with change detection
//! - [`assembler`]: frame assembly state
//! - [`reorder`]: presentation order, timestamps and reference offsets
//!
//! The entry point is [`EsParser`], parameterized by a [`Codec`].

/// Frame assembly state shared by all codecs
pub mod assembler;

/// Frame types produced by the parser
pub mod frame;

/// NALU framing
pub mod framer;

/// The generic parser and the codec trait
pub mod parser;

/// Presentation order and timestamp engine
pub mod reorder;

/// SEI message splitting
pub mod sei;

/// Parser statistics
pub mod stats;

/// Parameter set storage
pub mod store;

/// VUI fields shared by both codecs
pub mod vui;

pub use assembler::EsCore;
pub use frame::{Frame, FrameType, PendingFrame};
pub use framer::{Nalu, NaluFramer};
pub use parser::{Codec, EsParser};
pub use reorder::DurationHistogram;
pub use stats::ParserStats;
pub use store::{Classification, ParameterSet, ParameterSetList};
