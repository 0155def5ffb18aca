//! # H.264/AVC Elementary Streams
//!
//! [`AvcParser`] turns an AVC byte stream into frames. The codec side,
//! [`Avc`], covers:
//!
//! - SPS decoding through the VUI timing info, including high profile fields,
//!   frame cropping and field coding
//! - Slice headers and picture order count types 0, 1 and 2
//! - Merging complementary field pairs into one frame
//! - Recovery point SEIs and non-IDR keyframes
//! - avcC configuration records
//!
//! ## Example
//!
//! ```rust
//! use vdkes::codec::h264::AvcParser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut parser = AvcParser::new();
//! parser.add_timestamp(0);
//! parser.add_bytes(&[0x00, 0x00, 0x00, 0x01, 0x09, 0xF0]);
//! parser.flush();
//!
//! while parser.frame_available() {
//!     let frame = parser.get_frame()?;
//!     println!("{} frame at {} ns", frame.frame_type, frame.start);
//! }
//! # Ok(())
//! # }
//! ```

/// avcC configuration record
pub mod config_record;

/// SPS and PPS decoding
pub mod parameter_sets;

/// The AVC codec driving [`crate::codec::es::EsParser`]
pub mod parser;

/// Slice headers and picture order counts
pub mod slice;

/// NAL unit types and helpers
pub mod types;

#[cfg(test)]
mod parser_test;

pub use config_record::{AvccRecord, HighProfileExtension};
pub use parameter_sets::{Pps, Sps};
pub use parser::{Avc, AvcParser};
pub use slice::{PocState, SliceInfo};
pub use types::NalUnitType;
