//! # H.265/HEVC Elementary Streams
//!
//! [`HevcParser`] turns an HEVC byte stream into frames. The codec side,
//! [`Hevc`], handles:
//!
//! - VPS, SPS and PPS decoding with change detection
//! - Slice segment headers and picture order counts
//! - Recovery point and user data SEIs
//! - hvcC configuration records
//! - A nested parser for the Dolby Vision enhancement layer in NALU type 63
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vdkes::codec::h265::HevcParser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut parser = HevcParser::new();
//! let raw_data = std::fs::read("video.h265")?;
//!
//! parser.add_bytes(&raw_data);
//! parser.flush();
//!
//! while parser.frame_available() {
//!     let frame = parser.get_frame()?;
//!     println!("{} frame, pts {} ns, {} bytes", frame.frame_type, frame.start, frame.data.len());
//! }
//! # Ok(())
//! # }
//! ```

/// hvcC configuration record
pub mod config_record;

/// VPS, SPS and PPS decoding
pub mod parameter_sets;

/// The HEVC codec driving [`crate::codec::es::EsParser`]
pub mod parser;

/// Slice segment headers and picture order counts
pub mod slice;

/// NAL unit types and helpers
pub mod types;


pub use config_record::{HvccRecord, NaluArray};
pub use parameter_sets::{Pps, ProfileTierLevel, Sps, Vps};
pub use parser::{Hevc, HevcParser};
pub use slice::{PocState, SliceInfo};
pub use types::NalUnitType;
