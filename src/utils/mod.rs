//! # Utility Functions and Types
//!
//! Helpers shared by the codec parsers:
//!
//! - Bit-level reading and writing of RBSP data
//! - Emulation prevention removal and insertion
//! - Content fingerprints for parameter sets
//!
//! ## Bit Operations
//!
//! ```rust
//! use vdkes::utils::{BitReader, BitWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3);
//! writer.write_golomb(7);
//! let data = writer.into_bytes();
//!
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(3)?, 0b101);
//! assert_eq!(reader.read_golomb()?, 7);
//! # Ok(())
//! # }
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

/// MD5 fingerprints of parameter sets
pub mod fingerprint;

/// Emulation prevention handling
pub mod rbsp;

// Re-export commonly used types
pub use bits::*;
pub use fingerprint::Fingerprint;
pub use rbsp::{nalu_to_rbsp, rbsp_to_nalu};
