#![doc(html_root_url = "https://docs.rs/vdkes/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # vdkes - H.264/H.265 Elementary Stream Parsing
//!
//! `vdkes` turns raw H.264/AVC and H.265/HEVC byte streams into frames a
//! container muxer can store directly. It handles the work a muxer needs
//! between a camera or encoder and a file:
//!
//! - Splitting Annex-B and length-prefixed input into NAL units
//! - Tracking parameter sets and building avcC/hvcC configuration records
//! - Grouping slices into pictures with keyframe and discardable flags
//! - Restoring presentation order from picture order counts and assigning
//!   timestamps and durations
//! - Dolby Vision enhancement layers nested in HEVC streams
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! vdkes = "0.1.0"
//! ```
//!
//! ### Parsing a Byte Stream
//!
//! ```rust,no_run
//! use vdkes::codec::h264::AvcParser;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data = std::fs::read("input.h264")?;
//!     let mut parser = AvcParser::new();
//!     parser.add_bytes(&data);
//!     parser.flush();
//!
//!     if let Some(record) = parser.get_configuration_record() {
//!         println!("avcC: {} bytes", record.len());
//!     }
//!     while parser.frame_available() {
//!         let frame = parser.get_frame()?;
//!         println!("{} frame, pts {} ns, key {}", frame.frame_type, frame.start, frame.keyframe);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Async Demuxing
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use vdkes::format::{Demuxer, HevcDemuxer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = tokio::fs::File::open("input.h265").await?;
//!     let mut demuxer = HevcDemuxer::new(file);
//!     let streams = demuxer.streams().await?;
//!     println!("{} streams", streams.len());
//!
//!     let mut packets = Box::pin(demuxer.into_stream());
//!     while let Some(packet) = packets.next().await {
//!         let packet = packet?;
//!         println!("{} bytes at {:?}", packet.data.len(), packet.pts);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: codec descriptions and packets handed to containers
//! - `codec`: the elementary stream parsers
//!   - `es`: framing, parameter set storage, frame assembly and reordering
//!   - `h264`, `h265`: codec specific header parsing
//! - `format`: async demuxer over raw elementary streams
//! - `config`: process wide parser defaults
//! - `error`: error type and result alias
//! - `utils`: bitstream reading/writing and emulation prevention

/// Codec descriptions and packets
pub mod av;

/// Elementary stream parsers for H.264 and H.265
pub mod codec;

/// Error types and utilities
pub mod error;

/// Demuxers over raw elementary streams
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use error::{Result, VdkError};
