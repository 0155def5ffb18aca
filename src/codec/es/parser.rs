use bytes::Bytes;
use std::fmt;

use super::assembler::EsCore;
use super::frame::Frame;
use super::framer::Nalu;
use super::stats::ParserStats;
use crate::av::CodecType;
use crate::config::{self, ParserConfig};
use crate::error::{Result, VdkError};

/// Codec specific half of an [`EsParser`].
///
/// Implementations dispatch NALUs by type, own the parameter sets and turn
/// slices into pictures through the shared [`EsCore`].
pub trait Codec: Sized + Send {
    /// Decoded slice header
    type SliceInfo: Clone + fmt::Debug + Send;

    /// Codec reported to containers
    const CODEC_TYPE: CodecType;

    /// Short name for log messages
    const NAME: &'static str;

    /// Creates the codec state for a parser using `config`
    fn new(config: &ParserConfig) -> Self;

    /// NAL unit type from the first header byte(s)
    fn nalu_type(data: &[u8]) -> u8;

    /// Human readable name of a NAL unit type
    fn nalu_type_name(nalu_type: u8) -> &'static str;

    /// Handles one NALU in stream order
    fn handle_nalu(&mut self, core: &mut EsCore<Self::SliceInfo>, nalu: Nalu);

    /// Called on flush before the pending frame is finalized
    fn flush(&mut self, _core: &mut EsCore<Self::SliceInfo>) {}

    /// Forgets parameter sets and decoding state
    fn clear(&mut self);

    /// Packs the current parameter sets into the codec's configuration record
    fn configuration_record(&self, nalu_size_length: usize) -> Option<Bytes>;

    /// Loads parameter sets from a configuration record
    fn set_configuration_record(&mut self, core: &mut EsCore<Self::SliceInfo>, data: &[u8]) -> Result<()>;

    /// Cropped picture size of the stream's first SPS
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Sample aspect ratio of the stream's first SPS
    fn sample_aspect_ratio(&self) -> Option<(u32, u32)>;
}

/// Elementary stream parser for one video track.
///
/// Bytes go in through [`EsParser::add_bytes`] or
/// [`EsParser::add_bytes_framed`], complete frames come out of
/// [`EsParser::get_frame`] in decode order with presentation timestamps.
///
/// ```rust
/// use vdkes::codec::h264::AvcParser;
///
/// let mut parser = AvcParser::new();
/// parser.add_bytes(&[0x00, 0x00, 0x00, 0x01, 0x09, 0xF0]);
/// parser.flush();
/// assert!(!parser.frame_available());
/// assert!(parser.get_configuration_record().is_none());
/// ```
pub struct EsParser<C: Codec> {
    core: EsCore<C::SliceInfo>,
    codec: C,
}

impl<C: Codec> EsParser<C> {
    /// Creates a parser with the global defaults from [`config::current`]
    pub fn new() -> Self {
        Self::with_config(config::current())
    }

    /// Creates a parser with explicit settings
    pub fn with_config(config: ParserConfig) -> Self {
        let codec = C::new(&config);
        EsParser {
            core: EsCore::new(config),
            codec,
        }
    }

    /// Adds Annex-B data; chunks may be cut anywhere.
    pub fn add_bytes(&mut self, data: &[u8]) {
        for nalu in self.core.framer.add_bytes(data) {
            self.handle_nalu(nalu);
        }
    }

    /// Adds length-prefixed NALUs with `width`-byte big-endian sizes.
    pub fn add_bytes_framed(&mut self, data: &[u8], width: usize) -> Result<()> {
        for nalu in self.core.framer.add_bytes_framed(data, width)? {
            self.handle_nalu(nalu);
        }
        Ok(())
    }

    /// Provides the timestamp of the frame starting with the next bytes added.
    pub fn add_timestamp(&mut self, timestamp: i64) {
        self.core.add_timestamp(timestamp);
    }

    pub(crate) fn handle_nalu(&mut self, nalu: Nalu) {
        let Some(&header) = nalu.data.first() else {
            return;
        };
        let nalu_type = C::nalu_type(&nalu.data);
        log::trace!(
            "{} NALU {} ({}) at {} size {} header {:#04x}",
            C::NAME,
            nalu_type,
            C::nalu_type_name(nalu_type),
            nalu.position,
            nalu.data.len(),
            header
        );
        self.core.stats.count_nalu(nalu_type);
        self.codec.handle_nalu(&mut self.core, nalu);
    }

    /// Finalizes everything buffered; all complete frames become available.
    pub fn flush(&mut self) {
        if let Some(nalu) = self.core.framer.flush() {
            self.handle_nalu(nalu);
        }
        self.codec.flush(&mut self.core);
        self.core.flush_pending();
        self.core.drop_deferred();
        self.core.drain_batch();
    }

    /// Drops buffered data, frames and parameter sets.
    pub fn clear(&mut self) {
        self.core.clear();
        self.codec.clear();
    }

    /// Loads parameter sets from an avcC/hvcC record.
    pub fn set_configuration_record(&mut self, data: &[u8]) -> Result<()> {
        self.codec.set_configuration_record(&mut self.core, data)
    }

    /// The avcC/hvcC record, once all mandatory parameter sets were seen.
    pub fn get_configuration_record(&self) -> Option<Bytes> {
        if !self.core.headers_parsed() {
            return None;
        }
        self.codec.configuration_record(self.core.nalu_size_length())
    }

    pub fn headers_parsed(&self) -> bool {
        self.core.headers_parsed()
    }

    /// Parameter sets were added or changed since the last reset.
    pub fn configuration_record_changed(&self) -> bool {
        self.core.configuration_record_changed()
    }

    pub fn reset_configuration_record_changed(&mut self) {
        self.core.reset_configuration_record_changed();
    }

    pub fn frame_available(&self) -> bool {
        self.core.reorder.frame_available()
    }

    /// Frames waiting to be fetched with [`EsParser::get_frame`].
    pub fn queued_frames(&self) -> usize {
        self.core.reorder.queued_frames()
    }

    /// Next frame in decode order.
    pub fn get_frame(&mut self) -> Result<Frame> {
        self.core
            .reorder
            .next_frame()
            .ok_or_else(|| VdkError::Precondition("no frame available".into()))
    }

    fn require_dimensions(&self) -> Result<(u32, u32)> {
        self.codec
            .dimensions()
            .filter(|_| self.core.headers_parsed())
            .ok_or_else(|| VdkError::Precondition("headers not parsed yet".into()))
    }

    pub fn width(&self) -> Result<u32> {
        self.require_dimensions().map(|(width, _)| width)
    }

    pub fn height(&self) -> Result<u32> {
        self.require_dimensions().map(|(_, height)| height)
    }

    /// Sample aspect ratio as (numerator, denominator); 1:1 when unsignalled.
    pub fn sample_aspect_ratio(&self) -> Result<(u32, u32)> {
        self.require_dimensions()?;
        Ok(self.codec.sample_aspect_ratio().unwrap_or((1, 1)))
    }

    /// Display aspect ratio, width over height after applying the sample aspect ratio.
    pub fn display_aspect_ratio(&self) -> Result<f64> {
        let (width, height) = self.require_dimensions()?;
        let (num, den) = self.sample_aspect_ratio()?;
        if height == 0 || den == 0 {
            return Err(VdkError::InvalidData("picture height is zero".into()));
        }
        Ok(width as f64 * num as f64 / (height as f64 * den as f64))
    }

    /// Forces every frame to last twice `duration` (one field each way).
    pub fn force_default_duration(&mut self, duration: i64) {
        self.core.reorder.durations.forced = Some(duration);
    }

    /// Field duration to use when the stream carries no timing info.
    pub fn set_container_default_duration(&mut self, duration: i64) {
        self.core.reorder.durations.container = Some(duration);
    }

    /// Width of the size field written before each NALU of a frame.
    pub fn set_nalu_size_length(&mut self, length: usize) -> Result<()> {
        self.core.set_nalu_size_length(length)
    }

    pub fn nalu_size_length(&self) -> usize {
        self.core.nalu_size_length()
    }

    /// Treats the next I slice as a keyframe even if it is not an IDR picture.
    pub fn set_next_i_slice_is_key_frame(&mut self) {
        self.core.next_i_slice_is_key_frame = true;
    }

    /// Most common frame duration so far, snapped to a well-known frame rate.
    pub fn get_most_often_used_duration(&self) -> Option<i64> {
        self.core.reorder.most_often_used_duration()
    }

    pub fn stats(&self) -> &ParserStats {
        &self.core.stats
    }

    /// Codec specific state
    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut C {
        &mut self.codec
    }

    pub fn codec_type(&self) -> CodecType {
        C::CODEC_TYPE
    }
}

impl<C: Codec> Default for EsParser<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> fmt::Debug for EsParser<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EsParser")
            .field("codec", &C::NAME)
            .field("headers_parsed", &self.core.headers_parsed())
            .field("batch", &self.core.reorder.batch_len())
            .field("stats", &self.core.stats)
            .finish()
    }
}

impl<C: Codec> Drop for EsParser<C> {
    fn drop(&mut self) {
        if !self.core.stats.is_empty() {
            log::debug!(
                "{} parser statistics: {}",
                C::NAME,
                self.core.stats.summary(C::nalu_type_name)
            );
        }
    }
}
