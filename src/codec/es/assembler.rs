use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashSet;

use super::frame::{BatchFrame, Frame, PendingFrame};
use super::framer::{Nalu, NaluFramer};
use super::reorder::ReorderEngine;
use super::stats::ParserStats;
use super::store::{Classification, ParameterSet, ParameterSetList};
use crate::config::ParserConfig;
use crate::error::{Result, VdkError};
use crate::utils::Fingerprint;

/// Codec independent state of an elementary stream parser.
///
/// Holds the framer, the picture being assembled, NALUs waiting to be
/// prepended to the next frame and the reorder engine. Codec implementations
/// drive it from their NALU dispatch.
#[derive(Debug)]
pub struct EsCore<S> {
    pub(crate) framer: NaluFramer,
    pub(crate) config: ParserConfig,
    pub(crate) reorder: ReorderEngine,
    pub(crate) stats: ParserStats,
    pending: Option<PendingFrame<S>>,
    aux_nalus: Vec<Bytes>,
    extra_data: Vec<(Fingerprint, Bytes)>,
    emitted: HashSet<Fingerprint>,
    deferred: Vec<Nalu>,
    headers_parsed: bool,
    configuration_record_changed: bool,
    /// A recovery point SEI was seen; the next picture is a keyframe
    pub recovery_point_valid: bool,
    /// The next I slice starts a keyframe regardless of its NALU type
    pub next_i_slice_is_key_frame: bool,
}

impl<S> EsCore<S> {
    pub fn new(config: ParserConfig) -> Self {
        let mut reorder = ReorderEngine::new(config.discard_leading_non_keyframes);
        reorder.durations.forced = config.forced_default_duration;

        EsCore {
            framer: NaluFramer::new(),
            config,
            reorder,
            stats: ParserStats::default(),
            pending: None,
            aux_nalus: Vec::new(),
            extra_data: Vec::new(),
            emitted: HashSet::new(),
            deferred: Vec::new(),
            headers_parsed: false,
            configuration_record_changed: false,
            recovery_point_valid: false,
            next_i_slice_is_key_frame: false,
        }
    }

    pub fn nalu_size_length(&self) -> usize {
        self.config.nalu_size_length
    }

    pub fn set_nalu_size_length(&mut self, length: usize) -> Result<()> {
        if !(1..=4).contains(&length) {
            return Err(VdkError::InvalidData(format!(
                "NALU size length must be 1-4, got {}",
                length
            )));
        }
        self.config.nalu_size_length = length;
        Ok(())
    }

    pub fn headers_parsed(&self) -> bool {
        self.headers_parsed
    }

    /// Marks the mandatory parameter sets as complete.
    ///
    /// Returns true on the first call only. The sets in `in_record` are part of
    /// the configuration record and are never repeated in frames.
    pub fn set_headers_parsed(&mut self, in_record: impl IntoIterator<Item = Fingerprint>) -> bool {
        if self.headers_parsed {
            return false;
        }
        self.headers_parsed = true;
        self.emitted.extend(in_record);
        let emitted = &self.emitted;
        self.extra_data.retain(|(fp, _)| !emitted.contains(fp));
        log::debug!("all mandatory parameter sets seen");
        true
    }

    pub fn configuration_record_changed(&self) -> bool {
        self.configuration_record_changed
    }

    pub fn mark_configuration_record_changed(&mut self) {
        self.configuration_record_changed = true;
    }

    pub fn reset_configuration_record_changed(&mut self) {
        self.configuration_record_changed = false;
    }

    /// Queues a parameter set to be written in front of the next frame.
    pub fn add_extra_data(&mut self, fingerprint: Fingerprint, raw: Bytes) {
        if self.emitted.contains(&fingerprint) || self.extra_data.iter().any(|(fp, _)| *fp == fingerprint) {
            return;
        }
        self.extra_data.push((fingerprint, raw));
    }

    /// Adds or replaces a parameter set in `list`.
    ///
    /// New and changed sets are queued for the next frame and flag the
    /// configuration record as changed. A changed set whose parent id differs
    /// ends the current reorder batch first.
    pub fn store_parameter_set<T: ParameterSet>(&mut self, list: &mut ParameterSetList<T>, set: T) {
        match list.classify(&set) {
            Classification::Unchanged => return,
            Classification::Changed { parent_changed } => {
                if parent_changed {
                    self.drain_batch();
                }
                self.stats.num_parameter_set_changes += 1;
            }
            Classification::New => {}
        }
        self.add_extra_data(set.fingerprint(), set.raw().clone());
        self.mark_configuration_record_changed();
        list.upsert(set);
    }

    /// Buffers a NALU that precedes the next picture (SEI and the like).
    pub fn add_aux_nalu(&mut self, nalu: Bytes) {
        self.aux_nalus.push(nalu);
    }

    pub fn defer(&mut self, nalu: Nalu) {
        self.deferred.push(nalu);
    }

    pub fn take_deferred(&mut self) -> Vec<Nalu> {
        let deferred = std::mem::take(&mut self.deferred);
        self.stats.num_deferred_replayed += deferred.len() as u64;
        deferred
    }

    pub fn drop_deferred(&mut self) {
        if !self.deferred.is_empty() {
            log::debug!("dropping {} slices received before the parameter sets", self.deferred.len());
            self.stats.num_deferred_dropped += self.deferred.len() as u64;
            self.deferred.clear();
        }
    }

    pub fn pending(&self) -> Option<&PendingFrame<S>> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingFrame<S>> {
        self.pending.as_mut()
    }

    /// Appends a NALU to the picture being assembled. False if there is none.
    pub fn append_to_pending(&mut self, nalu: Bytes) -> bool {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.nalus.push(nalu);
                true
            }
            None => false,
        }
    }

    /// Starts a new picture. The previous one must have been finalized.
    pub fn start_frame(&mut self, frame: PendingFrame<S>) {
        if frame.keyframe {
            self.drain_batch();
        }
        self.recovery_point_valid = false;
        self.pending = Some(frame);
    }

    /// Finalizes the pending picture into the reorder batch.
    pub fn flush_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let size_length = self.config.nalu_size_length;
        let extra = std::mem::take(&mut self.extra_data);
        let aux = std::mem::take(&mut self.aux_nalus);

        let mut nalus: Vec<Bytes> = Vec::with_capacity(extra.len() + aux.len() + pending.nalus.len());
        for (fingerprint, raw) in extra {
            self.emitted.insert(fingerprint);
            nalus.push(raw);
        }
        nalus.extend(aux);
        nalus.extend(pending.nalus);

        let total = nalus.iter().map(|n| n.len() + size_length).sum();
        let mut data = BytesMut::with_capacity(total);
        for nalu in &nalus {
            if size_length < 4 && nalu.len() >= 1 << (8 * size_length) {
                log::warn!(
                    "NALU of {} bytes does not fit a {} byte size field",
                    nalu.len(),
                    size_length
                );
            }
            data.put_uint(nalu.len() as u64, size_length);
            data.put_slice(nalu);
        }

        self.reorder.push(BatchFrame {
            frame: Frame {
                data: data.freeze(),
                keyframe: pending.keyframe,
                discardable: pending.discardable,
                frame_type: pending.frame_type,
                position: pending.position,
                decode_order: 0,
                presentation_order: 0,
                picture_order_count: pending.picture_order_count,
                start: 0,
                end: 0,
                ref1: None,
                ref2: None,
                has_provided_timestamp: false,
            },
            field: pending.field,
            sps_id: pending.sps_id,
            sps_duration: pending.sps_duration,
        });
    }

    pub fn drain_batch(&mut self) {
        self.reorder.drain(&mut self.stats);
    }

    pub fn add_timestamp(&mut self, timestamp: i64) {
        let position = self.framer.stream_position();
        self.reorder.add_provided_timestamp(timestamp, position, &mut self.stats);
    }

    /// Drops all buffered data and the parsing state; statistics are kept.
    pub fn clear(&mut self) {
        self.framer.clear();
        self.reorder.clear();
        self.pending = None;
        self.aux_nalus.clear();
        self.extra_data.clear();
        self.emitted.clear();
        self.deferred.clear();
        self.headers_parsed = false;
        self.configuration_record_changed = false;
        self.recovery_point_valid = false;
        self.next_i_slice_is_key_frame = false;
    }
}
