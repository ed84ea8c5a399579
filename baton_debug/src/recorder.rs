// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records, each prefixed by a tag byte and the
//! receipt time in nanoseconds since the recorder was created. [`decode`]
//! reads them back as an iterator of [`Record`].
//!
//! Object changes ([`on_object_changes`](TraceSink::on_object_changes))
//! store only the per-kind counts.

use std::time::Instant;

use baton_core::buffer::BufferIndex;
use baton_core::trace::{
    BuildEvent, ChangeKind, DrainEvent, FlipEvent, FrameBeginEvent, FrameSummary, ObjectChange,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
};

use crate::nanos_since;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_DRAIN: u8 = 4;
const TAG_BUILD: u8 = 5;
const TAG_FLIP: u8 = 6;
const TAG_FRAME_SUMMARY: u8 = 7;
const TAG_OBJECT_CHANGES: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    start: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder. Timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far, keeping the time origin.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn header(&mut self, tag: u8, frame_index: u64) {
        self.write_u8(tag);
        let nanos = nanos_since(self.start);
        self.write_u64(nanos);
        self.write_u64(frame_index);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, count: usize) {
        self.write_u32(u32::try_from(count).unwrap_or(u32::MAX));
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_index(&mut self, index: BufferIndex) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "buffer index is 0 or 1"
        )]
        self.write_u8(index.get() as u8);
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Reset => 0,
            PhaseKind::Drain => 1,
            PhaseKind::Update => 2,
            PhaseKind::Build => 3,
            PhaseKind::Flip => 4,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.header(TAG_FRAME_BEGIN, e.frame_index);
        self.write_index(e.update_index);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.header(TAG_PHASE_BEGIN, e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.header(TAG_PHASE_END, e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_drain(&mut self, e: &DrainEvent) {
        self.header(TAG_DRAIN, e.frame_index);
        self.write_count(e.applied);
        self.write_count(e.dangling);
        self.write_count(e.rejected);
    }

    fn on_build(&mut self, e: &BuildEvent) {
        self.header(TAG_BUILD, e.frame_index);
        self.write_count(e.instructions);
        self.write_count(e.transparent);
        self.write_count(e.culled);
        self.write_count(e.invisible);
    }

    fn on_flip(&mut self, e: &FlipEvent) {
        self.header(TAG_FLIP, e.frame_index);
        self.write_index(e.stable_index);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.header(TAG_FRAME_SUMMARY, s.frame_index);
        self.write_index(s.stable_index);
        self.write_count(s.resets);
        self.write_count(s.applied);
        self.write_count(s.dangling);
        self.write_count(s.rejected);
        self.write_count(s.transforms);
        self.write_count(s.opacities);
        self.write_count(s.degenerate);
        self.write_count(s.instructions);
        self.write_count(s.resync);
        self.write_bool(s.keep_rendering);
    }

    fn on_object_changes(&mut self, frame_index: u64, changes: &[ObjectChange]) {
        let removed = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Removed)
            .count();
        self.header(TAG_OBJECT_CHANGES, frame_index);
        self.write_count(changes.len() - removed);
        self.write_count(removed);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`DrainEvent`].
    Drain(DrainEvent),
    /// A [`BuildEvent`].
    Build(BuildEvent),
    /// A [`FlipEvent`].
    Flip(FlipEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// Object-change counts for a frame.
    ObjectChanges {
        /// Frame counter.
        frame_index: u64,
        /// Objects resynced.
        resynced: usize,
        /// Objects removed.
        removed: usize,
    },
}

impl RecordedEvent {
    /// Returns the frame this event belongs to.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        match self {
            Self::FrameBegin(e) => e.frame_index,
            Self::PhaseBegin(e) => e.frame_index,
            Self::PhaseEnd(e) => e.frame_index,
            Self::Drain(e) => e.frame_index,
            Self::Build(e) => e.frame_index,
            Self::Flip(e) => e.frame_index,
            Self::FrameSummary(s) => s.frame_index,
            Self::ObjectChanges { frame_index, .. } => *frame_index,
        }
    }
}

/// A recorded event with its receipt time.
#[derive(Clone, Debug)]
pub struct Record {
    /// Nanoseconds between recorder creation and receipt.
    pub nanos: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
///
/// Stops at the first unknown tag or truncated record.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_count(&mut self) -> Option<usize> {
        usize::try_from(self.read_u32()?).ok()
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_index(&mut self) -> Option<BufferIndex> {
        Some(match self.read_u8()? {
            0 => BufferIndex::ZERO,
            _ => BufferIndex::ONE,
        })
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_event(&mut self, tag: u8, frame_index: u64) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_FRAME_BEGIN => RecordedEvent::FrameBegin(FrameBeginEvent {
                frame_index,
                update_index: self.read_index()?,
            }),
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin(PhaseBeginEvent {
                frame_index,
                phase: self.read_phase()?,
            }),
            TAG_PHASE_END => RecordedEvent::PhaseEnd(PhaseEndEvent {
                frame_index,
                phase: self.read_phase()?,
            }),
            TAG_DRAIN => RecordedEvent::Drain(DrainEvent {
                frame_index,
                applied: self.read_count()?,
                dangling: self.read_count()?,
                rejected: self.read_count()?,
            }),
            TAG_BUILD => RecordedEvent::Build(BuildEvent {
                frame_index,
                instructions: self.read_count()?,
                transparent: self.read_count()?,
                culled: self.read_count()?,
                invisible: self.read_count()?,
            }),
            TAG_FLIP => RecordedEvent::Flip(FlipEvent {
                frame_index,
                stable_index: self.read_index()?,
            }),
            TAG_FRAME_SUMMARY => RecordedEvent::FrameSummary(FrameSummary {
                frame_index,
                stable_index: self.read_index()?,
                resets: self.read_count()?,
                applied: self.read_count()?,
                dangling: self.read_count()?,
                rejected: self.read_count()?,
                transforms: self.read_count()?,
                opacities: self.read_count()?,
                degenerate: self.read_count()?,
                instructions: self.read_count()?,
                resync: self.read_count()?,
                keep_rendering: self.read_bool()?,
            }),
            TAG_OBJECT_CHANGES => RecordedEvent::ObjectChanges {
                frame_index,
                resynced: self.read_count()?,
                removed: self.read_count()?,
            },
            _ => return None,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let tag = self.read_u8()?;
        let nanos = self.read_u64()?;
        let frame_index = self.read_u64()?;
        let event = self.decode_event(tag, frame_index)?;
        Some(Record { nanos, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
