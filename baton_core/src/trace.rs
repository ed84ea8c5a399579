// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the update cycle.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`UpdateDriver`](crate::driver::UpdateDriver) calls at each stage. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Events carry no timestamps: the core has no clock. Sinks that want timing
//! stamp events on receipt.
//!
//! [`FrameSummaryBuilder`] collects the per-phase counters during a cycle and
//! produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`ObjectChange`] events and the
//!   corresponding `TraceSink` method.

use crate::buffer::BufferIndex;
use crate::command::DrainStats;
use crate::instruction::BuildStats;
use crate::node::EvaluateStats;

#[cfg(feature = "trace-rich")]
use crate::id::ObjectRef;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the update cycle is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Resetting pending properties to their base values.
    Reset,
    /// Draining and applying queued commands.
    Drain,
    /// Recomputing derived world state.
    Update,
    /// Building the instruction list and resync records.
    Build,
    /// Flipping the buffer index.
    Flip,
}

impl PhaseKind {
    /// Every phase, in cycle order.
    pub const ALL: [Self; 5] = [
        Self::Reset,
        Self::Drain,
        Self::Update,
        Self::Build,
        Self::Flip,
    ];

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Drain => "drain",
            Self::Update => "update",
            Self::Build => "build",
            Self::Flip => "flip",
        }
    }
}

/// What happened to an object in a frame.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Its current values were pushed to the render side.
    Resynced,
    /// It was destroyed.
    Removed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an update cycle starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// The buffer index being written this cycle.
    pub update_index: BufferIndex,
}

/// Marks the beginning of a cycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a cycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted after the command queue has been drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrainEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Commands that took effect.
    pub applied: usize,
    /// Commands whose target no longer existed.
    pub dangling: usize,
    /// Commands refused as invalid.
    pub rejected: usize,
}

impl DrainEvent {
    /// Creates a `DrainEvent` from drain counters.
    #[must_use]
    pub fn new(frame_index: u64, stats: &DrainStats) -> Self {
        Self {
            frame_index,
            applied: stats.applied,
            dangling: stats.dangling,
            rejected: stats.rejected,
        }
    }
}

/// Emitted after the instruction list has been built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Instructions emitted.
    pub instructions: usize,
    /// Drawables skipped as fully transparent.
    pub transparent: usize,
    /// Drawables skipped by viewport culling.
    pub culled: usize,
    /// Drawables skipped as invisible.
    pub invisible: usize,
}

impl BuildEvent {
    /// Creates a `BuildEvent` from build counters.
    #[must_use]
    pub fn new(frame_index: u64, stats: &BuildStats) -> Self {
        Self {
            frame_index,
            instructions: stats.instructions,
            transparent: stats.transparent,
            culled: stats.culled,
            invisible: stats.invisible,
        }
    }
}

/// Emitted when the buffer index flips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The index that just became stable.
    pub stable_index: BufferIndex,
}

/// Per-frame counter summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// The index that became stable at the end of the cycle.
    pub stable_index: BufferIndex,
    /// Objects whose update slot was reset to base.
    pub resets: usize,
    /// Commands applied.
    pub applied: usize,
    /// Commands skipped as dangling.
    pub dangling: usize,
    /// Commands rejected.
    pub rejected: usize,
    /// World transforms recomputed.
    pub transforms: usize,
    /// World opacities recomputed.
    pub opacities: usize,
    /// Degenerate values replaced.
    pub degenerate: usize,
    /// Instructions emitted.
    pub instructions: usize,
    /// Resync records emitted.
    pub resync: usize,
    /// Whether a drawable asked for continuous rendering.
    pub keep_rendering: bool,
}

/// A per-frame object change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectChange {
    /// The object.
    pub object: ObjectRef,
    /// What happened to it.
    pub kind: ChangeKind,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the update cycle.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update cycle starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a cycle phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a cycle phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after the command drain.
    fn on_drain(&mut self, e: &DrainEvent) {
        _ = e;
    }

    /// Called after the instruction list build.
    fn on_build(&mut self, e: &BuildEvent) {
        _ = e;
    }

    /// Called when the buffer index flips.
    fn on_flip(&mut self, e: &FlipEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with per-frame object changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_object_changes(&mut self, frame_index: u64, changes: &[ObjectChange]) {
        _ = (frame_index, changes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DrainEvent`].
    #[inline]
    pub fn drain(&mut self, e: &DrainEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_drain(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BuildEvent`].
    #[inline]
    pub fn build(&mut self, e: &BuildEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_build(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FlipEvent`].
    #[inline]
    pub fn flip(&mut self, e: &FlipEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_flip(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits object changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn object_changes(&mut self, frame_index: u64, changes: &[ObjectChange]) {
        if let Some(s) = &mut self.sink {
            s.on_object_changes(frame_index, changes);
        }
    }

    /// Returns whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects per-phase counters during a cycle and produces a [`FrameSummary`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    resets: usize,
    drain: DrainStats,
    evaluate: EvaluateStats,
    build: BuildStats,
    resync: usize,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            resets: 0,
            drain: DrainStats::default(),
            evaluate: EvaluateStats::default(),
            build: BuildStats::default(),
            resync: 0,
        }
    }

    /// Records the reset count.
    pub fn resets(&mut self, resets: usize) {
        self.resets = resets;
    }

    /// Records the drain counters.
    pub fn drain(&mut self, stats: &DrainStats) {
        self.drain = *stats;
    }

    /// Records the evaluation counters.
    pub fn evaluate(&mut self, stats: &EvaluateStats) {
        self.evaluate = *stats;
    }

    /// Records the build counters.
    pub fn build(&mut self, stats: &BuildStats) {
        self.build = *stats;
    }

    /// Records the number of resync records.
    pub fn resync(&mut self, count: usize) {
        self.resync = count;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self, stable_index: BufferIndex) -> FrameSummary {
        FrameSummary {
            frame_index: self.frame_index,
            stable_index,
            resets: self.resets,
            applied: self.drain.applied,
            dangling: self.drain.dangling,
            rejected: self.drain.rejected,
            transforms: self.evaluate.transforms,
            opacities: self.evaluate.opacities,
            degenerate: self.evaluate.degenerate,
            instructions: self.build.instructions,
            resync: self.resync,
            keep_rendering: self.build.keep_rendering,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
