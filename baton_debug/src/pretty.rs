// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Each line is
//! stamped with the microseconds elapsed since the sink was created.

use std::io::Write;
use std::time::Instant;

use baton_core::trace::{
    BuildEvent, ChangeKind, DrainEvent, FlipEvent, FrameBeginEvent, FrameSummary, ObjectChange,
    PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    start: Instant,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            start: Instant::now(),
        }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn us(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1_000_000.0
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let at = self.us();
        let _ = writeln!(
            self.writer,
            "[frame] frame={} update={} at {at:.1}µs",
            e.frame_index,
            e.update_index.get(),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let at = self.us();
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {at:.1}µs",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let at = self.us();
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {at:.1}µs",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_drain(&mut self, e: &DrainEvent) {
        let _ = writeln!(
            self.writer,
            "[drain] frame={} applied={} dangling={} rejected={}",
            e.frame_index, e.applied, e.dangling, e.rejected,
        );
    }

    fn on_build(&mut self, e: &BuildEvent) {
        let _ = writeln!(
            self.writer,
            "[build] frame={} instructions={} transparent={} culled={} invisible={}",
            e.frame_index, e.instructions, e.transparent, e.culled, e.invisible,
        );
    }

    fn on_flip(&mut self, e: &FlipEvent) {
        let at = self.us();
        let _ = writeln!(
            self.writer,
            "[flip] frame={} stable={} at {at:.1}µs",
            e.frame_index,
            e.stable_index.get(),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let keep = if s.keep_rendering { " keep-rendering" } else { "" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} stable={} resets={} commands={}/{}/{} \
             transforms={} opacities={} degenerate={} instructions={} resync={}{keep}",
            s.frame_index,
            s.stable_index.get(),
            s.resets,
            s.applied,
            s.dangling,
            s.rejected,
            s.transforms,
            s.opacities,
            s.degenerate,
            s.instructions,
            s.resync,
        );
    }

    fn on_object_changes(&mut self, frame_index: u64, changes: &[ObjectChange]) {
        let removed = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Removed)
            .count();
        let _ = writeln!(
            self.writer,
            "[objects] frame={frame_index} resynced={} removed={removed}",
            changes.len() - removed,
        );
    }
}
