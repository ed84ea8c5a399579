// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, Chrome trace export, and scene dumps for
//! baton diagnostics.
//!
//! This crate provides [`TraceSink`](baton_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`] — writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`tree::write_tree`] — indented dump of the node tree at one buffer
//!   index.
//!
//! Core events carry no timestamps; every sink here stamps events on receipt
//! relative to its own creation.

pub mod chrome;
pub mod pretty;
pub mod recorder;
pub mod tree;

use std::time::Instant;

/// Nanoseconds elapsed since `start`, saturating at `u64::MAX`.
fn nanos_since(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}
