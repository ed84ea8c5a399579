// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-thread wiring for `baton_core`.
//!
//! [`pipeline`] splits one update stage into three roles:
//!
//! ```text
//!   Producer (clone per thread) ──► shared queue ──► Updater ──► handoff ──► RenderSide
//!        reserve + enqueue           one lock          drain,       one frame    acquire,
//!        under one lock                                build, flip  in flight    release
//! ```
//!
//! - [`Producer`]s reserve handles and enqueue commands under a single lock,
//!   so the queue order is the order producers observed.
//! - The [`Updater`] takes the whole queue in one swap, runs the cycle, and
//!   publishes the built [`Frame`](baton_core::frame::Frame).
//! - The [`RenderSide`] reads frame N while the updater builds frame N+1
//!   into the other buffer index. Released frames return to the updater and
//!   are reused, so the steady state does not allocate.
//!
//! Dropping the updater or the render side closes the handoff; the other
//! side then gets [`Closed`].

mod handoff;
mod producer;
mod updater;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use baton_core::config::UpdateConfig;

pub use handoff::{FrameGuard, RenderSide};
pub use producer::{Batch, Producer};
pub use updater::Updater;

/// Configuration for [`pipeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    /// Update-stage configuration.
    pub update: UpdateConfig,
}

impl PipelineConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            update: UpdateConfig::new(),
        }
    }

    /// Returns this configuration with `update` as the update-stage
    /// configuration.
    #[must_use]
    pub const fn with_update(mut self, update: UpdateConfig) -> Self {
        self.update = update;
        self
    }
}

/// The other side of the frame handoff has shut down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("frame handoff closed")
    }
}

impl std::error::Error for Closed {}

/// Creates the three ends of an update pipeline.
#[must_use]
pub fn pipeline(config: PipelineConfig) -> (Producer, Updater, RenderSide) {
    let queue = Arc::new(producer::Queue::new(&config.update));
    let handoff = Arc::new(handoff::Handoff::new());
    (
        Producer::new(Arc::clone(&queue)),
        Updater::new(config.update, queue, Arc::clone(&handoff)),
        RenderSide::new(handoff),
    )
}

/// Locks `mutex`, recovering the data if a holder panicked.
///
/// Every critical section leaves its state consistent before anything that
/// can panic, so the data behind a poisoned lock is still valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
