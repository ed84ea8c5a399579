// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-side contract.
//!
//! The core never talks to a graphics API. A render consumer receives each
//! built [`Frame`] read-only and turns its instructions into draw calls for
//! whatever backend it wraps. Resync records tell it which cached per-object
//! state to refresh first.
//!
//! # Crate boundaries
//!
//! `baton_core` owns the data model, evaluation, and instruction building.
//! Rendering crates depend on `baton_core` and implement [`RenderConsumer`].
//! Application code wires both together in a frame loop, on one thread or
//! across threads with `baton_pipeline`.

use crate::frame::Frame;

/// Consumes built frames on the render side.
///
/// # Frame loop pseudocode
///
/// A single-threaded frame loop wires the pieces together like this:
///
/// ```rust,ignore
/// fn on_frame(driver: &mut UpdateDriver, commands: &mut CommandBuffer) {
///     // Producers have filled `commands` since the last frame.
///     driver.update(commands, &mut Tracer::none());
///
///     // Render: the next update cannot start until this returns.
///     driver.present(&mut consumer);
/// }
/// ```
pub trait RenderConsumer {
    /// Draws `frame`.
    ///
    /// Frames are self-contained, so this may run on another thread while
    /// the update stage builds the next one.
    fn consume(&mut self, frame: &Frame);
}
