// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update-stage configuration.

use kurbo::Rect;

use crate::command::CommandBuffer;

/// Configuration for the [`UpdateDriver`](crate::driver::UpdateDriver).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateConfig {
    /// Viewport used for culling, in world coordinates.
    ///
    /// When `None`, nothing is culled.
    pub viewport: Option<Rect>,
    /// Initial instruction list capacity.
    pub instruction_capacity: usize,
    /// Initial command buffer capacity.
    pub command_capacity: usize,
    /// Soft limit on queued commands, asserted in debug builds.
    pub command_limit: Option<usize>,
}

impl UpdateConfig {
    /// Default configuration: no culling, modest initial capacities.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            viewport: None,
            instruction_capacity: 64,
            command_capacity: 256,
            command_limit: None,
        }
    }

    /// Returns this configuration with viewport culling against `viewport`.
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Creates a command buffer with the configured capacity and limit.
    #[must_use]
    pub fn command_buffer(&self) -> CommandBuffer {
        CommandBuffer::with_capacity(self.command_capacity).with_limit(self.command_limit)
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self::new()
    }
}
