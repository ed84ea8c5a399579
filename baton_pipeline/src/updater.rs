// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The update end of a pipeline.

use std::sync::Arc;

use baton_core::command::CommandBuffer;
use baton_core::config::UpdateConfig;
use baton_core::driver::UpdateDriver;
use baton_core::frame::Frame;
use baton_core::trace::Tracer;

use crate::Closed;
use crate::handoff::Handoff;
use crate::producer::Queue;

/// Runs update cycles and publishes their frames.
///
/// Owns the scene; only the updater's thread reads or writes it. Dropping
/// the updater closes the handoff.
#[derive(Debug)]
pub struct Updater {
    driver: UpdateDriver,
    queue: Arc<Queue>,
    handoff: Arc<Handoff>,
    commands: CommandBuffer,
    spare: Option<Frame>,
}

impl Updater {
    pub(crate) fn new(config: UpdateConfig, queue: Arc<Queue>, handoff: Arc<Handoff>) -> Self {
        Self {
            driver: UpdateDriver::new(config),
            queue,
            handoff,
            commands: config.command_buffer(),
            spare: None,
        }
    }

    /// Returns the driver, for reads of the scene and the buffer indices.
    #[must_use]
    pub fn driver(&self) -> &UpdateDriver {
        &self.driver
    }

    /// Runs one cycle over everything enqueued so far and publishes the
    /// frame.
    ///
    /// Waits while the previous frame has not been acquired. Commands
    /// enqueued after the swap wait for the next cycle.
    pub fn update(&mut self, tracer: &mut Tracer<'_>) -> Result<(), Closed> {
        self.queue.swap(&mut self.commands);
        let _ = self.driver.update(&mut self.commands, tracer);
        let replacement = self.spare.take().unwrap_or_default();
        let frame = self.driver.swap_frame(replacement);
        self.spare = self.handoff.publish(frame)?;
        Ok(())
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        self.handoff.close();
    }
}
