// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-frame-deep handoff between the updater and the render side.

use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use baton_core::consumer::RenderConsumer;
use baton_core::frame::Frame;

use crate::{Closed, lock};

#[derive(Debug, Default)]
struct Slots {
    /// Built and not yet acquired.
    ready: Option<Frame>,
    /// Released by the render side, waiting for reuse.
    spare: Option<Frame>,
    closed: bool,
}

/// Shared between [`Updater`](crate::Updater) and [`RenderSide`].
#[derive(Debug, Default)]
pub(crate) struct Handoff {
    slots: Mutex<Slots>,
    changed: Condvar,
}

impl Handoff {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publishes `frame`, waiting while the previous one is unacquired.
    ///
    /// Returns a released frame for reuse, if any.
    pub(crate) fn publish(&self, frame: Frame) -> Result<Option<Frame>, Closed> {
        let slots = lock(&self.slots);
        let mut slots = self
            .changed
            .wait_while(slots, |s| !s.closed && s.ready.is_some())
            .unwrap_or_else(PoisonError::into_inner);
        if slots.closed {
            return Err(Closed);
        }
        slots.ready = Some(frame);
        let spare = slots.spare.take();
        drop(slots);
        self.changed.notify_all();
        Ok(spare)
    }

    fn take(&self) -> Result<Frame, Closed> {
        let slots = lock(&self.slots);
        let mut slots = self
            .changed
            .wait_while(slots, |s| !s.closed && s.ready.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        let frame = slots.ready.take().ok_or(Closed)?;
        drop(slots);
        self.changed.notify_all();
        Ok(frame)
    }

    fn try_take(&self) -> Result<Option<Frame>, Closed> {
        let mut slots = lock(&self.slots);
        match slots.ready.take() {
            Some(frame) => {
                drop(slots);
                self.changed.notify_all();
                Ok(Some(frame))
            }
            None if slots.closed => Err(Closed),
            None => Ok(None),
        }
    }

    fn release(&self, frame: Frame) {
        lock(&self.slots).spare = Some(frame);
    }

    pub(crate) fn close(&self) {
        lock(&self.slots).closed = true;
        self.changed.notify_all();
    }
}

/// The render end of a pipeline.
///
/// Dropping it closes the handoff.
#[derive(Debug)]
pub struct RenderSide {
    handoff: Arc<Handoff>,
}

impl RenderSide {
    pub(crate) fn new(handoff: Arc<Handoff>) -> Self {
        Self { handoff }
    }

    /// Waits for the next built frame.
    ///
    /// A frame published before the updater shut down is still returned;
    /// [`Closed`] follows once none is left.
    pub fn acquire(&self) -> Result<FrameGuard<'_>, Closed> {
        let frame = self.handoff.take()?;
        Ok(FrameGuard {
            handoff: &self.handoff,
            frame: Some(frame),
        })
    }

    /// Returns the next built frame if one is ready.
    pub fn try_acquire(&self) -> Result<Option<FrameGuard<'_>>, Closed> {
        Ok(self.handoff.try_take()?.map(|frame| FrameGuard {
            handoff: &self.handoff,
            frame: Some(frame),
        }))
    }

    /// Waits for the next frame and hands it to `consumer`.
    pub fn present(&self, consumer: &mut dyn RenderConsumer) -> Result<(), Closed> {
        let frame = self.acquire()?;
        consumer.consume(&frame);
        Ok(())
    }
}

impl Drop for RenderSide {
    fn drop(&mut self) {
        self.handoff.close();
    }
}

/// An acquired frame. Dropping the guard returns it for reuse.
#[derive(Debug)]
pub struct FrameGuard<'a> {
    handoff: &'a Handoff,
    frame: Option<Frame>,
}

impl Deref for FrameGuard<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        match &self.frame {
            Some(frame) => frame,
            None => unreachable!("frame taken before drop"),
        }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.handoff.release(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use baton_core::command::CommandBuffer;
    use baton_core::driver::UpdateDriver;
    use baton_core::trace::Tracer;

    use super::*;

    /// Built frames with indices `0..n`.
    fn frames(n: usize) -> Vec<Frame> {
        let mut driver = UpdateDriver::default();
        let mut commands = CommandBuffer::new();
        (0..n)
            .map(|_| {
                let _ = driver.update(&mut commands, &mut Tracer::none());
                driver.swap_frame(Frame::new())
            })
            .collect()
    }

    #[test]
    fn publish_then_acquire() {
        let handoff = Arc::new(Handoff::new());
        let render = RenderSide::new(Arc::clone(&handoff));
        assert!(render.try_acquire().unwrap().is_none());

        let mut built = frames(2).into_iter();
        assert!(handoff.publish(built.next().unwrap()).unwrap().is_none());
        let guard = render.acquire().unwrap();
        assert_eq!(guard.frame_index(), 0);
        drop(guard);

        let spare = handoff.publish(built.next().unwrap()).unwrap();
        assert_eq!(spare.map(|f| f.frame_index()), Some(0));
        assert_eq!(render.try_acquire().unwrap().unwrap().frame_index(), 1);
    }

    #[test]
    fn close_after_publish_still_delivers() {
        let handoff = Arc::new(Handoff::new());
        let render = RenderSide::new(Arc::clone(&handoff));
        for frame in frames(1) {
            handoff.publish(frame).unwrap();
        }
        handoff.close();
        assert_eq!(render.acquire().unwrap().frame_index(), 0);
        assert!(render.acquire().is_err());
    }

    #[test]
    fn dropped_render_side_closes() {
        let handoff = Arc::new(Handoff::new());
        drop(RenderSide::new(Arc::clone(&handoff)));
        assert!(matches!(handoff.publish(Frame::new()), Err(Closed)));
    }
}
