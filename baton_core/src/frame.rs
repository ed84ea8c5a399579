// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The self-contained output of one update cycle.

use alloc::vec::Vec;

use crate::buffer::BufferIndex;
use crate::command::DrainStats;
use crate::id::ObjectRef;
use crate::instruction::{BuildStats, InstructionList};
use crate::node::{EvaluateStats, NodeSnapshot};
use crate::renderer::RendererSnapshot;
use crate::resource::ResourceSnapshot;

/// One object's current values, pushed to the render side after a change.
///
/// Each change is pushed once per buffer index: once in the frame where it
/// happened and once in the following frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resync {
    /// A node's local and world values.
    Node(NodeSnapshot),
    /// A renderer's values.
    Renderer(RendererSnapshot),
    /// A resource's description.
    Resource(ResourceSnapshot),
    /// The object was destroyed.
    Removed(ObjectRef),
}

impl Resync {
    /// Returns the object this record describes.
    #[must_use]
    pub fn object(&self) -> ObjectRef {
        match self {
            Self::Node(n) => n.id.into(),
            Self::Renderer(r) => r.id.into(),
            Self::Resource(r) => r.id.into(),
            Self::Removed(object) => *object,
        }
    }
}

/// A frame produced by the update stage.
///
/// Everything the render side needs is copied in, so a frame can be read
/// while the update stage already works on the other buffer index. Storage
/// is reused from frame to frame.
#[derive(Debug, Default)]
pub struct Frame {
    pub(crate) frame_index: u64,
    pub(crate) buffer_index: BufferIndex,
    pub(crate) instructions: InstructionList,
    pub(crate) resync: Vec<Resync>,
    pub(crate) drain: DrainStats,
    pub(crate) evaluate: EvaluateStats,
    pub(crate) build: BuildStats,
}

impl Frame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of update cycles completed before this one.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns the buffer index this frame was built into.
    ///
    /// After the flip this is the stable index.
    #[must_use]
    pub fn buffer_index(&self) -> BufferIndex {
        self.buffer_index
    }

    /// Returns the ordered draw instructions.
    #[must_use]
    pub fn instructions(&self) -> &InstructionList {
        &self.instructions
    }

    /// Returns the resync records for objects that changed.
    #[must_use]
    pub fn resync(&self) -> &[Resync] {
        &self.resync
    }

    /// Returns the drain counters.
    #[must_use]
    pub fn drain_stats(&self) -> DrainStats {
        self.drain
    }

    /// Returns the evaluation counters.
    #[must_use]
    pub fn evaluate_stats(&self) -> EvaluateStats {
        self.evaluate
    }

    /// Returns the instruction build counters.
    #[must_use]
    pub fn build_stats(&self) -> BuildStats {
        self.build
    }

    /// Returns whether some drawable asked to be rendered continuously.
    #[must_use]
    pub fn keep_rendering(&self) -> bool {
        self.build.keep_rendering
    }

    /// Clears per-frame contents, keeping capacity.
    pub(crate) fn clear(&mut self) {
        self.resync.clear();
        self.drain = DrainStats::default();
        self.evaluate = EvaluateStats::default();
        self.build = BuildStats::default();
    }
}
