// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producer-side handle reservation.
//!
//! Handles are handed out by the producer *before* the corresponding create
//! command has been drained, so a producer can build a subtree and address it
//! in the same batch of commands. The [`Registry`] owns one generation array
//! per object kind; the scene keeps its own copy and learns about new
//! generations from the create commands.
//!
//! Releasing a handle bumps the generation immediately. Because commands are
//! applied in enqueue order, a destroy for the old generation always drains
//! before any create that reuses the slot.

use alloc::vec::Vec;

use crate::id::{INVALID, NodeId, RendererId, ResourceId};

/// Generational slot allocator with a free list.
#[derive(Clone, Debug, Default)]
pub struct SlotAllocator {
    generation: Vec<u32>,
    live: Vec<bool>,
    free_list: Vec<u32>,
}

impl SlotAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Reserves a slot and returns `(index, generation)`.
    pub fn reserve(&mut self) -> (u32, u32) {
        if let Some(idx) = self.free_list.pop() {
            self.live[idx as usize] = true;
            (idx, self.generation[idx as usize])
        } else {
            let idx = u32::try_from(self.generation.len()).unwrap_or(INVALID);
            assert!(idx != INVALID, "slot allocator exhausted");
            self.generation.push(0);
            self.live.push(true);
            (idx, 0)
        }
    }

    /// Releases a live slot, bumping its generation.
    ///
    /// Returns `false` if `(idx, generation)` does not name a live slot.
    pub fn release(&mut self, idx: u32, generation: u32) -> bool {
        if !self.is_live(idx, generation) {
            return false;
        }
        let i = idx as usize;
        self.live[i] = false;
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(idx);
        true
    }

    /// Returns whether `(idx, generation)` names a live slot.
    #[must_use]
    pub fn is_live(&self, idx: u32, generation: u32) -> bool {
        let i = idx as usize;
        i < self.generation.len() && self.live[i] && self.generation[i] == generation
    }

    /// Returns the number of live slots.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.generation.len() - self.free_list.len()
    }
}

/// Handle reservation for every object kind.
///
/// [`Registry::new`] reserves the scene root, which can never be released.
#[derive(Clone, Debug)]
pub struct Registry {
    nodes: SlotAllocator,
    renderers: SlotAllocator,
    resources: SlotAllocator,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry with the root node reserved.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotAllocator::new();
        let (idx, generation) = nodes.reserve();
        debug_assert!(
            idx == NodeId::ROOT.idx && generation == NodeId::ROOT.generation,
            "root must occupy slot 0"
        );
        Self {
            nodes,
            renderers: SlotAllocator::new(),
            resources: SlotAllocator::new(),
        }
    }

    /// Reserves a node handle.
    pub fn reserve_node(&mut self) -> NodeId {
        let (idx, generation) = self.nodes.reserve();
        NodeId::new(idx, generation)
    }

    /// Releases a node handle. The root cannot be released.
    pub fn release_node(&mut self, id: NodeId) -> bool {
        id != NodeId::ROOT && self.nodes.release(id.idx, id.generation)
    }

    /// Returns whether the node handle is still reserved.
    #[must_use]
    pub fn is_node_live(&self, id: NodeId) -> bool {
        self.nodes.is_live(id.idx, id.generation)
    }

    /// Reserves a renderer handle.
    pub fn reserve_renderer(&mut self) -> RendererId {
        let (idx, generation) = self.renderers.reserve();
        RendererId::new(idx, generation)
    }

    /// Releases a renderer handle.
    pub fn release_renderer(&mut self, id: RendererId) -> bool {
        self.renderers.release(id.idx, id.generation)
    }

    /// Returns whether the renderer handle is still reserved.
    #[must_use]
    pub fn is_renderer_live(&self, id: RendererId) -> bool {
        self.renderers.is_live(id.idx, id.generation)
    }

    /// Reserves a resource handle.
    pub fn reserve_resource(&mut self) -> ResourceId {
        let (idx, generation) = self.resources.reserve();
        ResourceId::new(idx, generation)
    }

    /// Releases a resource handle.
    pub fn release_resource(&mut self, id: ResourceId) -> bool {
        self.resources.release(id.idx, id.generation)
    }

    /// Returns whether the resource handle is still reserved.
    #[must_use]
    pub fn is_resource_live(&self, id: ResourceId) -> bool {
        self.resources.is_live(id.idx, id.generation)
    }

    /// Returns the number of reserved node handles, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.live_count()
    }
}
