// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with topology and buffered property management.

use alloc::vec::Vec;

use kurbo::{Affine, Rect};
use understory_dirty::{Channel, CycleHandling, DirtyTracker, EagerPolicy};

use super::traverse::Children;
use crate::buffer::{BufferIndex, DoubleBuffered, Property, ResendFlags};
use crate::command::{NodeValue, Rejection, WriteMode};
use crate::dirty;
use crate::id::{INVALID, NodeId, RendererId};

/// A copy of one node's values at a given buffer index.
///
/// Emitted in resync records and returned by [`NodeStore::snapshot`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeSnapshot {
    /// The node.
    pub id: NodeId,
    /// The parent, if attached.
    pub parent: Option<NodeId>,
    /// Local transform.
    pub transform: Affine,
    /// Local opacity.
    pub opacity: f32,
    /// Local visibility.
    pub visible: bool,
    /// Local depth offset.
    pub depth: f64,
    /// Local bounds used for viewport culling.
    pub bounds: Option<Rect>,
    /// World transform.
    pub world_transform: Affine,
    /// World opacity.
    pub world_opacity: f32,
    /// World visibility.
    pub world_visible: bool,
    /// World depth.
    pub world_depth: f64,
}

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles reserved on the producer side.
/// Slot 0 is the root, created with the store and never destroyed.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties (written by commands) --
    pub(crate) transform: Vec<Property<Affine>>,
    pub(crate) opacity: Vec<Property<f32>>,
    pub(crate) visible: Vec<Property<bool>>,
    pub(crate) depth: Vec<Property<f64>>,
    pub(crate) bounds: Vec<Property<Option<Rect>>>,
    pub(crate) renderers: Vec<Vec<RendererId>>,

    // -- World properties (written by evaluate) --
    pub(crate) world_transform: Vec<DoubleBuffered<Affine>>,
    pub(crate) world_opacity: Vec<DoubleBuffered<f32>>,
    pub(crate) world_visible: Vec<DoubleBuffered<bool>>,
    pub(crate) world_depth: Vec<DoubleBuffered<f64>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,

    // -- Render-side resync --
    pub(crate) resend: Vec<ResendFlags>,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    /// Marks raised by commands this frame, replayed next frame.
    carry: Vec<(u32, u32, Channel)>,
    replay: Vec<(u32, u32, Channel)>,

    // -- Reset tracking --
    pending_reset: Vec<u32>,
    in_reset: Vec<bool>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates a store containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut store = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            transform: Vec::new(),
            opacity: Vec::new(),
            visible: Vec::new(),
            depth: Vec::new(),
            bounds: Vec::new(),
            renderers: Vec::new(),
            world_transform: Vec::new(),
            world_opacity: Vec::new(),
            world_visible: Vec::new(),
            world_depth: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            resend: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            carry: Vec::new(),
            replay: Vec::new(),
            pending_reset: Vec::new(),
            in_reset: Vec::new(),
            traversal_order: Vec::new(),
            traversal_dirty: true,
        };
        store.ensure_slot(NodeId::ROOT.idx);
        store.alive[0] = true;
        store.resend[0].mark();
        store
    }

    /// Returns the number of slots (live or free).
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot indices originate from u32 handles"
        )]
        let len = self.alive.len() as u32;
        len
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.is_live_raw(id.idx, id.generation)
    }

    // -- Topology queries --

    /// Returns the parent of a node, if attached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.handle_at(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the renderers attached to a node, in attachment order.
    #[must_use]
    pub fn renderers(&self, id: NodeId) -> &[RendererId] {
        self.validate(id);
        &self.renderers[id.idx as usize]
    }

    /// Returns whether `id` is connected to the root.
    #[must_use]
    pub fn is_on_stage(&self, id: NodeId) -> bool {
        self.validate(id);
        let mut idx = id.idx;
        while idx != INVALID {
            if idx == NodeId::ROOT.idx {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }

    // -- Property getters (read-only) --

    /// Returns the local transform at `index`.
    #[must_use]
    pub fn transform(&self, id: NodeId, index: BufferIndex) -> Affine {
        self.validate(id);
        self.transform[id.idx as usize].get(index)
    }

    /// Returns the local opacity at `index`.
    #[must_use]
    pub fn opacity(&self, id: NodeId, index: BufferIndex) -> f32 {
        self.validate(id);
        self.opacity[id.idx as usize].get(index)
    }

    /// Returns the local visibility at `index`.
    #[must_use]
    pub fn is_visible(&self, id: NodeId, index: BufferIndex) -> bool {
        self.validate(id);
        self.visible[id.idx as usize].get(index)
    }

    /// Returns the local depth offset at `index`.
    #[must_use]
    pub fn depth(&self, id: NodeId, index: BufferIndex) -> f64 {
        self.validate(id);
        self.depth[id.idx as usize].get(index)
    }

    /// Returns the local bounds at `index`.
    #[must_use]
    pub fn bounds(&self, id: NodeId, index: BufferIndex) -> Option<Rect> {
        self.validate(id);
        self.bounds[id.idx as usize].get(index)
    }

    /// Returns the world transform at `index`.
    ///
    /// Only valid for an index that has been through an update.
    #[must_use]
    pub fn world_transform(&self, id: NodeId, index: BufferIndex) -> Affine {
        self.validate(id);
        self.world_transform[id.idx as usize].get(index)
    }

    /// Returns the world opacity at `index`.
    #[must_use]
    pub fn world_opacity(&self, id: NodeId, index: BufferIndex) -> f32 {
        self.validate(id);
        self.world_opacity[id.idx as usize].get(index)
    }

    /// Returns the world visibility at `index`.
    #[must_use]
    pub fn world_visible(&self, id: NodeId, index: BufferIndex) -> bool {
        self.validate(id);
        self.world_visible[id.idx as usize].get(index)
    }

    /// Returns the world depth at `index`.
    #[must_use]
    pub fn world_depth(&self, id: NodeId, index: BufferIndex) -> f64 {
        self.validate(id);
        self.world_depth[id.idx as usize].get(index)
    }

    /// Returns a copy of every value of a live node at `index`, or `None` for
    /// a stale handle.
    #[must_use]
    pub fn snapshot(&self, id: NodeId, index: BufferIndex) -> Option<NodeSnapshot> {
        if !self.is_alive(id) {
            return None;
        }
        let i = id.idx as usize;
        Some(NodeSnapshot {
            id,
            parent: self.handle_at(self.parent[i]),
            transform: self.transform[i].get(index),
            opacity: self.opacity[i].get(index),
            visible: self.visible[i].get(index),
            depth: self.depth[i].get(index),
            bounds: self.bounds[i].get(index),
            world_transform: self.world_transform[i].get(index),
            world_opacity: self.world_opacity[i].get(index),
            world_visible: self.world_visible[i].get(index),
            world_depth: self.world_depth[i].get(index),
        })
    }

    // -- Lifecycle (driven by `Scene::apply`) --

    /// Brings `id` to life in its reserved slot.
    pub(crate) fn create(&mut self, id: NodeId) -> Result<(), Rejection> {
        self.ensure_slot(id.idx);
        let i = id.idx as usize;
        if self.alive[i] {
            return Err(Rejection::AlreadyExists);
        }
        self.generation[i] = id.generation;
        self.alive[i] = true;
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.transform[i].reinit(Affine::IDENTITY);
        self.opacity[i].reinit(1.0);
        self.visible[i].reinit(true);
        self.depth[i].reinit(0.0);
        self.bounds[i].reinit(None);
        self.renderers[i].clear();
        self.world_transform[i].fill(Affine::IDENTITY);
        self.world_opacity[i].fill(1.0);
        self.world_visible[i].fill(true);
        self.world_depth[i].fill(0.0);
        self.resend[i].mark();
        self.dirty.mark(id.idx, dirty::TOPOLOGY);
        self.traversal_dirty = true;
        Ok(())
    }

    /// Destroys a node. Children are detached and stay alive.
    pub(crate) fn destroy(&mut self, id: NodeId) -> Result<(), Rejection> {
        if id == NodeId::ROOT {
            return Err(Rejection::RootImmutable);
        }
        let idx = id.idx;

        while self.first_child[idx as usize] != INVALID {
            let child = self.first_child[idx as usize];
            self.unlink(child);
            self.mark_subtree_inherited(child);
            self.resend[child as usize].mark();
        }
        if self.parent[idx as usize] != INVALID {
            self.unlink(idx);
        }

        self.dirty.remove_key(idx);
        let i = idx as usize;
        self.alive[i] = false;
        self.renderers[i].clear();
        self.resend[i].clear();
        self.traversal_dirty = true;
        Ok(())
    }

    // -- Topology mutation --

    /// Attaches `child` as the last child of `parent`, detaching it from its
    /// current parent first.
    pub(crate) fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), Rejection> {
        if child == NodeId::ROOT {
            return Err(Rejection::RootImmutable);
        }
        if !self.is_alive(parent) {
            return Err(Rejection::DeadReference);
        }
        if self.is_ancestor_or_self(child.idx, parent.idx) {
            return Err(Rejection::Cycle);
        }

        let c = child.idx;
        let p = parent.idx;
        if self.parent[c as usize] != INVALID {
            self.unlink(c);
        }

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;
        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // Child depends on parent for every inherited channel.
        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited(c);
        self.resend[c as usize].mark();
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
        Ok(())
    }

    /// Detaches `child` from its parent. Detaching an unattached node is a
    /// no-op.
    pub(crate) fn detach(&mut self, child: NodeId) -> Result<(), Rejection> {
        if child == NodeId::ROOT {
            return Err(Rejection::RootImmutable);
        }
        let c = child.idx;
        if self.parent[c as usize] == INVALID {
            return Ok(());
        }
        self.unlink(c);
        self.mark_subtree_inherited(c);
        self.resend[c as usize].mark();
        Ok(())
    }

    // -- Property mutation --

    /// Writes one local property and marks the channels it feeds.
    pub(crate) fn write(
        &mut self,
        id: NodeId,
        update: BufferIndex,
        value: NodeValue,
        mode: WriteMode,
    ) {
        let i = id.idx as usize;
        match value {
            NodeValue::Transform(t) => {
                mode.write(&mut self.transform[i], update, t);
                self.mark_inherited(id.idx, dirty::TRANSFORM);
            }
            NodeValue::Opacity(o) => {
                mode.write(&mut self.opacity[i], update, o);
                self.mark_inherited(id.idx, dirty::OPACITY);
            }
            NodeValue::Visible(v) => {
                mode.write(&mut self.visible[i], update, v);
                self.mark_inherited(id.idx, dirty::TRANSFORM);
            }
            NodeValue::Depth(d) => {
                mode.write(&mut self.depth[i], update, d);
                self.mark_inherited(id.idx, dirty::TRANSFORM);
            }
            NodeValue::Bounds(b) => {
                mode.write(&mut self.bounds[i], update, b);
            }
        }
        if !self.in_reset[i] {
            self.in_reset[i] = true;
            self.pending_reset.push(id.idx);
        }
        self.resend[i].mark();
    }

    /// Adds a renderer to a node's list.
    pub(crate) fn add_renderer(&mut self, id: NodeId, renderer: RendererId) -> Result<(), Rejection> {
        let list = &mut self.renderers[id.idx as usize];
        if list.contains(&renderer) {
            return Err(Rejection::AlreadyExists);
        }
        list.push(renderer);
        self.resend[id.idx as usize].mark();
        Ok(())
    }

    /// Removes a renderer from a node's list. Returns whether it was present.
    pub(crate) fn remove_renderer(&mut self, id: NodeId, renderer: RendererId) -> bool {
        let list = &mut self.renderers[id.idx as usize];
        let Some(pos) = list.iter().position(|&r| r == renderer) else {
            return false;
        };
        list.remove(pos);
        self.resend[id.idx as usize].mark();
        true
    }

    /// Removes a destroyed renderer from every node that references it.
    pub(crate) fn forget_renderer(&mut self, renderer: RendererId) {
        for (i, list) in self.renderers.iter_mut().enumerate() {
            if let Some(pos) = list.iter().position(|&r| r == renderer) {
                list.remove(pos);
                self.resend[i].mark();
            }
        }
    }

    // -- Frame start --

    /// Replays last frame's command marks and resets pending properties in
    /// the `update` slot to their base values.
    ///
    /// Returns the number of nodes whose update slot changed.
    pub(crate) fn begin_update(&mut self, update: BufferIndex) -> usize {
        core::mem::swap(&mut self.carry, &mut self.replay);
        for k in 0..self.replay.len() {
            let (idx, generation, channel) = self.replay[k];
            if self.is_live_raw(idx, generation) {
                self.dirty.mark_with(idx, channel, &EagerPolicy);
            }
        }
        self.replay.clear();

        let mut changed = 0;
        let mut pending = core::mem::take(&mut self.pending_reset);
        pending.retain(|&idx| {
            let i = idx as usize;
            if !self.alive[i] {
                self.in_reset[i] = false;
                return false;
            }
            let transform = self.transform[i].reset_to_base(update);
            let opacity = self.opacity[i].reset_to_base(update);
            let visible = self.visible[i].reset_to_base(update);
            let depth = self.depth[i].reset_to_base(update);
            let bounds = self.bounds[i].reset_to_base(update);

            if transform || visible || depth {
                self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
            }
            if opacity {
                self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
            }
            if transform || opacity || visible || depth || bounds {
                self.resend[i].mark_index(update);
                changed += 1;
            }

            let keep = !(self.transform[i].is_clean()
                && self.opacity[i].is_clean()
                && self.visible[i].is_clean()
                && self.depth[i].is_clean()
                && self.bounds[i].is_clean());
            self.in_reset[i] = keep;
            keep
        });
        self.pending_reset = pending;
        changed
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            self.generation
                .get(id.idx as usize)
                .copied()
                .unwrap_or(u32::MAX)
        );
    }

    pub(crate) fn is_live_raw(&self, idx: u32, generation: u32) -> bool {
        let i = idx as usize;
        i < self.alive.len() && self.alive[i] && self.generation[i] == generation
    }

    /// Builds a handle for a raw index, or `None` for [`INVALID`].
    pub(crate) fn handle_at(&self, idx: u32) -> Option<NodeId> {
        (idx != INVALID).then(|| NodeId::new(idx, self.generation[idx as usize]))
    }

    /// Grows every array so that `idx` is a valid slot.
    fn ensure_slot(&mut self, idx: u32) {
        let needed = idx as usize + 1;
        if self.alive.len() >= needed {
            return;
        }
        self.parent.resize(needed, INVALID);
        self.first_child.resize(needed, INVALID);
        self.next_sibling.resize(needed, INVALID);
        self.prev_sibling.resize(needed, INVALID);
        self.transform.resize(needed, Property::new(Affine::IDENTITY));
        self.opacity.resize(needed, Property::new(1.0));
        self.visible.resize(needed, Property::new(true));
        self.depth.resize(needed, Property::new(0.0));
        self.bounds.resize(needed, Property::new(None));
        self.renderers.resize_with(needed, Vec::new);
        self.world_transform
            .resize(needed, DoubleBuffered::new(Affine::IDENTITY));
        self.world_opacity.resize(needed, DoubleBuffered::new(1.0));
        self.world_visible.resize(needed, DoubleBuffered::new(true));
        self.world_depth.resize(needed, DoubleBuffered::new(0.0));
        self.generation.resize(needed, 0);
        self.alive.resize(needed, false);
        self.resend.resize(needed, ResendFlags::CLEAN);
        self.in_reset.resize(needed, false);
    }

    /// Returns whether `ancestor` is `idx` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: u32, mut idx: u32) -> bool {
        while idx != INVALID {
            if idx == ancestor {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }

    /// Removes `idx` from its parent's child list and drops its dependency
    /// edges.
    fn unlink(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;

        self.dirty.remove_dependency(idx, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(idx, p, dirty::OPACITY);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Marks `idx` and its subtree on `channel` and records the mark for
    /// replay on the next frame.
    fn mark_inherited(&mut self, idx: u32, channel: Channel) {
        self.dirty.mark_with(idx, channel, &EagerPolicy);
        self.carry
            .push((idx, self.generation[idx as usize], channel));
    }

    /// Marks the subtree rooted at `idx` dirty for every inherited channel.
    fn mark_subtree_inherited(&mut self, idx: u32) {
        self.mark_inherited(idx, dirty::TRANSFORM);
        self.mark_inherited(idx, dirty::OPACITY);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    const U: BufferIndex = BufferIndex::ZERO;

    fn store_with(n: u32) -> (NodeStore, Vec<NodeId>) {
        let mut store = NodeStore::new();
        let ids: Vec<_> = (1..=n).map(|i| NodeId::new(i, 0)).collect();
        for &id in &ids {
            store.create(id).unwrap();
        }
        (store, ids)
    }

    #[test]
    fn root_is_alive_and_parentless() {
        let store = NodeStore::new();
        assert!(store.is_alive(NodeId::ROOT));
        assert_eq!(store.parent(NodeId::ROOT), None);
        assert!(store.is_on_stage(NodeId::ROOT));
    }

    #[test]
    fn create_in_gapped_slot() {
        let mut store = NodeStore::new();
        let far = NodeId::new(5, 2);
        store.create(far).unwrap();
        assert!(store.is_alive(far));
        assert!(!store.is_alive(NodeId::new(3, 0)));
        assert_eq!(store.slot_count(), 6);
    }

    #[test]
    fn create_twice_is_rejected() {
        let (mut store, ids) = store_with(1);
        assert_eq!(store.create(ids[0]), Err(Rejection::AlreadyExists));
    }

    #[test]
    fn attach_and_query_children() {
        let (mut store, ids) = store_with(2);
        store.attach(ids[0], NodeId::ROOT).unwrap();
        store.attach(ids[1], NodeId::ROOT).unwrap();

        let kids: Vec<_> = store.children(NodeId::ROOT).collect();
        assert_eq!(kids, vec![ids[0], ids[1]]);
        assert_eq!(store.parent(ids[1]), Some(NodeId::ROOT));
        assert!(store.is_on_stage(ids[1]));
    }

    #[test]
    fn attach_reparents() {
        let (mut store, ids) = store_with(3);
        let [a, b, c] = [ids[0], ids[1], ids[2]];
        store.attach(a, NodeId::ROOT).unwrap();
        store.attach(b, NodeId::ROOT).unwrap();
        store.attach(c, a).unwrap();

        store.attach(c, b).unwrap();
        assert_eq!(store.parent(c), Some(b));
        assert!(store.children(a).next().is_none());
    }

    #[test]
    fn attach_rejects_cycles() {
        let (mut store, ids) = store_with(2);
        let [a, b] = [ids[0], ids[1]];
        store.attach(b, a).unwrap();
        assert_eq!(store.attach(a, b), Err(Rejection::Cycle));
        assert_eq!(store.attach(a, a), Err(Rejection::Cycle));
        assert_eq!(store.parent(a), None, "rejected attach leaves topology untouched");
    }

    #[test]
    fn root_is_immutable() {
        let (mut store, ids) = store_with(1);
        assert_eq!(
            store.attach(NodeId::ROOT, ids[0]),
            Err(Rejection::RootImmutable)
        );
        assert_eq!(store.detach(NodeId::ROOT), Err(Rejection::RootImmutable));
        assert_eq!(store.destroy(NodeId::ROOT), Err(Rejection::RootImmutable));
    }

    #[test]
    fn attach_to_dead_parent_is_rejected() {
        let (mut store, ids) = store_with(2);
        store.destroy(ids[1]).unwrap();
        assert_eq!(store.attach(ids[0], ids[1]), Err(Rejection::DeadReference));
    }

    #[test]
    fn detach_unattached_is_noop() {
        let (mut store, ids) = store_with(1);
        assert_eq!(store.detach(ids[0]), Ok(()));
    }

    #[test]
    fn destroy_detaches_children() {
        let (mut store, ids) = store_with(3);
        let [p, c1, c2] = [ids[0], ids[1], ids[2]];
        store.attach(p, NodeId::ROOT).unwrap();
        store.attach(c1, p).unwrap();
        store.attach(c2, p).unwrap();

        store.destroy(p).unwrap();
        assert!(!store.is_alive(p));
        assert!(store.is_alive(c1));
        assert_eq!(store.parent(c1), None);
        assert_eq!(store.parent(c2), None);
        assert!(store.children(NodeId::ROOT).next().is_none());
    }

    #[test]
    fn middle_sibling_unlink() {
        let (mut store, ids) = store_with(3);
        for &id in &ids {
            store.attach(id, NodeId::ROOT).unwrap();
        }
        store.detach(ids[1]).unwrap();
        let kids: Vec<_> = store.children(NodeId::ROOT).collect();
        assert_eq!(kids, vec![ids[0], ids[2]]);
    }

    #[test]
    fn bake_writes_update_slot_only() {
        let (mut store, ids) = store_with(1);
        store.write(ids[0], U, NodeValue::Opacity(0.5), WriteMode::Bake);
        assert_eq!(store.opacity(ids[0], U), 0.5);
        assert_eq!(store.opacity(ids[0], U.other()), 1.0);
    }

    #[test]
    fn begin_update_copies_baked_value_to_other_slot() {
        let (mut store, ids) = store_with(1);
        store.write(ids[0], U, NodeValue::Depth(3.0), WriteMode::Bake);
        let changed = store.begin_update(U.other());
        assert_eq!(changed, 1);
        assert_eq!(store.depth(ids[0], U.other()), 3.0);
        assert!(store.pending_reset.is_empty());
    }

    #[test]
    fn direct_write_reverts() {
        let (mut store, ids) = store_with(1);
        store.write(ids[0], U, NodeValue::Visible(false), WriteMode::Set);
        assert!(!store.is_visible(ids[0], U));

        let _ = store.begin_update(U.other());
        assert!(store.is_visible(ids[0], U.other()));
        let changed = store.begin_update(U);
        assert_eq!(changed, 1);
        assert!(store.is_visible(ids[0], U));
    }

    #[test]
    fn resend_marked_on_write() {
        let (mut store, ids) = store_with(1);
        let i = ids[0].idx as usize;
        store.resend[i].clear();
        store.write(ids[0], U, NodeValue::Transform(Affine::scale(2.0)), WriteMode::Bake);
        assert!(store.resend[i].is_set(U));
        assert!(store.resend[i].is_set(U.other()));
    }

    #[test]
    fn snapshot_of_stale_handle_is_none() {
        let (mut store, ids) = store_with(1);
        store.destroy(ids[0]).unwrap();
        assert!(store.snapshot(ids[0], U).is_none());
    }

    #[test]
    fn renderer_list_rejects_duplicates() {
        let (mut store, ids) = store_with(1);
        let r = RendererId::new(0, 0);
        store.add_renderer(ids[0], r).unwrap();
        assert_eq!(store.add_renderer(ids[0], r), Err(Rejection::AlreadyExists));
        assert!(store.remove_renderer(ids[0], r));
        assert!(!store.remove_renderer(ids[0], r));
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_getter() {
        let (mut store, ids) = store_with(1);
        store.destroy(ids[0]).unwrap();
        let _ = store.world_opacity(ids[0], U);
    }
}
