// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! World-state evaluation.
//!
//! Evaluation follows a drain-recompute pattern for each dirty channel, and
//! writes only the update slot of each derived value:
//!
//! 1. **TOPOLOGY** — If the tree changed, rebuild the traversal order, then
//!    drain and discard the channel.
//! 2. **TRANSFORM** — Drain affected nodes in dependency order and recompute
//!    `world_transform = parent_world * local`,
//!    `world_visible = parent_visible && local`, and
//!    `world_depth = parent_depth + local`.
//! 3. **OPACITY** — Drain affected nodes and recompute
//!    `world_opacity = parent_world_opacity * local`.
//!
//! A node whose world values change in the update slot is marked for resync
//! at that index only; the other index catches up when its own slot is
//! recomputed on the next frame.
//!
//! Degenerate local values are replaced before they can reach a world value:
//! a non-finite transform becomes the identity, a non-finite depth becomes 0,
//! and a NaN opacity becomes 0 (other opacities are clamped to `0..=1`).

use alloc::vec::Vec;

use kurbo::Affine;

use super::store::NodeStore;
use crate::buffer::BufferIndex;
use crate::dirty;
use crate::id::INVALID;

/// Counters produced by one evaluation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvaluateStats {
    /// Nodes whose world transform, visibility, and depth were recomputed.
    pub transforms: usize,
    /// Nodes whose world opacity was recomputed.
    pub opacities: usize,
    /// Degenerate local values that were replaced.
    pub degenerate: usize,
    /// Whether the traversal order was rebuilt.
    pub topology_changed: bool,
}

impl NodeStore {
    /// Recomputes dirty world state into the `update` slot.
    pub(crate) fn evaluate(&mut self, update: BufferIndex) -> EvaluateStats {
        let mut stats = EvaluateStats::default();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            stats.topology_changed = true;
            self.traversal_dirty = false;
        }
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        let dirty_transforms: Vec<u32> = self
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &dirty_transforms {
            let i = idx as usize;
            if !self.alive[i] {
                continue;
            }
            let p = self.parent[i];
            let (parent_world, parent_visible, parent_depth) = if p != INVALID {
                let p = p as usize;
                (
                    self.world_transform[p].get(update),
                    self.world_visible[p].get(update),
                    self.world_depth[p].get(update),
                )
            } else {
                (Affine::IDENTITY, true, 0.0)
            };

            let mut local = self.transform[i].get(update);
            if !local.is_finite() {
                local = Affine::IDENTITY;
                stats.degenerate += 1;
            }
            let mut world = parent_world * local;
            if !world.is_finite() {
                world = Affine::IDENTITY;
                stats.degenerate += 1;
            }
            let visible = parent_visible && self.visible[i].get(update);

            let mut depth = self.depth[i].get(update);
            if !depth.is_finite() {
                depth = 0.0;
                stats.degenerate += 1;
            }
            let depth = parent_depth + depth;

            if self.world_transform[i].get(update) != world
                || self.world_visible[i].get(update) != visible
                || self.world_depth[i].get(update) != depth
            {
                self.world_transform[i].set(update, world);
                self.world_visible[i].set(update, visible);
                self.world_depth[i].set(update, depth);
                self.resend[i].mark_index(update);
            }
            stats.transforms += 1;
        }

        let dirty_opacities: Vec<u32> = self
            .dirty
            .drain(dirty::OPACITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &dirty_opacities {
            let i = idx as usize;
            if !self.alive[i] {
                continue;
            }
            let p = self.parent[i];
            let parent_opacity = if p != INVALID {
                self.world_opacity[p as usize].get(update)
            } else {
                1.0
            };
            let mut local = self.opacity[i].get(update);
            if local.is_nan() {
                local = 0.0;
                stats.degenerate += 1;
            }
            let opacity = parent_opacity * local.clamp(0.0, 1.0);
            if self.world_opacity[i].get(update) != opacity {
                self.world_opacity[i].set(update, opacity);
                self.resend[i].mark_index(update);
            }
            stats.opacities += 1;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{NodeValue, WriteMode};
    use crate::id::NodeId;

    const U: BufferIndex = BufferIndex::ZERO;

    fn attached(store: &mut NodeStore, idx: u32, parent: NodeId) -> NodeId {
        let id = NodeId::new(idx, 0);
        store.create(id).unwrap();
        store.attach(id, parent).unwrap();
        id
    }

    #[test]
    fn evaluate_computes_world_transforms() {
        let mut store = NodeStore::new();
        let parent = attached(&mut store, 1, NodeId::ROOT);
        let child = attached(&mut store, 2, parent);

        let parent_xf = Affine::translate((10.0, 0.0));
        let child_xf = Affine::translate((0.0, 5.0));
        store.write(parent, U, NodeValue::Transform(parent_xf), WriteMode::Bake);
        store.write(child, U, NodeValue::Transform(child_xf), WriteMode::Bake);

        let _ = store.evaluate(U);

        assert_eq!(store.world_transform(parent, U), parent_xf);
        assert_eq!(store.world_transform(child, U), parent_xf * child_xf);
    }

    #[test]
    fn evaluate_propagates_opacity_to_descendants() {
        let mut store = NodeStore::new();
        let grandparent = attached(&mut store, 1, NodeId::ROOT);
        let parent = attached(&mut store, 2, grandparent);
        let child = attached(&mut store, 3, parent);

        store.write(grandparent, U, NodeValue::Opacity(0.5), WriteMode::Bake);
        store.write(parent, U, NodeValue::Opacity(0.8), WriteMode::Bake);
        store.write(child, U, NodeValue::Opacity(0.5), WriteMode::Bake);

        let _ = store.evaluate(U);

        let eps = 1e-6;
        assert!((store.world_opacity(grandparent, U) - 0.5).abs() < eps);
        assert!((store.world_opacity(parent, U) - 0.4).abs() < eps);
        assert!((store.world_opacity(child, U) - 0.2).abs() < eps);
    }

    #[test]
    fn invisible_parent_hides_subtree() {
        let mut store = NodeStore::new();
        let parent = attached(&mut store, 1, NodeId::ROOT);
        let child = attached(&mut store, 2, parent);
        let _ = store.evaluate(U);

        store.write(parent, U, NodeValue::Visible(false), WriteMode::Bake);
        let _ = store.evaluate(U);

        assert!(!store.world_visible(parent, U));
        assert!(!store.world_visible(child, U));
        assert!(store.is_visible(child, U), "local flag is untouched");
    }

    #[test]
    fn depth_accumulates() {
        let mut store = NodeStore::new();
        let parent = attached(&mut store, 1, NodeId::ROOT);
        let child = attached(&mut store, 2, parent);
        store.write(parent, U, NodeValue::Depth(2.0), WriteMode::Bake);
        store.write(child, U, NodeValue::Depth(1.5), WriteMode::Bake);

        let _ = store.evaluate(U);
        assert_eq!(store.world_depth(child, U), 3.5);
    }

    #[test]
    fn degenerate_values_are_replaced() {
        let mut store = NodeStore::new();
        let a = attached(&mut store, 1, NodeId::ROOT);
        let b = attached(&mut store, 2, a);
        let _ = store.evaluate(U);

        store.write(
            a,
            U,
            NodeValue::Transform(Affine::translate((f64::NAN, 0.0))),
            WriteMode::Bake,
        );
        store.write(b, U, NodeValue::Opacity(f32::NAN), WriteMode::Bake);
        let stats = store.evaluate(U);

        assert_eq!(stats.degenerate, 2);
        assert_eq!(store.world_transform(a, U), Affine::IDENTITY);
        assert_eq!(store.world_transform(b, U), Affine::IDENTITY);
        assert_eq!(store.world_opacity(b, U), 0.0);
    }

    #[test]
    fn changed_world_values_mark_descendants_for_resync() {
        let mut store = NodeStore::new();
        let parent = attached(&mut store, 1, NodeId::ROOT);
        let child = attached(&mut store, 2, parent);
        let _ = store.evaluate(U);
        for flags in &mut store.resend {
            flags.clear();
        }

        store.write(
            parent,
            U,
            NodeValue::Transform(Affine::translate((50.0, 0.0))),
            WriteMode::Bake,
        );
        for flags in &mut store.resend {
            flags.clear();
        }
        let _ = store.evaluate(U);
        let child_flags = &mut store.resend[child.index() as usize];
        assert!(child_flags.take(U));
        assert!(child_flags.is_clean(), "only the evaluated index is marked");

        store.write(parent, U, NodeValue::Opacity(0.5), WriteMode::Bake);
        for flags in &mut store.resend {
            flags.clear();
        }
        let _ = store.evaluate(U);
        assert!(store.resend[child.index() as usize].is_set(U));
    }

    #[test]
    fn unchanged_world_values_do_not_resync() {
        let mut store = NodeStore::new();
        let parent = attached(&mut store, 1, NodeId::ROOT);
        let child = attached(&mut store, 2, parent);
        let _ = store.evaluate(U);
        for flags in &mut store.resend {
            flags.clear();
        }

        store.write(parent, U, NodeValue::Depth(0.0), WriteMode::Bake);
        store.resend[parent.index() as usize].clear();
        let stats = store.evaluate(U);
        assert!(stats.transforms >= 2, "subtree was recomputed");
        assert!(store.resend[child.index() as usize].is_clean());
    }

    #[test]
    fn opacity_is_clamped() {
        let mut store = NodeStore::new();
        let a = attached(&mut store, 1, NodeId::ROOT);
        store.write(a, U, NodeValue::Opacity(3.0), WriteMode::Bake);
        let _ = store.evaluate(U);
        assert_eq!(store.world_opacity(a, U), 1.0);
    }

    #[test]
    fn other_slot_is_recomputed_next_frame() {
        let mut store = NodeStore::new();
        let parent = attached(&mut store, 1, NodeId::ROOT);
        let child = attached(&mut store, 2, parent);
        let _ = store.evaluate(U);
        let _ = store.begin_update(U.other());
        let _ = store.evaluate(U.other());

        let xf = Affine::translate((4.0, 4.0));
        let _ = store.begin_update(U);
        store.write(parent, U, NodeValue::Transform(xf), WriteMode::Bake);
        let _ = store.evaluate(U);
        assert_eq!(store.world_transform(child, U), xf);
        assert_eq!(
            store.world_transform(child, U.other()),
            Affine::IDENTITY,
            "other slot untouched this frame"
        );

        let _ = store.begin_update(U.other());
        let stats = store.evaluate(U.other());
        assert!(stats.transforms >= 2, "carried marks recompute the subtree");
        assert_eq!(store.world_transform(child, U.other()), xf);
    }

    #[test]
    fn direct_write_recomputes_after_revert() {
        let mut store = NodeStore::new();
        let a = attached(&mut store, 1, NodeId::ROOT);
        let _ = store.evaluate(U);

        store.write(a, U, NodeValue::Opacity(0.25), WriteMode::Set);
        let _ = store.evaluate(U);
        assert_eq!(store.world_opacity(a, U), 0.25);

        let _ = store.begin_update(U.other());
        let _ = store.evaluate(U.other());
        assert_eq!(store.world_opacity(a, U.other()), 1.0);

        let _ = store.begin_update(U);
        let _ = store.evaluate(U);
        assert_eq!(store.world_opacity(a, U), 1.0, "reverted to base");
    }

    #[test]
    fn quiescent_evaluate_is_empty() {
        let mut store = NodeStore::new();
        let _ = attached(&mut store, 1, NodeId::ROOT);
        let _ = store.evaluate(U);
        let _ = store.begin_update(U.other());
        let _ = store.evaluate(U.other());

        let _ = store.begin_update(U);
        let stats = store.evaluate(U);
        assert_eq!(stats, EvaluateStats::default());
    }
}
