// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene: nodes, renderers, and resources, mutated only by commands.
//!
//! [`Scene::apply`] is the single entry point for mutation. It checks the
//! target's generation first, so a command addressed to an object that has
//! since been destroyed is reported as [`ApplyOutcome::Dangling`] and has no
//! effect. Cross-object references (a node's renderers, a renderer's
//! resources) are non-owning and are cleaned up when their target dies.

use alloc::vec::Vec;
use core::mem;

use crate::buffer::{BufferIndex, ResendFlags};
use crate::command::{ApplyOutcome, Command, Rejection, RendererValue};
use crate::frame::Resync;
use crate::id::{NodeId, ObjectRef, RendererId, ResourceId};
use crate::node::{EvaluateStats, NodeStore};
use crate::renderer::{RendererStore, ResourceSlot, snapshot_of};
use crate::resource::{ResourceSnapshot, ResourceStore};

/// All scene objects owned by the update stage.
#[derive(Debug)]
pub struct Scene {
    pub(crate) nodes: NodeStore,
    pub(crate) renderers: RendererStore,
    pub(crate) resources: ResourceStore,
    /// Destroyed objects still to be reported to each buffer index.
    removed: Vec<(ObjectRef, ResendFlags)>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates a scene containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: NodeStore::new(),
            renderers: RendererStore::new(),
            resources: ResourceStore::new(),
            removed: Vec::new(),
        }
    }

    /// Returns the node storage.
    #[must_use]
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// Returns the renderer storage.
    #[must_use]
    pub fn renderers(&self) -> &RendererStore {
        &self.renderers
    }

    /// Returns the resource storage.
    #[must_use]
    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    /// Applies one command, writing into the `update` slot.
    pub fn apply(&mut self, command: Command, update: BufferIndex) -> ApplyOutcome {
        match command {
            Command::CreateNode(id) => self.nodes.create(id).into(),
            Command::DestroyNode(id) => {
                if !self.nodes.is_alive(id) {
                    return ApplyOutcome::Dangling;
                }
                let outcome = self.nodes.destroy(id);
                if outcome.is_ok() {
                    self.tombstone(id.into());
                }
                outcome.into()
            }
            Command::Attach { child, parent } => {
                if !self.nodes.is_alive(child) {
                    return ApplyOutcome::Dangling;
                }
                self.nodes.attach(child, parent).into()
            }
            Command::Detach(id) => {
                if !self.nodes.is_alive(id) {
                    return ApplyOutcome::Dangling;
                }
                self.nodes.detach(id).into()
            }
            Command::SetNode { node, value, mode } => {
                if !self.nodes.is_alive(node) {
                    return ApplyOutcome::Dangling;
                }
                self.nodes.write(node, update, value, mode);
                ApplyOutcome::Applied
            }
            Command::CreateRenderer(id) => self.renderers.create(id).into(),
            Command::DestroyRenderer(id) => self.destroy_renderer(id),
            Command::AddRenderer { node, renderer } => {
                if !self.nodes.is_alive(node) {
                    return ApplyOutcome::Dangling;
                }
                if !self.renderers.is_alive(renderer) {
                    return ApplyOutcome::Rejected(Rejection::DeadReference);
                }
                self.nodes.add_renderer(node, renderer).into()
            }
            Command::RemoveRenderer { node, renderer } => {
                if !self.nodes.is_alive(node) {
                    return ApplyOutcome::Dangling;
                }
                let _ = self.nodes.remove_renderer(node, renderer);
                ApplyOutcome::Applied
            }
            Command::SetRenderer {
                renderer,
                value,
                mode,
            } => {
                if !self.renderers.is_alive(renderer) {
                    return ApplyOutcome::Dangling;
                }
                match value {
                    RendererValue::Geometry(r) => {
                        self.set_resource(renderer, ResourceSlot::Geometry, r)
                    }
                    RendererValue::Shader(r) => self.set_resource(renderer, ResourceSlot::Shader, r),
                    RendererValue::Textures(r) => {
                        self.set_resource(renderer, ResourceSlot::Textures, r)
                    }
                    value => {
                        self.renderers.write(renderer, update, value, mode);
                        ApplyOutcome::Applied
                    }
                }
            }
            Command::CreateResource { resource, desc } => {
                self.resources.create(resource, desc).into()
            }
            Command::UpdateResource { resource, desc } => {
                if let Some(current) = self.resources.desc(resource)
                    && mem::discriminant(&current) != mem::discriminant(&desc)
                {
                    return ApplyOutcome::Rejected(Rejection::KindMismatch);
                }
                let Some(consumers) = self.resources.update(resource, desc) else {
                    return ApplyOutcome::Dangling;
                };
                for &r in consumers {
                    self.renderers.mark_resend(r);
                }
                ApplyOutcome::Applied
            }
            Command::DestroyResource(id) => {
                let Some(consumers) = self.resources.destroy(id) else {
                    return ApplyOutcome::Dangling;
                };
                for r in consumers {
                    self.renderers.forget_resource(r, id);
                }
                self.tombstone(id.into());
                ApplyOutcome::Applied
            }
            Command::Callback(f) => {
                f(self, update);
                ApplyOutcome::Applied
            }
        }
    }

    /// Prepares the `update` slot for a new frame.
    ///
    /// Returns the number of objects whose update slot was reset.
    pub(crate) fn begin_update(&mut self, update: BufferIndex) -> usize {
        self.nodes.begin_update(update) + self.renderers.begin_update(update)
    }

    /// Recomputes derived node state into the `update` slot.
    pub(crate) fn evaluate(&mut self, update: BufferIndex) -> EvaluateStats {
        self.nodes.evaluate(update)
    }

    /// Appends a resync record for every object marked for `update`, and
    /// consumes those marks.
    pub(crate) fn collect_resync(&mut self, update: BufferIndex, out: &mut Vec<Resync>) {
        self.removed.retain_mut(|(object, flags)| {
            if flags.take(update) {
                out.push(Resync::Removed(*object));
            }
            !flags.is_clean()
        });

        for i in 0..self.nodes.resend.len() {
            if self.nodes.resend[i].take(update) {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "slot indices originate from u32 handles"
                )]
                let idx = i as u32;
                let id = NodeId::new(idx, self.nodes.generation[i]);
                if let Some(snapshot) = self.nodes.snapshot(id, update) {
                    out.push(Resync::Node(snapshot));
                }
            }
        }

        for (idx, generation, r) in self.renderers.table.iter_mut() {
            if r.resend.take(update) {
                let id = RendererId::new(idx, generation);
                out.push(Resync::Renderer(snapshot_of(id, r, update)));
            }
        }

        for (idx, generation, r) in self.resources.table.iter_mut() {
            if r.resend.take(update) {
                let id = ResourceId::new(idx, generation);
                out.push(Resync::Resource(ResourceSnapshot {
                    id,
                    desc: r.desc,
                    consumers: r.consumers.len(),
                }));
            }
        }
    }

    fn destroy_renderer(&mut self, id: RendererId) -> ApplyOutcome {
        let Some(record) = self.renderers.destroy(id) else {
            return ApplyOutcome::Dangling;
        };
        self.nodes.forget_renderer(id);
        for slot in [
            ResourceSlot::Geometry,
            ResourceSlot::Shader,
            ResourceSlot::Textures,
        ] {
            if let Some(resource) = record.resource(slot) {
                self.resources.remove_consumer(resource, id);
            }
        }
        self.tombstone(id.into());
        ApplyOutcome::Applied
    }

    fn set_resource(
        &mut self,
        renderer: RendererId,
        slot: ResourceSlot,
        resource: Option<ResourceId>,
    ) -> ApplyOutcome {
        if let Some(resource) = resource {
            let Some(desc) = self.resources.desc(resource) else {
                return ApplyOutcome::Rejected(Rejection::DeadReference);
            };
            if !slot.accepts(desc) {
                return ApplyOutcome::Rejected(Rejection::KindMismatch);
            }
        }
        let previous = self.renderers.replace_resource(renderer, slot, resource);
        if previous != resource {
            if let Some(previous) = previous {
                self.resources.remove_consumer(previous, renderer);
            }
            if let Some(resource) = resource {
                self.resources.add_consumer(resource, renderer);
            }
        }
        ApplyOutcome::Applied
    }

    fn tombstone(&mut self, object: ObjectRef) {
        let mut flags = ResendFlags::CLEAN;
        flags.mark();
        self.removed.push((object, flags));
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::command::{NodeValue, WriteMode};
    use crate::registry::Registry;
    use crate::resource::ResourceDesc;

    const U: BufferIndex = BufferIndex::ZERO;

    fn node(scene: &mut Scene, registry: &mut Registry) -> NodeId {
        let id = registry.reserve_node();
        assert_eq!(scene.apply(Command::CreateNode(id), U), ApplyOutcome::Applied);
        id
    }

    #[test]
    fn sequential_writes_last_wins() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let a = node(&mut scene, &mut registry);
        for o in [0.1, 0.7, 0.3] {
            let _ = scene.apply(
                Command::SetNode {
                    node: a,
                    value: NodeValue::Opacity(o),
                    mode: WriteMode::Bake,
                },
                U,
            );
        }
        assert_eq!(scene.nodes().opacity(a, U), 0.3);
    }

    #[test]
    fn commands_for_destroyed_node_are_dangling() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let a = node(&mut scene, &mut registry);
        let _ = registry.release_node(a);
        assert_eq!(scene.apply(Command::DestroyNode(a), U), ApplyOutcome::Applied);

        let outcomes = [
            Command::DestroyNode(a),
            Command::Detach(a),
            Command::Attach {
                child: a,
                parent: NodeId::ROOT,
            },
            Command::SetNode {
                node: a,
                value: NodeValue::Visible(false),
                mode: WriteMode::Set,
            },
        ]
        .map(|cmd| scene.apply(cmd, U));
        assert!(outcomes.iter().all(|&o| o == ApplyOutcome::Dangling));
    }

    #[test]
    fn reused_slot_ignores_old_handle() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let old = node(&mut scene, &mut registry);
        let _ = registry.release_node(old);
        let _ = scene.apply(Command::DestroyNode(old), U);

        let new = node(&mut scene, &mut registry);
        assert_eq!(new.index(), old.index());
        let outcome = scene.apply(
            Command::SetNode {
                node: old,
                value: NodeValue::Opacity(0.0),
                mode: WriteMode::Bake,
            },
            U,
        );
        assert_eq!(outcome, ApplyOutcome::Dangling);
        assert_eq!(scene.nodes().opacity(new, U), 1.0);
    }

    #[test]
    fn root_destroy_is_rejected() {
        let mut scene = Scene::new();
        assert_eq!(
            scene.apply(Command::DestroyNode(NodeId::ROOT), U),
            ApplyOutcome::Rejected(Rejection::RootImmutable)
        );
    }

    #[test]
    fn dead_resource_reference_is_rejected() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let r = registry.reserve_renderer();
        let tex = registry.reserve_resource();
        let _ = scene.apply(Command::CreateRenderer(r), U);

        let outcome = scene.apply(
            Command::SetRenderer {
                renderer: r,
                value: RendererValue::Textures(Some(tex)),
                mode: WriteMode::Bake,
            },
            U,
        );
        assert_eq!(outcome, ApplyOutcome::Rejected(Rejection::DeadReference));
    }

    fn create_resource(scene: &mut Scene, registry: &mut Registry, desc: ResourceDesc) -> ResourceId {
        let id = registry.reserve_resource();
        assert_eq!(
            scene.apply(Command::CreateResource { resource: id, desc }, U),
            ApplyOutcome::Applied
        );
        id
    }

    fn set_slot(scene: &mut Scene, renderer: RendererId, value: RendererValue) -> ApplyOutcome {
        scene.apply(
            Command::SetRenderer {
                renderer,
                value,
                mode: WriteMode::Bake,
            },
            U,
        )
    }

    fn drain(scene: &mut Scene, index: BufferIndex) -> Vec<Resync> {
        let mut out = Vec::new();
        scene.collect_resync(index, &mut out);
        out
    }

    #[test]
    fn updating_resource_resyncs_consumers_in_both_indices() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let r = registry.reserve_renderer();
        let _ = scene.apply(Command::CreateRenderer(r), U);
        let shader = create_resource(
            &mut scene,
            &mut registry,
            ResourceDesc::Shader {
                output_is_transparent: false,
            },
        );
        assert_eq!(
            set_slot(&mut scene, r, RendererValue::Shader(Some(shader))),
            ApplyOutcome::Applied
        );
        let _ = drain(&mut scene, U);
        let _ = drain(&mut scene, U.other());
        assert!(drain(&mut scene, U).is_empty());

        let desc = ResourceDesc::Shader {
            output_is_transparent: true,
        };
        assert_eq!(
            scene.apply(Command::UpdateResource { resource: shader, desc }, U),
            ApplyOutcome::Applied
        );

        for index in [U, U.other()] {
            let out = drain(&mut scene, index);
            assert!(
                out.iter()
                    .any(|rec| matches!(rec, Resync::Renderer(s) if s.id == r && s.shader == Some(shader))),
                "consumer resynced at {index:?}"
            );
            assert!(
                out.iter()
                    .any(|rec| matches!(rec, Resync::Resource(s) if s.id == shader && s.desc == desc))
            );
        }
        assert!(drain(&mut scene, U).is_empty());
    }

    #[test]
    fn resource_of_wrong_kind_is_rejected() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let r = registry.reserve_renderer();
        let _ = scene.apply(Command::CreateRenderer(r), U);
        let geo = create_resource(&mut scene, &mut registry, ResourceDesc::Geometry);
        let tex = create_resource(
            &mut scene,
            &mut registry,
            ResourceDesc::TextureSet { has_alpha: false },
        );

        let kind_mismatch = ApplyOutcome::Rejected(Rejection::KindMismatch);
        assert_eq!(set_slot(&mut scene, r, RendererValue::Shader(Some(geo))), kind_mismatch);
        assert_eq!(set_slot(&mut scene, r, RendererValue::Geometry(Some(tex))), kind_mismatch);
        assert_eq!(set_slot(&mut scene, r, RendererValue::Textures(Some(geo))), kind_mismatch);
        assert!(scene.resources().consumers(geo).is_empty());
        let snapshot = scene.renderers().snapshot(r, U).unwrap();
        assert_eq!((snapshot.geometry, snapshot.shader, snapshot.textures), (None, None, None));

        assert_eq!(
            set_slot(&mut scene, r, RendererValue::Geometry(Some(geo))),
            ApplyOutcome::Applied
        );
        assert_eq!(
            scene.apply(
                Command::UpdateResource {
                    resource: geo,
                    desc: ResourceDesc::TextureSet { has_alpha: true },
                },
                U,
            ),
            kind_mismatch
        );
        assert_eq!(scene.resources().desc(geo), Some(ResourceDesc::Geometry));
    }

    #[test]
    fn destroying_resource_clears_consumers() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let r = registry.reserve_renderer();
        let tex = registry.reserve_resource();
        let _ = scene.apply(Command::CreateRenderer(r), U);
        let _ = scene.apply(
            Command::CreateResource {
                resource: tex,
                desc: ResourceDesc::TextureSet { has_alpha: true },
            },
            U,
        );
        let _ = scene.apply(
            Command::SetRenderer {
                renderer: r,
                value: RendererValue::Textures(Some(tex)),
                mode: WriteMode::Bake,
            },
            U,
        );
        assert_eq!(scene.resources().consumers(tex), &[r]);

        assert_eq!(
            scene.apply(Command::DestroyResource(tex), U),
            ApplyOutcome::Applied
        );
        assert_eq!(scene.renderers().snapshot(r, U).unwrap().textures, None);
    }

    #[test]
    fn destroying_renderer_detaches_it_everywhere() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let a = node(&mut scene, &mut registry);
        let b = node(&mut scene, &mut registry);
        let r = registry.reserve_renderer();
        let geo = registry.reserve_resource();
        let _ = scene.apply(Command::CreateRenderer(r), U);
        let _ = scene.apply(
            Command::CreateResource {
                resource: geo,
                desc: ResourceDesc::Geometry,
            },
            U,
        );
        let _ = scene.apply(
            Command::SetRenderer {
                renderer: r,
                value: RendererValue::Geometry(Some(geo)),
                mode: WriteMode::Bake,
            },
            U,
        );
        for n in [a, b] {
            let _ = scene.apply(Command::AddRenderer { node: n, renderer: r }, U);
        }

        let _ = scene.apply(Command::DestroyRenderer(r), U);
        assert!(scene.nodes().renderers(a).is_empty());
        assert!(scene.nodes().renderers(b).is_empty());
        assert!(scene.resources().consumers(geo).is_empty());
        assert_eq!(
            scene.apply(Command::AddRenderer { node: a, renderer: r }, U),
            ApplyOutcome::Rejected(Rejection::DeadReference)
        );
    }

    #[test]
    fn callback_runs_with_update_index() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let a = node(&mut scene, &mut registry);
        let cmd = Command::Callback(alloc::boxed::Box::new(move |scene: &mut Scene, update| {
            let _ = scene.apply(
                Command::SetNode {
                    node: a,
                    value: NodeValue::Depth(9.0),
                    mode: WriteMode::Bake,
                },
                update,
            );
        }));
        assert_eq!(scene.apply(cmd, U.other()), ApplyOutcome::Applied);
        assert_eq!(scene.nodes().depth(a, U.other()), 9.0);
    }

    #[test]
    fn resync_is_emitted_once_per_index() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let a = node(&mut scene, &mut registry);

        let mut out = Vec::new();
        scene.collect_resync(U, &mut out);
        assert!(out.iter().any(|r| r.object() == ObjectRef::Node(a)));

        out.clear();
        scene.collect_resync(U, &mut out);
        assert!(out.is_empty(), "bit for U already consumed");

        scene.collect_resync(U.other(), &mut out);
        assert!(out.iter().any(|r| r.object() == ObjectRef::Node(a)));
        out.clear();
        scene.collect_resync(U.other(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn removal_is_reported_to_both_indices() {
        let mut registry = Registry::new();
        let mut scene = Scene::new();
        let a = node(&mut scene, &mut registry);
        let _ = scene.apply(Command::DestroyNode(a), U);

        let mut out = Vec::new();
        scene.collect_resync(U, &mut out);
        scene.collect_resync(U.other(), &mut out);
        let removed: Vec<_> = out
            .iter()
            .filter(|r| matches!(r, Resync::Removed(_)))
            .map(Resync::object)
            .collect();
        assert_eq!(removed, vec![ObjectRef::Node(a), ObjectRef::Node(a)]);
        assert!(scene.removed.is_empty());
    }
}
