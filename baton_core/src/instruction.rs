// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame draw instruction list.
//!
//! The list is rebuilt from scratch every frame. Building walks the scene in
//! traversal order and emits one [`Instruction`] per (node, renderer) pair
//! that is on stage, visible, inside the viewport, and not transparent.
//! Afterwards the list is ordered:
//!
//! - opaque instructions first, front-to-back,
//! - then translucent instructions, back-to-front.
//!
//! Within each group the renderer depth index is the major key and world
//! depth (larger is nearer) the minor key. The sort is stable, so equal keys
//! keep traversal order.

use alloc::vec::Vec;
use core::cmp::Ordering;
use core::slice;

use kurbo::{Affine, Rect};

use crate::buffer::BufferIndex;
use crate::id::{NodeId, RendererId, ResourceId};
use crate::renderer::{OpacityType, RenderState, RenderingBehavior, classify};
use crate::scene::Scene;

/// A flat, self-contained draw instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instruction {
    /// The node providing transform and opacity.
    pub node: NodeId,
    /// The renderer providing state and resources.
    pub renderer: RendererId,
    /// Geometry to draw.
    pub geometry: Option<ResourceId>,
    /// Shader to draw with.
    pub shader: Option<ResourceId>,
    /// Textures to bind.
    pub textures: Option<ResourceId>,
    /// Node world transform.
    pub world_transform: Affine,
    /// Node world opacity times renderer opacity.
    pub opacity: f32,
    /// Render state.
    pub state: RenderState,
    /// Opaque or translucent; transparent drawables are never emitted.
    pub opacity_type: OpacityType,
    /// Major sort key.
    pub depth_index: i32,
    /// Node world depth; minor sort key.
    pub depth: f64,
}

/// Counters produced by one build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Instructions emitted.
    pub instructions: usize,
    /// Drawables skipped as fully transparent.
    pub transparent: usize,
    /// Drawables skipped by viewport culling.
    pub culled: usize,
    /// Drawables skipped because their node is not visible.
    pub invisible: usize,
    /// Whether an emitted instruction renders continuously.
    pub keep_rendering: bool,
}

/// An ordered, reusable list of [`Instruction`]s.
#[derive(Clone, Debug, Default)]
pub struct InstructionList {
    items: Vec<Instruction>,
}

impl InstructionList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates an empty list with room for `capacity` instructions.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Clears the list and makes room for at least `capacity` instructions.
    ///
    /// Capacity only grows.
    pub fn reset_and_reserve(&mut self, capacity: usize) {
        self.items.clear();
        self.items.reserve(capacity);
    }

    /// Appends an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.items.push(instruction);
    }

    /// Removes the most recently pushed instruction.
    pub fn discard_last(&mut self) -> Option<Instruction> {
        self.items.pop()
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the allocated capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Returns the instruction at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.items.get(index)
    }

    /// Iterates instructions in draw order.
    pub fn iter(&self) -> slice::Iter<'_, Instruction> {
        self.items.iter()
    }

    /// Returns the instructions as a slice, in draw order.
    #[must_use]
    pub fn as_slice(&self) -> &[Instruction] {
        &self.items
    }

    /// Rebuilds the list from the `update` slot of `scene`, reserving room
    /// for at least `reserve` instructions.
    pub(crate) fn build(
        &mut self,
        scene: &Scene,
        update: BufferIndex,
        viewport: Option<Rect>,
        reserve: usize,
    ) -> BuildStats {
        self.reset_and_reserve(reserve);

        let mut stats = BuildStats::default();
        let nodes = &scene.nodes;
        for &idx in nodes.traversal_order() {
            let i = idx as usize;
            let attached = &nodes.renderers[i];
            if attached.is_empty() || !nodes.alive[i] {
                continue;
            }
            if !nodes.world_visible[i].get(update) {
                stats.invisible += attached.len();
                continue;
            }
            let world_transform = nodes.world_transform[i].get(update);
            if let (Some(viewport), Some(bounds)) = (viewport, nodes.bounds[i].get(update))
                && !overlaps(world_transform.transform_rect_bbox(bounds), viewport)
            {
                stats.culled += attached.len();
                continue;
            }
            let node = NodeId::new(idx, nodes.generation[i]);
            let world_opacity = nodes.world_opacity[i].get(update);
            let depth = nodes.world_depth[i].get(update);

            for &renderer in attached {
                let Some(r) = scene.renderers.table.get(renderer.idx, renderer.generation) else {
                    continue;
                };
                let renderer_opacity = r.opacity.get(update);
                let renderer_opacity = if renderer_opacity.is_nan() {
                    0.0
                } else {
                    renderer_opacity.clamp(0.0, 1.0)
                };
                let opacity = world_opacity * renderer_opacity;
                let hinted = scene.resources.is_translucent(r.shader)
                    || scene.resources.is_translucent(r.textures);
                let opacity_type = classify(r.state.blend_mode, opacity, hinted);
                if opacity_type == OpacityType::Transparent {
                    stats.transparent += 1;
                    continue;
                }
                if r.state.behavior == RenderingBehavior::Continuously {
                    stats.keep_rendering = true;
                }
                self.push(Instruction {
                    node,
                    renderer,
                    geometry: r.geometry,
                    shader: r.shader,
                    textures: r.textures,
                    world_transform,
                    opacity,
                    state: r.state,
                    opacity_type,
                    depth_index: r.depth_index.get(update),
                    depth,
                });
            }
        }

        self.items.sort_by(draw_order);
        stats.instructions = self.items.len();
        stats
    }
}

impl<'a> IntoIterator for &'a InstructionList {
    type Item = &'a Instruction;
    type IntoIter = slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Opaque front-to-back, then translucent back-to-front.
fn draw_order(a: &Instruction, b: &Instruction) -> Ordering {
    let translucent = |i: &Instruction| i.opacity_type == OpacityType::Translucent;
    translucent(a)
        .cmp(&translucent(b))
        .then(a.depth_index.cmp(&b.depth_index))
        .then_with(|| {
            if translucent(a) {
                a.depth.total_cmp(&b.depth)
            } else {
                b.depth.total_cmp(&a.depth)
            }
        })
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::command::{ApplyOutcome, Command, NodeValue, RendererValue, WriteMode};
    use crate::registry::Registry;
    use crate::renderer::BlendMode;
    use crate::resource::ResourceDesc;

    const U: BufferIndex = BufferIndex::ZERO;

    struct Fixture {
        registry: Registry,
        scene: Scene,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Registry::new(),
                scene: Scene::new(),
            }
        }

        fn apply(&mut self, cmd: Command) {
            assert_eq!(self.scene.apply(cmd, U), ApplyOutcome::Applied);
        }

        /// Creates a node under `parent` holding one fresh renderer.
        fn drawable(&mut self, parent: NodeId) -> (NodeId, RendererId) {
            let node = self.registry.reserve_node();
            let renderer = self.registry.reserve_renderer();
            self.apply(Command::CreateNode(node));
            self.apply(Command::Attach {
                child: node,
                parent,
            });
            self.apply(Command::CreateRenderer(renderer));
            self.apply(Command::AddRenderer { node, renderer });
            (node, renderer)
        }

        fn set_node(&mut self, node: NodeId, value: NodeValue) {
            self.apply(Command::SetNode {
                node,
                value,
                mode: WriteMode::Bake,
            });
        }

        fn set_renderer(&mut self, renderer: RendererId, value: RendererValue) {
            self.apply(Command::SetRenderer {
                renderer,
                value,
                mode: WriteMode::Bake,
            });
        }

        fn build(&mut self, viewport: Option<Rect>) -> (InstructionList, BuildStats) {
            let _ = self.scene.evaluate(U);
            let mut list = InstructionList::new();
            let stats = list.build(&self.scene, U, viewport, 0);
            (list, stats)
        }
    }

    fn nodes(list: &InstructionList) -> Vec<NodeId> {
        list.iter().map(|i| i.node).collect()
    }

    #[test]
    fn empty_scene_builds_nothing() {
        let mut fx = Fixture::new();
        let (list, stats) = fx.build(None);
        assert!(list.is_empty());
        assert_eq!(stats, BuildStats::default());
    }

    #[test]
    fn one_drawable_one_instruction() {
        let mut fx = Fixture::new();
        let (a, r) = fx.drawable(NodeId::ROOT);
        let (list, stats) = fx.build(None);
        assert_eq!(list.len(), 1);
        assert_eq!(stats.instructions, 1);
        let inst = list.get(0).unwrap();
        assert_eq!(inst.node, a);
        assert_eq!(inst.renderer, r);
        assert_eq!(inst.opacity, 1.0);
        assert_eq!(inst.opacity_type, OpacityType::Opaque);
    }

    #[test]
    fn detached_node_is_absent() {
        let mut fx = Fixture::new();
        let (a, _) = fx.drawable(NodeId::ROOT);
        fx.apply(Command::Detach(a));
        let (list, _) = fx.build(None);
        assert!(list.is_empty());
    }

    #[test]
    fn invisible_subtree_is_skipped() {
        let mut fx = Fixture::new();
        let (a, _) = fx.drawable(NodeId::ROOT);
        let (_, _) = fx.drawable(a);
        fx.set_node(a, NodeValue::Visible(false));
        let (list, stats) = fx.build(None);
        assert!(list.is_empty());
        assert_eq!(stats.invisible, 2);
    }

    #[test]
    fn visibility_toggled_twice_uses_final_state() {
        let mut fx = Fixture::new();
        let (a, _) = fx.drawable(NodeId::ROOT);
        fx.set_node(a, NodeValue::Visible(false));
        fx.set_node(a, NodeValue::Visible(true));
        let (list, _) = fx.build(None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn transparent_is_excluded() {
        let mut fx = Fixture::new();
        let (a, _) = fx.drawable(NodeId::ROOT);
        fx.set_node(a, NodeValue::Opacity(0.0));
        let (list, stats) = fx.build(None);
        assert!(list.is_empty());
        assert_eq!(stats.transparent, 1);
    }

    #[test]
    fn blend_off_draws_even_at_zero_alpha() {
        let mut fx = Fixture::new();
        let (a, r) = fx.drawable(NodeId::ROOT);
        fx.set_node(a, NodeValue::Opacity(0.0));
        fx.set_renderer(r, RendererValue::BlendMode(BlendMode::Off));
        let (list, _) = fx.build(None);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().opacity_type, OpacityType::Opaque);
    }

    #[test]
    fn renderer_opacity_multiplies_world_opacity() {
        let mut fx = Fixture::new();
        let (a, r) = fx.drawable(NodeId::ROOT);
        fx.set_node(a, NodeValue::Opacity(0.5));
        fx.set_renderer(r, RendererValue::Opacity(0.5));
        let (list, _) = fx.build(None);
        let inst = list.get(0).unwrap();
        assert!((inst.opacity - 0.25).abs() < 1e-6);
        assert_eq!(inst.opacity_type, OpacityType::Translucent);
    }

    #[test]
    fn translucent_resources_force_blending() {
        let mut fx = Fixture::new();
        let (_, with_shader) = fx.drawable(NodeId::ROOT);
        let (_, with_textures) = fx.drawable(NodeId::ROOT);
        let shader = fx.registry.reserve_resource();
        let textures = fx.registry.reserve_resource();
        fx.apply(Command::CreateResource {
            resource: shader,
            desc: ResourceDesc::Shader {
                output_is_transparent: true,
            },
        });
        fx.apply(Command::CreateResource {
            resource: textures,
            desc: ResourceDesc::TextureSet { has_alpha: true },
        });
        fx.set_renderer(with_shader, RendererValue::Shader(Some(shader)));
        fx.set_renderer(with_textures, RendererValue::Textures(Some(textures)));

        let (list, _) = fx.build(None);
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|i| i.opacity == 1.0));
        assert!(
            list.iter()
                .all(|i| i.opacity_type == OpacityType::Translucent)
        );

        fx.apply(Command::UpdateResource {
            resource: shader,
            desc: ResourceDesc::Shader {
                output_is_transparent: false,
            },
        });
        let (list, _) = fx.build(None);
        let kind = |r| {
            list.iter()
                .find(|i| i.renderer == r)
                .map(|i| i.opacity_type)
        };
        assert_eq!(kind(with_shader), Some(OpacityType::Opaque));
        assert_eq!(kind(with_textures), Some(OpacityType::Translucent));
    }

    #[test]
    fn shared_renderer_yields_one_instruction_per_node() {
        let mut fx = Fixture::new();
        let (_, r) = fx.drawable(NodeId::ROOT);
        let b = fx.registry.reserve_node();
        fx.apply(Command::CreateNode(b));
        fx.apply(Command::Attach {
            child: b,
            parent: NodeId::ROOT,
        });
        fx.apply(Command::AddRenderer {
            node: b,
            renderer: r,
        });
        let (list, _) = fx.build(None);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn opaque_front_to_back_then_translucent_back_to_front() {
        let mut fx = Fixture::new();
        let (far_opaque, _) = fx.drawable(NodeId::ROOT);
        let (near_opaque, _) = fx.drawable(NodeId::ROOT);
        let (near_blend, rb1) = fx.drawable(NodeId::ROOT);
        let (far_blend, rb2) = fx.drawable(NodeId::ROOT);
        fx.set_node(far_opaque, NodeValue::Depth(1.0));
        fx.set_node(near_opaque, NodeValue::Depth(5.0));
        fx.set_node(near_blend, NodeValue::Depth(5.0));
        fx.set_node(far_blend, NodeValue::Depth(1.0));
        for r in [rb1, rb2] {
            fx.set_renderer(r, RendererValue::BlendMode(BlendMode::On));
        }

        let (list, _) = fx.build(None);
        assert_eq!(
            nodes(&list),
            [near_opaque, far_opaque, far_blend, near_blend]
        );
    }

    #[test]
    fn depth_index_is_major_key() {
        let mut fx = Fixture::new();
        let (a, ra) = fx.drawable(NodeId::ROOT);
        let (b, _) = fx.drawable(NodeId::ROOT);
        fx.set_node(a, NodeValue::Depth(10.0));
        fx.set_renderer(ra, RendererValue::DepthIndex(1));
        let (list, _) = fx.build(None);
        assert_eq!(nodes(&list), [b, a]);
    }

    #[test]
    fn ties_keep_traversal_order() {
        let mut fx = Fixture::new();
        let ids: Vec<_> = (0..4)
            .map(|_| {
                let (n, r) = fx.drawable(NodeId::ROOT);
                fx.set_renderer(r, RendererValue::BlendMode(BlendMode::On));
                n
            })
            .collect();
        let (list, _) = fx.build(None);
        assert_eq!(nodes(&list), ids);
    }

    #[test]
    fn viewport_culls_out_of_bounds_nodes() {
        let mut fx = Fixture::new();
        let (inside, _) = fx.drawable(NodeId::ROOT);
        let (outside, _) = fx.drawable(NodeId::ROOT);
        let (unbounded, _) = fx.drawable(NodeId::ROOT);
        let bounds = Some(Rect::new(0.0, 0.0, 10.0, 10.0));
        fx.set_node(inside, NodeValue::Bounds(bounds));
        fx.set_node(outside, NodeValue::Bounds(bounds));
        fx.set_node(
            outside,
            NodeValue::Transform(Affine::translate((500.0, 0.0))),
        );

        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        let (list, stats) = fx.build(Some(viewport));
        assert_eq!(nodes(&list), [inside, unbounded]);
        assert_eq!(stats.culled, 1);
    }

    #[test]
    fn continuous_renderer_keeps_rendering() {
        let mut fx = Fixture::new();
        let (_, r) = fx.drawable(NodeId::ROOT);
        let (_, stats) = fx.build(None);
        assert!(!stats.keep_rendering);

        fx.set_renderer(r, RendererValue::Behavior(RenderingBehavior::Continuously));
        let (_, stats) = fx.build(None);
        assert!(stats.keep_rendering);
    }

    #[test]
    fn container_operations() {
        let mut fx = Fixture::new();
        let _ = fx.drawable(NodeId::ROOT);
        let _ = fx.drawable(NodeId::ROOT);
        let (mut list, _) = fx.build(None);
        assert_eq!(list.len(), 2);

        let last = list.discard_last().unwrap();
        assert_eq!(list.len(), 1);
        list.push(last);
        assert_eq!(list.len(), 2);

        let capacity = list.capacity();
        list.reset_and_reserve(1);
        assert!(list.is_empty());
        assert!(list.capacity() >= capacity, "capacity never shrinks");
        assert!(list.get(0).is_none());
    }
}
