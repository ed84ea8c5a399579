// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderers: the drawable part of the scene.
//!
//! A renderer binds a geometry, a shader, and a texture set to the render
//! state used to draw them. Renderers are attached to nodes; a node may hold
//! several and one renderer may be shared by several nodes. Each
//! (node, renderer) pair on stage yields at most one
//! [`Instruction`](crate::instruction::Instruction) per frame.
//!
//! The renderer's opacity and depth index are double-buffered
//! [`Property`] values. Everything in [`RenderState`] and the resource
//! references are plain attributes.

use alloc::vec::Vec;

use crate::buffer::{BufferIndex, Property, ResendFlags};
use crate::command::{Rejection, RendererValue, WriteMode};
use crate::id::{RendererId, ResourceId};
use crate::resource::ResourceDesc;
use crate::slots::SlotTable;

/// Alpha at or below which an `Auto` renderer is not drawn at all.
pub const FULLY_TRANSPARENT: f32 = 0.01;

/// Alpha above which an `Auto` renderer keeps its opaque classification.
pub const FULLY_OPAQUE: f32 = 0.99;

/// Whether blending is enabled for a renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Never blend; always classified opaque.
    Off,
    /// Blend when the computed alpha or the resources require it.
    #[default]
    Auto,
    /// Always blend; always classified translucent.
    On,
}

/// Which polygon faces are culled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FaceCullingMode {
    /// Draw both faces.
    #[default]
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
    /// Cull both faces.
    FrontAndBack,
}

/// Whether the renderer writes to the depth buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthWriteMode {
    /// Write depth for opaque renderers only.
    #[default]
    Auto,
    /// Never write depth.
    Off,
    /// Always write depth.
    On,
}

/// Whether the renderer tests against the depth buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthTestMode {
    /// Test depth when the layer uses depth.
    #[default]
    Auto,
    /// Never test depth.
    Off,
    /// Always test depth.
    On,
}

/// When the renderer needs new frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderingBehavior {
    /// Render only when something changed.
    #[default]
    IfRequired,
    /// Request a new frame every frame while on stage.
    Continuously,
}

/// Opacity classification of a drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpacityType {
    /// Fully covers what is behind it; drawn front-to-back.
    Opaque,
    /// Blended with what is behind it; drawn back-to-front.
    Translucent,
    /// Contributes nothing; not drawn.
    Transparent,
}

/// Indexed-draw range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IndexRange {
    /// First element to draw.
    pub first: u32,
    /// Number of elements; 0 draws everything.
    pub count: u32,
}

/// Plain render-state attributes of a renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderState {
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Face culling.
    pub face_culling: FaceCullingMode,
    /// Depth writes.
    pub depth_write: DepthWriteMode,
    /// Depth test.
    pub depth_test: DepthTestMode,
    /// Whether color output is premultiplied by alpha.
    pub premultiplied_alpha: bool,
    /// Indexed-draw range.
    pub index_range: IndexRange,
    /// Rendering behavior.
    pub behavior: RenderingBehavior,
}

/// Classifies a drawable from its blend mode, its combined alpha, and
/// whether its shader or textures require blending.
///
/// `On` is always translucent and `Off` is always opaque. `Auto` starts from
/// translucent when `resources_translucent` is set (opaque otherwise), then
/// `alpha <= FULLY_TRANSPARENT` gives transparent and
/// `alpha <= FULLY_OPAQUE` gives translucent.
#[must_use]
pub fn classify(blend_mode: BlendMode, alpha: f32, resources_translucent: bool) -> OpacityType {
    match blend_mode {
        BlendMode::On => OpacityType::Translucent,
        BlendMode::Off => OpacityType::Opaque,
        BlendMode::Auto => {
            if alpha.is_nan() || alpha <= FULLY_TRANSPARENT {
                OpacityType::Transparent
            } else if alpha <= FULLY_OPAQUE || resources_translucent {
                OpacityType::Translucent
            } else {
                OpacityType::Opaque
            }
        }
    }
}

/// A copy of one renderer's values at a given buffer index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererSnapshot {
    /// The renderer.
    pub id: RendererId,
    /// Renderer opacity.
    pub opacity: f32,
    /// Depth index.
    pub depth_index: i32,
    /// Render state.
    pub state: RenderState,
    /// Geometry reference.
    pub geometry: Option<ResourceId>,
    /// Shader reference.
    pub shader: Option<ResourceId>,
    /// Texture set reference.
    pub textures: Option<ResourceId>,
}

/// Which resource slot of a renderer a reference occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ResourceSlot {
    Geometry,
    Shader,
    Textures,
}

impl ResourceSlot {
    /// Returns whether a resource described by `desc` may occupy this slot.
    pub(crate) const fn accepts(self, desc: ResourceDesc) -> bool {
        matches!(
            (self, desc),
            (Self::Geometry, ResourceDesc::Geometry)
                | (Self::Shader, ResourceDesc::Shader { .. })
                | (Self::Textures, ResourceDesc::TextureSet { .. })
        )
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RendererRecord {
    pub(crate) opacity: Property<f32>,
    pub(crate) depth_index: Property<i32>,
    pub(crate) state: RenderState,
    pub(crate) geometry: Option<ResourceId>,
    pub(crate) shader: Option<ResourceId>,
    pub(crate) textures: Option<ResourceId>,
    pub(crate) resend: ResendFlags,
    in_reset: bool,
}

impl RendererRecord {
    fn new() -> Self {
        let mut resend = ResendFlags::CLEAN;
        resend.mark();
        Self {
            opacity: Property::new(1.0),
            depth_index: Property::new(0),
            state: RenderState::default(),
            geometry: None,
            shader: None,
            textures: None,
            resend,
            in_reset: false,
        }
    }

    pub(crate) fn resource(&self, slot: ResourceSlot) -> Option<ResourceId> {
        match slot {
            ResourceSlot::Geometry => self.geometry,
            ResourceSlot::Shader => self.shader,
            ResourceSlot::Textures => self.textures,
        }
    }

    fn resource_mut(&mut self, slot: ResourceSlot) -> &mut Option<ResourceId> {
        match slot {
            ResourceSlot::Geometry => &mut self.geometry,
            ResourceSlot::Shader => &mut self.shader,
            ResourceSlot::Textures => &mut self.textures,
        }
    }

    fn is_clean(&self) -> bool {
        self.opacity.is_clean() && self.depth_index.is_clean()
    }
}

/// Storage for all renderers.
#[derive(Debug, Default)]
pub struct RendererStore {
    pub(crate) table: SlotTable<RendererRecord>,
    pending_reset: Vec<RendererId>,
}

impl RendererStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the handle refers to a live renderer.
    #[must_use]
    pub fn is_alive(&self, id: RendererId) -> bool {
        self.table.contains(id.idx, id.generation)
    }

    /// Returns the number of live renderers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns whether no renderer is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the renderer opacity at `index`.
    #[must_use]
    pub fn opacity(&self, id: RendererId, index: BufferIndex) -> f32 {
        self.record(id).opacity.get(index)
    }

    /// Returns the depth index at `index`.
    #[must_use]
    pub fn depth_index(&self, id: RendererId, index: BufferIndex) -> i32 {
        self.record(id).depth_index.get(index)
    }

    /// Returns the render state.
    #[must_use]
    pub fn state(&self, id: RendererId) -> RenderState {
        self.record(id).state
    }

    /// Returns a copy of every value of a live renderer at `index`, or `None`
    /// for a stale handle.
    #[must_use]
    pub fn snapshot(&self, id: RendererId, index: BufferIndex) -> Option<RendererSnapshot> {
        let r = self.table.get(id.idx, id.generation)?;
        Some(snapshot_of(id, r, index))
    }

    // -- Mutation (driven by `Scene::apply`) --

    pub(crate) fn create(&mut self, id: RendererId) -> Result<(), Rejection> {
        if self.table.insert(id.idx, id.generation, RendererRecord::new()) {
            Ok(())
        } else {
            Err(Rejection::AlreadyExists)
        }
    }

    pub(crate) fn destroy(&mut self, id: RendererId) -> Option<RendererRecord> {
        self.table.remove(id.idx, id.generation)
    }

    /// Writes a renderer value that does not reference a resource.
    pub(crate) fn write(
        &mut self,
        id: RendererId,
        update: BufferIndex,
        value: RendererValue,
        mode: WriteMode,
    ) {
        let Some(r) = self.table.get_mut(id.idx, id.generation) else {
            return;
        };
        match value {
            RendererValue::Opacity(v) => mode.write(&mut r.opacity, update, v),
            RendererValue::DepthIndex(v) => mode.write(&mut r.depth_index, update, v),
            RendererValue::BlendMode(v) => r.state.blend_mode = v,
            RendererValue::FaceCulling(v) => r.state.face_culling = v,
            RendererValue::DepthWrite(v) => r.state.depth_write = v,
            RendererValue::DepthTest(v) => r.state.depth_test = v,
            RendererValue::PremultipliedAlpha(v) => r.state.premultiplied_alpha = v,
            RendererValue::IndexRange { first, count } => {
                r.state.index_range = IndexRange { first, count };
            }
            RendererValue::Behavior(v) => r.state.behavior = v,
            RendererValue::Geometry(v) => r.geometry = v,
            RendererValue::Shader(v) => r.shader = v,
            RendererValue::Textures(v) => r.textures = v,
        }
        r.resend.mark();
        if !r.is_clean() && !r.in_reset {
            r.in_reset = true;
            self.pending_reset.push(id);
        }
    }

    /// Replaces a resource reference, returning the previous one.
    pub(crate) fn replace_resource(
        &mut self,
        id: RendererId,
        slot: ResourceSlot,
        resource: Option<ResourceId>,
    ) -> Option<ResourceId> {
        let r = self.table.get_mut(id.idx, id.generation)?;
        r.resend.mark();
        core::mem::replace(r.resource_mut(slot), resource)
    }

    /// Clears every reference a renderer holds to `resource`.
    pub(crate) fn forget_resource(&mut self, id: RendererId, resource: ResourceId) {
        let Some(r) = self.table.get_mut(id.idx, id.generation) else {
            return;
        };
        for slot in [ResourceSlot::Geometry, ResourceSlot::Shader, ResourceSlot::Textures] {
            let field = r.resource_mut(slot);
            if *field == Some(resource) {
                *field = None;
            }
        }
        r.resend.mark();
    }

    /// Marks a renderer for resync on both buffer indices.
    pub(crate) fn mark_resend(&mut self, id: RendererId) {
        if let Some(r) = self.table.get_mut(id.idx, id.generation) {
            r.resend.mark();
        }
    }

    /// Resets pending properties in the `update` slot to their base values.
    ///
    /// Returns the number of renderers whose update slot changed.
    pub(crate) fn begin_update(&mut self, update: BufferIndex) -> usize {
        let mut changed = 0;
        let table = &mut self.table;
        self.pending_reset.retain(|id| {
            let Some(r) = table.get_mut(id.idx, id.generation) else {
                return false;
            };
            let opacity = r.opacity.reset_to_base(update);
            let depth_index = r.depth_index.reset_to_base(update);
            if opacity || depth_index {
                r.resend.mark_index(update);
                changed += 1;
            }
            r.in_reset = !r.is_clean();
            r.in_reset
        });
        changed
    }

    fn record(&self, id: RendererId) -> &RendererRecord {
        match self.table.get(id.idx, id.generation) {
            Some(r) => r,
            None => panic!("stale RendererId: {id:?}"),
        }
    }
}

pub(crate) fn snapshot_of(id: RendererId, r: &RendererRecord, index: BufferIndex) -> RendererSnapshot {
    RendererSnapshot {
        id,
        opacity: r.opacity.get(index),
        depth_index: r.depth_index.get(index),
        state: r.state,
        geometry: r.geometry,
        shader: r.shader,
        textures: r.textures,
    }
}
