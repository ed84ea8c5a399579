// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred mutation commands.
//!
//! Producers never touch the scene directly. They push [`Command`]s into a
//! [`CommandBuffer`]; the update stage drains the buffer once per frame and
//! applies every command in enqueue order via
//! [`Scene::apply`](crate::scene::Scene::apply).
//!
//! Each application yields an [`ApplyOutcome`]:
//!
//! - [`Applied`](ApplyOutcome::Applied) — the mutation took effect.
//! - [`Dangling`](ApplyOutcome::Dangling) — the target no longer exists (its
//!   generation does not match); the command is skipped.
//! - [`Rejected`](ApplyOutcome::Rejected) — the target is live but the request
//!   is invalid (see [`Rejection`]); nothing changes.
//!
//! Outcomes are tallied into [`DrainStats`]. None of them is fatal.

use alloc::boxed::Box;
use alloc::vec::{Drain, Vec};
use core::fmt;

use kurbo::{Affine, Rect};

use crate::buffer::{BufferIndex, Property};
use crate::id::{NodeId, RendererId, ResourceId};
use crate::registry::Registry;
use crate::renderer::{
    BlendMode, DepthTestMode, DepthWriteMode, FaceCullingMode, RenderingBehavior,
};
use crate::resource::ResourceDesc;
use crate::scene::Scene;

/// How a property write interacts with the double buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Frame-local write: visible for the current frame, then the property
    /// reverts to its base value.
    Set,
    /// Persistent write: becomes the base value and reaches the other buffer
    /// slot on the next frame.
    #[default]
    Bake,
}

impl WriteMode {
    #[inline]
    pub(crate) fn write<T: Copy + PartialEq>(
        self,
        property: &mut Property<T>,
        update: BufferIndex,
        value: T,
    ) {
        match self {
            Self::Set => property.set(update, value),
            Self::Bake => property.bake(update, value),
        }
    }
}

/// A node property value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeValue {
    /// Local transform.
    Transform(Affine),
    /// Local opacity.
    Opacity(f32),
    /// Local visibility.
    Visible(bool),
    /// Local depth offset; larger is nearer the viewer.
    Depth(f64),
    /// Local bounds for viewport culling; `None` disables culling.
    Bounds(Option<Rect>),
}

/// A renderer property value.
///
/// [`Opacity`](Self::Opacity) and [`DepthIndex`](Self::DepthIndex) are
/// double-buffered and honor the [`WriteMode`]; the remaining fields are
/// plain attributes and always persist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RendererValue {
    /// Renderer opacity, multiplied with the node's world opacity.
    Opacity(f32),
    /// Major sort key; larger draws later.
    DepthIndex(i32),
    /// Blend mode.
    BlendMode(BlendMode),
    /// Face culling mode.
    FaceCulling(FaceCullingMode),
    /// Depth write mode.
    DepthWrite(DepthWriteMode),
    /// Depth test mode.
    DepthTest(DepthTestMode),
    /// Whether color output is premultiplied by alpha.
    PremultipliedAlpha(bool),
    /// Indexed-draw range.
    IndexRange {
        /// First element to draw.
        first: u32,
        /// Number of elements; 0 draws everything.
        count: u32,
    },
    /// Rendering behavior.
    Behavior(RenderingBehavior),
    /// Geometry reference.
    Geometry(Option<ResourceId>),
    /// Shader reference.
    Shader(Option<ResourceId>),
    /// Texture set reference.
    Textures(Option<ResourceId>),
}

/// A closure run on the update stage during the drain.
///
/// It receives the scene and the update index and may call
/// [`Scene::apply`] to mutate the scene in place.
pub type Callback = Box<dyn FnOnce(&mut Scene, BufferIndex) + Send>;

/// A single deferred mutation.
pub enum Command {
    /// Brings a reserved node handle to life, unattached.
    CreateNode(NodeId),
    /// Destroys a node. Its children are detached and stay alive.
    DestroyNode(NodeId),
    /// Attaches `child` as the last child of `parent`, reparenting if needed.
    Attach {
        /// The node to attach.
        child: NodeId,
        /// Its new parent.
        parent: NodeId,
    },
    /// Detaches a node from its parent.
    Detach(NodeId),
    /// Writes a node property.
    SetNode {
        /// Target node.
        node: NodeId,
        /// New value.
        value: NodeValue,
        /// Write discipline.
        mode: WriteMode,
    },
    /// Brings a reserved renderer handle to life.
    CreateRenderer(RendererId),
    /// Destroys a renderer and removes it from every node.
    DestroyRenderer(RendererId),
    /// Appends a renderer to a node's renderer list.
    AddRenderer {
        /// Target node.
        node: NodeId,
        /// Renderer to add.
        renderer: RendererId,
    },
    /// Removes a renderer from a node's renderer list.
    RemoveRenderer {
        /// Target node.
        node: NodeId,
        /// Renderer to remove.
        renderer: RendererId,
    },
    /// Writes a renderer property.
    SetRenderer {
        /// Target renderer.
        renderer: RendererId,
        /// New value.
        value: RendererValue,
        /// Write discipline.
        mode: WriteMode,
    },
    /// Brings a reserved resource handle to life.
    CreateResource {
        /// The resource.
        resource: ResourceId,
        /// Its description.
        desc: ResourceDesc,
    },
    /// Replaces a resource's description and resyncs its consumers.
    UpdateResource {
        /// The resource.
        resource: ResourceId,
        /// The new description.
        desc: ResourceDesc,
    },
    /// Destroys a resource and clears every reference to it.
    DestroyResource(ResourceId),
    /// Runs a closure on the update stage.
    Callback(Callback),
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateNode(id) => f.debug_tuple("CreateNode").field(id).finish(),
            Self::DestroyNode(id) => f.debug_tuple("DestroyNode").field(id).finish(),
            Self::Attach { child, parent } => f
                .debug_struct("Attach")
                .field("child", child)
                .field("parent", parent)
                .finish(),
            Self::Detach(id) => f.debug_tuple("Detach").field(id).finish(),
            Self::SetNode { node, value, mode } => f
                .debug_struct("SetNode")
                .field("node", node)
                .field("value", value)
                .field("mode", mode)
                .finish(),
            Self::CreateRenderer(id) => f.debug_tuple("CreateRenderer").field(id).finish(),
            Self::DestroyRenderer(id) => f.debug_tuple("DestroyRenderer").field(id).finish(),
            Self::AddRenderer { node, renderer } => f
                .debug_struct("AddRenderer")
                .field("node", node)
                .field("renderer", renderer)
                .finish(),
            Self::RemoveRenderer { node, renderer } => f
                .debug_struct("RemoveRenderer")
                .field("node", node)
                .field("renderer", renderer)
                .finish(),
            Self::SetRenderer {
                renderer,
                value,
                mode,
            } => f
                .debug_struct("SetRenderer")
                .field("renderer", renderer)
                .field("value", value)
                .field("mode", mode)
                .finish(),
            Self::CreateResource { resource, desc } => f
                .debug_struct("CreateResource")
                .field("resource", resource)
                .field("desc", desc)
                .finish(),
            Self::UpdateResource { resource, desc } => f
                .debug_struct("UpdateResource")
                .field("resource", resource)
                .field("desc", desc)
                .finish(),
            Self::DestroyResource(id) => f.debug_tuple("DestroyResource").field(id).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Why a command addressed to a live object was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The attach would make a node its own ancestor.
    Cycle,
    /// The root cannot be attached, detached, or destroyed.
    RootImmutable,
    /// A referenced object (parent, renderer, or resource) is not alive.
    DeadReference,
    /// The object or relation already exists.
    AlreadyExists,
    /// A resource was assigned to a renderer slot of a different kind.
    KindMismatch,
}

/// The result of applying one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// The mutation took effect.
    Applied,
    /// The target no longer exists; the command was skipped.
    Dangling,
    /// The target is live but the request was refused.
    Rejected(Rejection),
}

impl From<Result<(), Rejection>> for ApplyOutcome {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => Self::Applied,
            Err(rejection) => Self::Rejected(rejection),
        }
    }
}

/// Per-drain outcome counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DrainStats {
    /// Commands that took effect.
    pub applied: usize,
    /// Commands skipped because their target no longer exists.
    pub dangling: usize,
    /// Commands refused as invalid.
    pub rejected: usize,
}

impl DrainStats {
    /// Tallies one outcome.
    pub fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::Dangling => self.dangling += 1,
            ApplyOutcome::Rejected(_) => self.rejected += 1,
        }
    }

    /// Returns the number of commands drained.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.applied + self.dangling + self.rejected
    }
}

/// An append-only command buffer, drained FIFO once per frame.
///
/// Storage is reused across frames: draining clears the buffer but keeps its
/// capacity, so steady-state frames do not allocate.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    high_water_mark: usize,
    limit: Option<usize>,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
            high_water_mark: 0,
            limit: None,
        }
    }

    /// Creates an empty buffer with room for `capacity` commands.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            high_water_mark: 0,
            limit: None,
        }
    }

    /// Sets a soft limit on queued commands.
    ///
    /// Exceeding it is a `debug_assert!` failure in debug builds; release
    /// builds keep growing.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Appends a command.
    pub fn push(&mut self, command: Command) {
        debug_assert!(
            self.limit.is_none_or(|limit| self.commands.len() < limit),
            "command buffer exceeded its limit of {:?} commands",
            self.limit
        );
        self.commands.push(command);
    }

    /// Returns the number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns whether no command is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns the allocated capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.commands.capacity()
    }

    /// Returns the largest number of commands seen by a single drain.
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Removes every queued command in FIFO order, keeping the capacity.
    pub fn drain(&mut self) -> Drain<'_, Command> {
        self.high_water_mark = self.high_water_mark.max(self.commands.len());
        self.commands.drain(..)
    }

    // -- Producer helpers --

    /// Reserves a node handle and enqueues its creation.
    pub fn create_node(&mut self, registry: &mut Registry) -> NodeId {
        let id = registry.reserve_node();
        self.push(Command::CreateNode(id));
        id
    }

    /// Releases a node handle and enqueues its destruction.
    ///
    /// Destroying the root or a stale handle is still enqueued so the drain
    /// reports it.
    pub fn destroy_node(&mut self, registry: &mut Registry, id: NodeId) {
        let _ = registry.release_node(id);
        self.push(Command::DestroyNode(id));
    }

    /// Enqueues an attach.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) {
        self.push(Command::Attach { child, parent });
    }

    /// Enqueues a detach.
    pub fn detach(&mut self, child: NodeId) {
        self.push(Command::Detach(child));
    }

    /// Enqueues a node property write.
    pub fn set_node(&mut self, node: NodeId, value: NodeValue, mode: WriteMode) {
        self.push(Command::SetNode { node, value, mode });
    }

    /// Reserves a renderer handle and enqueues its creation.
    pub fn create_renderer(&mut self, registry: &mut Registry) -> RendererId {
        let id = registry.reserve_renderer();
        self.push(Command::CreateRenderer(id));
        id
    }

    /// Releases a renderer handle and enqueues its destruction.
    pub fn destroy_renderer(&mut self, registry: &mut Registry, id: RendererId) {
        let _ = registry.release_renderer(id);
        self.push(Command::DestroyRenderer(id));
    }

    /// Enqueues adding a renderer to a node.
    pub fn add_renderer(&mut self, node: NodeId, renderer: RendererId) {
        self.push(Command::AddRenderer { node, renderer });
    }

    /// Enqueues removing a renderer from a node.
    pub fn remove_renderer(&mut self, node: NodeId, renderer: RendererId) {
        self.push(Command::RemoveRenderer { node, renderer });
    }

    /// Enqueues a renderer property write.
    pub fn set_renderer(&mut self, renderer: RendererId, value: RendererValue, mode: WriteMode) {
        self.push(Command::SetRenderer {
            renderer,
            value,
            mode,
        });
    }

    /// Reserves a resource handle and enqueues its creation.
    pub fn create_resource(&mut self, registry: &mut Registry, desc: ResourceDesc) -> ResourceId {
        let resource = registry.reserve_resource();
        self.push(Command::CreateResource { resource, desc });
        resource
    }

    /// Enqueues a resource update.
    pub fn update_resource(&mut self, resource: ResourceId, desc: ResourceDesc) {
        self.push(Command::UpdateResource { resource, desc });
    }

    /// Releases a resource handle and enqueues its destruction.
    pub fn destroy_resource(&mut self, registry: &mut Registry, id: ResourceId) {
        let _ = registry.release_resource(id);
        self.push(Command::DestroyResource(id));
    }

    /// Enqueues a closure to run on the update stage.
    pub fn callback(&mut self, f: impl FnOnce(&mut Scene, BufferIndex) + Send + 'static) {
        self.push(Command::Callback(Box::new(f)));
    }
}
