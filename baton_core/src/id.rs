// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene object identity types.

use core::fmt;

/// Sentinel value indicating "no object" in index fields.
pub const INVALID: u32 = u32::MAX;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            /// Slot index into the owning table.
            pub(crate) idx: u32,
            /// Generation counter; must match the table's generation for this slot.
            pub(crate) generation: u32,
        }

        impl $name {
            #[inline]
            pub(crate) const fn new(idx: u32, generation: u32) -> Self {
                Self { idx, generation }
            }

            /// Returns the raw slot index (for diagnostics only).
            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.idx
            }

            /// Returns the generation counter.
            #[inline]
            #[must_use]
            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({}@gen{})"), self.idx, self.generation)
            }
        }
    };
}

handle! {
    /// A handle to a node in the scene graph.
    ///
    /// Contains both a slot index and a generation counter so that stale
    /// handles can be detected after the node is destroyed and the slot is
    /// reused.
    NodeId
}

handle! {
    /// A handle to a renderer attached to zero or more nodes.
    RendererId
}

handle! {
    /// A handle to a geometry, shader, or texture set.
    ResourceId
}

impl NodeId {
    /// The scene root. Always alive; cannot be attached, detached, or destroyed.
    pub const ROOT: Self = Self::new(0, 0);
}

/// A reference to any scene object, used in resync records and trace output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// A node.
    Node(NodeId),
    /// A renderer.
    Renderer(RendererId),
    /// A resource.
    Resource(ResourceId),
}

impl From<NodeId> for ObjectRef {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<RendererId> for ObjectRef {
    fn from(id: RendererId) -> Self {
        Self::Renderer(id)
    }
}

impl From<ResourceId> for ObjectRef {
    fn from(id: ResourceId) -> Self {
        Self::Resource(id)
    }
}
