// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared render resources: geometries, shaders, and texture sets.
//!
//! Resources carry only the metadata the update stage needs to classify and
//! order drawables. Their GPU-side contents belong to the render consumer.
//!
//! Every resource keeps a list of the renderers that reference it. Updating
//! a resource marks each consumer for resync; destroying it clears each
//! consumer's reference first.

use alloc::vec::Vec;

use crate::buffer::ResendFlags;
use crate::command::Rejection;
use crate::id::{RendererId, ResourceId};
use crate::slots::SlotTable;

/// What a resource is, plus the hints used for opacity classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceDesc {
    /// Vertex and index data.
    Geometry,
    /// A shader program.
    Shader {
        /// The shader may write alpha below one.
        output_is_transparent: bool,
    },
    /// A set of textures and samplers.
    TextureSet {
        /// At least one texture has an alpha channel.
        has_alpha: bool,
    },
}

impl ResourceDesc {
    /// Returns whether drawing with this resource requires blending.
    #[must_use]
    pub const fn is_translucent(self) -> bool {
        match self {
            Self::Geometry => false,
            Self::Shader {
                output_is_transparent,
            } => output_is_transparent,
            Self::TextureSet { has_alpha } => has_alpha,
        }
    }
}

/// A copy of one resource's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSnapshot {
    /// The resource.
    pub id: ResourceId,
    /// Its description.
    pub desc: ResourceDesc,
    /// Number of renderers referencing it.
    pub consumers: usize,
}

#[derive(Clone, Debug)]
pub(crate) struct ResourceRecord {
    pub(crate) desc: ResourceDesc,
    pub(crate) consumers: Vec<RendererId>,
    pub(crate) resend: ResendFlags,
}

/// Storage for all resources.
#[derive(Debug, Default)]
pub struct ResourceStore {
    pub(crate) table: SlotTable<ResourceRecord>,
}

impl ResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the handle refers to a live resource.
    #[must_use]
    pub fn is_alive(&self, id: ResourceId) -> bool {
        self.table.contains(id.idx, id.generation)
    }

    /// Returns the number of live resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns whether no resource is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the description of a live resource.
    #[must_use]
    pub fn desc(&self, id: ResourceId) -> Option<ResourceDesc> {
        self.table.get(id.idx, id.generation).map(|r| r.desc)
    }

    /// Returns the renderers referencing a live resource.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn consumers(&self, id: ResourceId) -> &[RendererId] {
        match self.table.get(id.idx, id.generation) {
            Some(r) => &r.consumers,
            None => panic!("stale ResourceId: {id:?}"),
        }
    }

    /// Returns whether `id` is live and requires blending.
    ///
    /// Stale handles are treated as opaque.
    #[must_use]
    pub fn is_translucent(&self, id: Option<ResourceId>) -> bool {
        id.and_then(|id| self.desc(id))
            .is_some_and(ResourceDesc::is_translucent)
    }

    /// Returns a copy of a live resource's state.
    #[must_use]
    pub fn snapshot(&self, id: ResourceId) -> Option<ResourceSnapshot> {
        let r = self.table.get(id.idx, id.generation)?;
        Some(ResourceSnapshot {
            id,
            desc: r.desc,
            consumers: r.consumers.len(),
        })
    }

    // -- Mutation (driven by `Scene::apply`) --

    pub(crate) fn create(&mut self, id: ResourceId, desc: ResourceDesc) -> Result<(), Rejection> {
        let mut resend = ResendFlags::CLEAN;
        resend.mark();
        let record = ResourceRecord {
            desc,
            consumers: Vec::new(),
            resend,
        };
        if self.table.insert(id.idx, id.generation, record) {
            Ok(())
        } else {
            Err(Rejection::AlreadyExists)
        }
    }

    /// Replaces the description. Returns the consumers to resync, or `None`
    /// for a stale handle.
    pub(crate) fn update(&mut self, id: ResourceId, desc: ResourceDesc) -> Option<&[RendererId]> {
        let r = self.table.get_mut(id.idx, id.generation)?;
        r.desc = desc;
        r.resend.mark();
        Some(&r.consumers)
    }

    /// Removes a resource. Returns its consumers, or `None` for a stale handle.
    pub(crate) fn destroy(&mut self, id: ResourceId) -> Option<Vec<RendererId>> {
        self.table
            .remove(id.idx, id.generation)
            .map(|r| r.consumers)
    }

    /// Records that `renderer` gained one reference to `id`.
    pub(crate) fn add_consumer(&mut self, id: ResourceId, renderer: RendererId) {
        if let Some(r) = self.table.get_mut(id.idx, id.generation) {
            r.consumers.push(renderer);
        }
    }

    /// Records that `renderer` dropped one reference to `id`.
    pub(crate) fn remove_consumer(&mut self, id: ResourceId, renderer: RendererId) {
        if let Some(r) = self.table.get_mut(id.idx, id.generation)
            && let Some(pos) = r.consumers.iter().position(|&c| c == renderer)
        {
            r.consumers.swap_remove(pos);
        }
    }
}
