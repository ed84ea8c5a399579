// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph nodes.
//!
//! A *node* is an element of the scene tree. Each node has:
//!
//! - An identity ([`NodeId`](crate::id::NodeId)), a generational handle that
//!   becomes stale when the node is destroyed.
//! - Topology: parent, first-child, and sibling links forming an ordered tree
//!   under [`NodeId::ROOT`](crate::id::NodeId::ROOT).
//! - **Local properties**, each a [`Property`](crate::buffer::Property):
//!   transform, opacity, visibility, depth, and local bounds.
//! - **World properties** recomputed by evaluation into the update slot:
//!   world transform (parent world × local), world opacity (parent × local),
//!   world visibility (parent && local), and world depth (parent + local).
//! - A list of attached renderers.
//!
//! Nodes are stored in struct-of-arrays layout. All mutation goes through
//! [`Scene::apply`](crate::scene::Scene::apply); the getters here take the
//! [`BufferIndex`](crate::buffer::BufferIndex) to read.

mod evaluate;
mod store;
mod traverse;

pub use evaluate::EvaluateStats;
pub use store::{NodeSnapshot, NodeStore};
pub use traverse::Children;
