// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Node-derived state is invalidated through multi-channel dirty tracking
//! (via [`understory_dirty`]). Each channel represents an independent
//! category of change.
//!
//! # Propagation semantics
//!
//! - **Propagating** — [`TRANSFORM`] and [`OPACITY`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and have dependency edges
//!   from child to parent. Marking a node dirty marks its whole subtree,
//!   because world transform, world opacity, world visibility, and world
//!   depth are inherited. Visibility and depth changes are routed through
//!   [`TRANSFORM`] so one drain recomputes all three.
//!
//! - **Structural** — [`TOPOLOGY`] is marked on attach, detach, create, and
//!   destroy. It triggers a traversal-order rebuild and does not propagate.
//!
//! # Double buffering
//!
//! A drain recomputes derived values into the *update* slot only. Marks that
//! originate from producer commands are therefore recorded and replayed on
//! the following frame, so the other slot is recomputed as well (see
//! [`NodeStore`](crate::node::NodeStore)). Marks raised by the per-frame
//! reset of buffered properties are not replayed.

use understory_dirty::Channel;

/// Transform, visibility, or depth changed; recompute world transform,
/// world visibility, and world depth for the subtree.
pub const TRANSFORM: Channel = Channel::new(0);

/// Opacity changed; recompute world opacity for the subtree.
pub const OPACITY: Channel = Channel::new(1);

/// Tree topology changed; rebuild traversal order.
pub const TOPOLOGY: Channel = Channel::new(2);
