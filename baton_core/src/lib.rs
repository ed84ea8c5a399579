// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-buffered scene graph with a deferred command queue.
//!
//! `baton_core` separates scene mutation from rendering. Producers never
//! touch the scene: they enqueue [`Command`](command::Command)s. Once per
//! frame the update stage drains the queue, recomputes derived state, and
//! builds a self-contained list of draw instructions that the render stage
//! reads while the update stage already works on the next frame. It is
//! `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   Producers (any thread)
//!       │  create_* / attach / set_* / destroy_*
//!       ▼
//!   CommandBuffer ──► UpdateDriver::update()
//!                         │ reset ─► drain ─► evaluate ─► build ─► flip
//!                         ▼
//!                       Frame (instructions + resync records)
//!                         │
//!                         ▼
//!                   RenderConsumer::consume()
//! ```
//!
//! **[`buffer`]** — Two-slot storage selected by a [`BufferIndex`](buffer::BufferIndex),
//! the [`Property`](buffer::Property) reset-to-base model, and per-object
//! resend flags.
//!
//! **[`command`]** — The closed set of mutation commands, write disciplines,
//! and the reusable FIFO [`CommandBuffer`](command::CommandBuffer).
//!
//! **[`registry`]** — Producer-side generational handle reservation.
//!
//! **[`node`]**, **[`renderer`]**, **[`resource`]** — Scene object storage.
//! Nodes form the tree; renderers attach to nodes; resources are shared by
//! renderers.
//!
//! **[`dirty`]** — Dirty channels via `understory_dirty`. TRANSFORM and
//! OPACITY propagate to descendants; TOPOLOGY triggers a traversal rebuild.
//!
//! **[`scene`]** — The [`Scene`](scene::Scene) aggregate and command
//! application.
//!
//! **[`instruction`]** — Per-frame instruction list construction and
//! ordering.
//!
//! **[`driver`]** — The [`UpdateDriver`](driver::UpdateDriver) cycle and
//! buffer flip; **[`frame`]** is its output and **[`consumer`]** the render
//! side contract.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! update-cycle instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-object
//!   change events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod buffer;
pub mod command;
pub mod config;
pub mod consumer;
pub mod dirty;
pub mod driver;
pub mod frame;
pub mod id;
pub mod instruction;
pub mod node;
pub mod registry;
pub mod renderer;
pub mod resource;
pub mod scene;
pub mod trace;

mod slots;
