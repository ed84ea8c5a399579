// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared command queue and its producer handle.

use std::mem;
use std::sync::{Arc, Mutex};

use baton_core::buffer::BufferIndex;
use baton_core::command::{Command, CommandBuffer, NodeValue, RendererValue, WriteMode};
use baton_core::config::UpdateConfig;
use baton_core::id::{NodeId, RendererId, ResourceId};
use baton_core::registry::Registry;
use baton_core::resource::ResourceDesc;
use baton_core::scene::Scene;

use crate::lock;

/// Handle registry and pending commands behind one lock.
///
/// Reserving a handle and enqueueing its command happen in the same critical
/// section, so a slot released by one producer can never be recreated ahead
/// of its destroy command.
#[derive(Debug)]
pub(crate) struct Queue {
    state: Mutex<QueueState>,
}

#[derive(Debug)]
struct QueueState {
    registry: Registry,
    commands: CommandBuffer,
}

impl Queue {
    pub(crate) fn new(config: &UpdateConfig) -> Self {
        Self {
            state: Mutex::new(QueueState {
                registry: Registry::new(),
                commands: config.command_buffer(),
            }),
        }
    }

    /// Exchanges the pending commands for `commands`, which should be empty.
    pub(crate) fn swap(&self, commands: &mut CommandBuffer) {
        debug_assert!(commands.is_empty(), "swapping in a non-empty buffer");
        mem::swap(&mut lock(&self.state).commands, commands);
    }
}

/// Enqueues commands from any thread.
///
/// Cloning is cheap; every clone feeds the same queue. Calls are
/// fire-and-forget: outcomes are reported in the drain statistics of the
/// frame that applies them.
#[derive(Clone, Debug)]
pub struct Producer {
    queue: Arc<Queue>,
}

impl Producer {
    pub(crate) fn new(queue: Arc<Queue>) -> Self {
        Self { queue }
    }

    /// Runs `f` with the queue locked.
    ///
    /// Everything `f` enqueues through the [`Batch`] lands contiguously in
    /// the queue.
    pub fn batch<R>(&self, f: impl FnOnce(&mut Batch<'_>) -> R) -> R {
        let mut state = lock(&self.queue.state);
        let QueueState { registry, commands } = &mut *state;
        f(&mut Batch { registry, commands })
    }

    /// Enqueues a raw command.
    ///
    /// Handles in `command` must come from this pipeline's registry.
    pub fn enqueue(&self, command: Command) {
        self.batch(|batch| batch.enqueue(command));
    }

    /// Returns the number of commands waiting for the next drain.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.queue.state).commands.len()
    }

    /// Returns whether no command is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves a node handle and enqueues its creation.
    pub fn create_node(&self) -> NodeId {
        self.batch(|batch| batch.create_node())
    }

    /// Releases a node handle and enqueues its destruction.
    pub fn destroy_node(&self, id: NodeId) {
        self.batch(|batch| batch.destroy_node(id));
    }

    /// Enqueues an attach, reparenting `child` if it already has a parent.
    pub fn attach(&self, child: NodeId, parent: NodeId) {
        self.batch(|batch| batch.attach(child, parent));
    }

    /// Enqueues a detach.
    pub fn detach(&self, child: NodeId) {
        self.batch(|batch| batch.detach(child));
    }

    /// Enqueues a node property write.
    pub fn set_node(&self, node: NodeId, value: NodeValue, mode: WriteMode) {
        self.batch(|batch| batch.set_node(node, value, mode));
    }

    /// Reserves a renderer handle and enqueues its creation.
    pub fn create_renderer(&self) -> RendererId {
        self.batch(|batch| batch.create_renderer())
    }

    /// Releases a renderer handle and enqueues its destruction.
    pub fn destroy_renderer(&self, id: RendererId) {
        self.batch(|batch| batch.destroy_renderer(id));
    }

    /// Enqueues adding a renderer to a node.
    pub fn add_renderer(&self, node: NodeId, renderer: RendererId) {
        self.batch(|batch| batch.add_renderer(node, renderer));
    }

    /// Enqueues removing a renderer from a node.
    pub fn remove_renderer(&self, node: NodeId, renderer: RendererId) {
        self.batch(|batch| batch.remove_renderer(node, renderer));
    }

    /// Enqueues a renderer property write.
    pub fn set_renderer(&self, renderer: RendererId, value: RendererValue, mode: WriteMode) {
        self.batch(|batch| batch.set_renderer(renderer, value, mode));
    }

    /// Reserves a resource handle and enqueues its creation.
    pub fn create_resource(&self, desc: ResourceDesc) -> ResourceId {
        self.batch(|batch| batch.create_resource(desc))
    }

    /// Enqueues a resource update.
    pub fn update_resource(&self, resource: ResourceId, desc: ResourceDesc) {
        self.batch(|batch| batch.update_resource(resource, desc));
    }

    /// Releases a resource handle and enqueues its destruction.
    pub fn destroy_resource(&self, id: ResourceId) {
        self.batch(|batch| batch.destroy_resource(id));
    }

    /// Enqueues a closure to run on the update stage during the drain.
    pub fn callback(&self, f: impl FnOnce(&mut Scene, BufferIndex) + Send + 'static) {
        self.batch(|batch| batch.callback(f));
    }
}

/// The locked queue as seen from inside [`Producer::batch`].
///
/// Commands can only be appended, and handles are reserved and released
/// together with the command that creates or destroys them.
#[derive(Debug)]
pub struct Batch<'a> {
    registry: &'a mut Registry,
    commands: &'a mut CommandBuffer,
}

impl Batch<'_> {
    /// Appends a raw command.
    pub fn enqueue(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Returns whether `id` names a node that has not been destroyed.
    #[must_use]
    pub fn is_node_live(&self, id: NodeId) -> bool {
        self.registry.is_node_live(id)
    }

    /// Returns whether `id` names a renderer that has not been destroyed.
    #[must_use]
    pub fn is_renderer_live(&self, id: RendererId) -> bool {
        self.registry.is_renderer_live(id)
    }

    /// Returns whether `id` names a resource that has not been destroyed.
    #[must_use]
    pub fn is_resource_live(&self, id: ResourceId) -> bool {
        self.registry.is_resource_live(id)
    }

    /// See [`Producer::create_node`].
    pub fn create_node(&mut self) -> NodeId {
        self.commands.create_node(self.registry)
    }

    /// See [`Producer::destroy_node`].
    pub fn destroy_node(&mut self, id: NodeId) {
        self.commands.destroy_node(self.registry, id);
    }

    /// See [`Producer::attach`].
    pub fn attach(&mut self, child: NodeId, parent: NodeId) {
        self.commands.attach(child, parent);
    }

    /// See [`Producer::detach`].
    pub fn detach(&mut self, child: NodeId) {
        self.commands.detach(child);
    }

    /// See [`Producer::set_node`].
    pub fn set_node(&mut self, node: NodeId, value: NodeValue, mode: WriteMode) {
        self.commands.set_node(node, value, mode);
    }

    /// See [`Producer::create_renderer`].
    pub fn create_renderer(&mut self) -> RendererId {
        self.commands.create_renderer(self.registry)
    }

    /// See [`Producer::destroy_renderer`].
    pub fn destroy_renderer(&mut self, id: RendererId) {
        self.commands.destroy_renderer(self.registry, id);
    }

    /// See [`Producer::add_renderer`].
    pub fn add_renderer(&mut self, node: NodeId, renderer: RendererId) {
        self.commands.add_renderer(node, renderer);
    }

    /// See [`Producer::remove_renderer`].
    pub fn remove_renderer(&mut self, node: NodeId, renderer: RendererId) {
        self.commands.remove_renderer(node, renderer);
    }

    /// See [`Producer::set_renderer`].
    pub fn set_renderer(&mut self, renderer: RendererId, value: RendererValue, mode: WriteMode) {
        self.commands.set_renderer(renderer, value, mode);
    }

    /// See [`Producer::create_resource`].
    pub fn create_resource(&mut self, desc: ResourceDesc) -> ResourceId {
        self.commands.create_resource(self.registry, desc)
    }

    /// See [`Producer::update_resource`].
    pub fn update_resource(&mut self, resource: ResourceId, desc: ResourceDesc) {
        self.commands.update_resource(resource, desc);
    }

    /// See [`Producer::destroy_resource`].
    pub fn destroy_resource(&mut self, id: ResourceId) {
        self.commands.destroy_resource(self.registry, id);
    }

    /// See [`Producer::callback`].
    pub fn callback(&mut self, f: impl FnOnce(&mut Scene, BufferIndex) + Send + 'static) {
        self.commands.callback(f);
    }
}
