// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The update cycle driver.
//!
//! [`UpdateDriver`] owns the [`Scene`] and the buffer index, and runs one
//! update cycle per call to [`update`](UpdateDriver::update):
//!
//! ```text
//!  Idle ──► Draining ──► Updating ──► Building ──► Flipped ──► Handoff ──► Idle
//!           (reset +     (evaluate    (instruction  (index     (render
//!            commands)    world        list +        flipped)   side reads
//!                         state)       resync)                  the frame)
//! ```
//!
//! Every write of the cycle targets the *update* index. The flip at the end
//! of the cycle is the only point where the index changes; afterwards the
//! slot just written is the *stable* index and the next cycle writes the
//! other one.
//!
//! The handoff is either borrowed ([`begin_frame`](UpdateDriver::begin_frame)
//! returns a [`RenderFrame`] guard that blocks the next cycle until dropped)
//! or moved ([`swap_frame`](UpdateDriver::swap_frame) exchanges the built
//! frame for a recycled one, for consumers on another thread).

use core::mem;

use crate::buffer::BufferIndex;
use crate::command::{CommandBuffer, DrainStats};
use crate::config::UpdateConfig;
use crate::consumer::RenderConsumer;
use crate::frame::{Frame, Resync};
use crate::instruction::InstructionList;
use crate::scene::Scene;
use crate::trace::{
    BuildEvent, DrainEvent, FlipEvent, FrameBeginEvent, FrameSummaryBuilder, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, Tracer,
};

#[cfg(feature = "trace-rich")]
use alloc::vec::Vec;

#[cfg(feature = "trace-rich")]
use crate::trace::{ChangeKind, ObjectChange};

/// Where the driver is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleState {
    /// Waiting for the next cycle.
    Idle,
    /// Applying queued commands.
    Draining,
    /// Recomputing derived state.
    Updating,
    /// Building the instruction list.
    Building,
    /// The index has flipped; a frame is ready for handoff.
    Flipped,
    /// The render side is reading the frame.
    Handoff,
}

/// Runs the per-frame update cycle.
#[derive(Debug)]
pub struct UpdateDriver {
    scene: Scene,
    config: UpdateConfig,
    update_index: BufferIndex,
    frame_index: u64,
    state: CycleState,
    frame: Frame,
    last_instruction_count: usize,
    #[cfg(feature = "trace-rich")]
    changes: Vec<ObjectChange>,
}

impl Default for UpdateDriver {
    fn default() -> Self {
        Self::new(UpdateConfig::default())
    }
}

impl UpdateDriver {
    /// Creates a driver with an empty scene.
    ///
    /// The first cycle writes [`BufferIndex::ONE`], so the stable index
    /// after `n` cycles is `n mod 2`.
    #[must_use]
    pub fn new(config: UpdateConfig) -> Self {
        Self {
            scene: Scene::new(),
            config,
            update_index: BufferIndex::ONE,
            frame_index: 0,
            state: CycleState::Idle,
            frame: Frame {
                instructions: InstructionList::with_capacity(config.instruction_capacity),
                ..Frame::default()
            },
            last_instruction_count: 0,
            #[cfg(feature = "trace-rich")]
            changes: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Returns the scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Returns the index the next cycle will write.
    #[must_use]
    pub fn update_index(&self) -> BufferIndex {
        self.update_index
    }

    /// Returns the index written by the last completed cycle.
    #[must_use]
    pub fn stable_index(&self) -> BufferIndex {
        self.update_index.other()
    }

    /// Returns the number of completed cycles.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns the cycle state.
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Returns the most recently built frame.
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Runs one update cycle: reset, drain `commands`, evaluate, build, and
    /// flip.
    ///
    /// A frame left unread since the previous cycle is overwritten.
    ///
    /// # Panics
    ///
    /// Panics if called while a cycle is in progress.
    pub fn update(&mut self, commands: &mut CommandBuffer, tracer: &mut Tracer<'_>) -> &Frame {
        assert!(
            matches!(self.state, CycleState::Idle | CycleState::Flipped),
            "update cycle started in state {:?}",
            self.state
        );
        let frame_index = self.frame_index;
        let update = self.update_index;
        let mut summary = FrameSummaryBuilder::new(frame_index);

        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            update_index: update,
        });
        self.frame.clear();

        // Reset
        self.state = CycleState::Draining;
        phase_begin(tracer, frame_index, PhaseKind::Reset);
        let resets = self.scene.begin_update(update);
        phase_end(tracer, frame_index, PhaseKind::Reset);
        summary.resets(resets);

        // Drain
        phase_begin(tracer, frame_index, PhaseKind::Drain);
        let mut drain = DrainStats::default();
        for command in commands.drain() {
            drain.record(self.scene.apply(command, update));
        }
        phase_end(tracer, frame_index, PhaseKind::Drain);
        tracer.drain(&DrainEvent::new(frame_index, &drain));
        summary.drain(&drain);

        // Update
        self.state = CycleState::Updating;
        phase_begin(tracer, frame_index, PhaseKind::Update);
        let evaluate = self.scene.evaluate(update);
        phase_end(tracer, frame_index, PhaseKind::Update);
        summary.evaluate(&evaluate);

        // Build
        self.state = CycleState::Building;
        phase_begin(tracer, frame_index, PhaseKind::Build);
        let build = self.frame.instructions.build(
            &self.scene,
            update,
            self.config.viewport,
            self.last_instruction_count,
        );
        self.last_instruction_count = build.instructions;
        self.scene.collect_resync(update, &mut self.frame.resync);
        phase_end(tracer, frame_index, PhaseKind::Build);
        tracer.build(&BuildEvent::new(frame_index, &build));
        summary.build(&build);
        summary.resync(self.frame.resync.len());
        #[cfg(feature = "trace-rich")]
        if tracer.is_active() {
            self.changes.clear();
            self.changes
                .extend(self.frame.resync.iter().map(|record| ObjectChange {
                    object: record.object(),
                    kind: match record {
                        Resync::Removed(_) => ChangeKind::Removed,
                        _ => ChangeKind::Resynced,
                    },
                }));
            tracer.object_changes(frame_index, &self.changes);
        }

        // Flip
        phase_begin(tracer, frame_index, PhaseKind::Flip);
        self.update_index.flip();
        self.frame_index += 1;
        self.state = CycleState::Flipped;
        phase_end(tracer, frame_index, PhaseKind::Flip);
        tracer.flip(&FlipEvent {
            frame_index,
            stable_index: update,
        });

        self.frame.frame_index = frame_index;
        self.frame.buffer_index = update;
        self.frame.drain = drain;
        self.frame.evaluate = evaluate;
        self.frame.build = build;
        tracer.frame_summary(&summary.finish(update));
        &self.frame
    }

    /// Hands the built frame to the render side by reference.
    ///
    /// The next cycle cannot start until the returned guard is dropped.
    ///
    /// # Panics
    ///
    /// Panics if no frame has been built since the last handoff.
    pub fn begin_frame(&mut self) -> RenderFrame<'_> {
        assert_eq!(
            self.state,
            CycleState::Flipped,
            "begin_frame without a freshly built frame"
        );
        self.state = CycleState::Handoff;
        RenderFrame { driver: self }
    }

    /// Hands the built frame to `consumer` and ends the handoff.
    pub fn present(&mut self, consumer: &mut dyn RenderConsumer) {
        let frame = self.begin_frame();
        consumer.consume(frame.frame());
    }

    /// Moves the built frame out, leaving `replacement` in its place.
    ///
    /// `replacement` is usually a frame returned by the render side, so its
    /// storage is reused. The driver is idle afterwards.
    ///
    /// # Panics
    ///
    /// Panics if no frame has been built since the last handoff.
    pub fn swap_frame(&mut self, replacement: Frame) -> Frame {
        assert_eq!(
            self.state,
            CycleState::Flipped,
            "swap_frame without a freshly built frame"
        );
        self.state = CycleState::Idle;
        mem::replace(&mut self.frame, replacement)
    }
}

/// Read access to a built frame, handed to the render side.
///
/// Dropping the guard ends the frame.
#[derive(Debug)]
pub struct RenderFrame<'a> {
    driver: &'a mut UpdateDriver,
}

impl RenderFrame<'_> {
    /// Returns the stable buffer index this frame was built into.
    #[must_use]
    pub fn buffer_index(&self) -> BufferIndex {
        self.driver.frame.buffer_index
    }

    /// Returns the ordered draw instructions.
    #[must_use]
    pub fn instructions(&self) -> &InstructionList {
        &self.driver.frame.instructions
    }

    /// Returns the resync records.
    #[must_use]
    pub fn resync(&self) -> &[Resync] {
        &self.driver.frame.resync
    }

    /// Returns the whole frame.
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.driver.frame
    }

    /// Returns the scene, for reads at [`buffer_index`](Self::buffer_index).
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.driver.scene
    }

    /// Ends the frame.
    pub fn end_frame(self) {}
}

impl Drop for RenderFrame<'_> {
    fn drop(&mut self) {
        self.driver.state = CycleState::Idle;
    }
}

#[inline]
fn phase_begin(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind) {
    tracer.phase_begin(&PhaseBeginEvent { frame_index, phase });
}

#[inline]
fn phase_end(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind) {
    tracer.phase_end(&PhaseEndEvent { frame_index, phase });
}

#[cfg(test)]
mod tests {
    use kurbo::Affine;

    use super::*;
    use crate::command::{NodeValue, RendererValue, WriteMode};
    use crate::id::{NodeId, ObjectRef, RendererId};
    use crate::registry::Registry;
    use crate::renderer::OpacityType;

    struct Harness {
        registry: Registry,
        commands: CommandBuffer,
        driver: UpdateDriver,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: Registry::new(),
                commands: CommandBuffer::new(),
                driver: UpdateDriver::default(),
            }
        }

        fn tick(&mut self) -> &Frame {
            self.driver.update(&mut self.commands, &mut Tracer::none())
        }

        /// Enqueues a node attached to the root with one renderer.
        fn drawable(&mut self) -> (NodeId, RendererId) {
            let node = self.commands.create_node(&mut self.registry);
            self.commands.attach(node, NodeId::ROOT);
            let renderer = self.commands.create_renderer(&mut self.registry);
            self.commands.add_renderer(node, renderer);
            (node, renderer)
        }
    }

    #[test]
    fn stable_index_alternates() {
        let mut h = Harness::new();
        assert_eq!(h.driver.stable_index(), BufferIndex::ZERO);
        for n in 1..=5_u64 {
            let _ = h.tick();
            let expected = if n % 2 == 0 {
                BufferIndex::ZERO
            } else {
                BufferIndex::ONE
            };
            assert_eq!(h.driver.stable_index(), expected);
            assert_eq!(h.driver.frame_index(), n);
        }
    }

    #[test]
    fn moving_a_parent_resyncs_its_children_in_both_indices() {
        let mut h = Harness::new();
        let parent = h.commands.create_node(&mut h.registry);
        h.commands.attach(parent, NodeId::ROOT);
        let child = h.commands.create_node(&mut h.registry);
        h.commands.attach(child, parent);
        for _ in 0..3 {
            let _ = h.tick();
        }
        assert!(h.tick().resync().is_empty(), "settled");

        let moved = Affine::translate((50.0, 0.0));
        h.commands
            .set_node(parent, NodeValue::Transform(moved), WriteMode::Bake);
        for _ in 0..2 {
            let frame = h.tick();
            let snapshot = frame.resync().iter().find_map(|r| match r {
                Resync::Node(s) if s.id == child => Some(s),
                _ => None,
            });
            assert_eq!(
                snapshot.map(|s| s.world_transform),
                Some(moved),
                "child resynced at frame {}",
                frame.frame_index()
            );
        }
        assert!(h.tick().resync().is_empty());
    }

    #[test]
    fn opacity_scenario() {
        let mut h = Harness::new();
        let (a, _) = h.drawable();
        h.commands.set_node(a, NodeValue::Opacity(1.0), WriteMode::Bake);

        let frame = h.tick();
        assert_eq!(frame.instructions().len(), 1);
        let inst = frame.instructions().get(0).unwrap();
        assert_eq!(inst.node, a);
        assert_eq!(inst.opacity, 1.0);

        h.commands.set_node(a, NodeValue::Opacity(0.0), WriteMode::Bake);
        let stable = h.driver.stable_index();
        assert_eq!(h.driver.scene().nodes().opacity(a, stable), 1.0);

        let frame = h.tick();
        assert!(frame.instructions().is_empty());
        assert_eq!(frame.build_stats().transparent, 1);
        let stable = h.driver.stable_index();
        assert_eq!(h.driver.scene().nodes().opacity(a, stable), 0.0);
        assert_eq!(h.driver.scene().nodes().world_opacity(a, stable), 0.0);
    }

    #[test]
    fn write_in_cycle_is_invisible_at_stable_index() {
        let mut h = Harness::new();
        let (a, _) = h.drawable();
        let _ = h.tick();
        let stable = h.driver.stable_index();

        h.commands.callback(move |scene, update| {
            let _ = scene.apply(
                crate::command::Command::SetNode {
                    node: a,
                    value: NodeValue::Transform(Affine::scale(3.0)),
                    mode: WriteMode::Bake,
                },
                update,
            );
            assert_eq!(
                scene.nodes().transform(a, update.other()),
                Affine::IDENTITY,
                "stable slot untouched before the flip"
            );
        });
        let _ = h.tick();
        assert_eq!(h.driver.scene().nodes().transform(a, stable), Affine::IDENTITY);
        assert_eq!(
            h.driver
                .scene()
                .nodes()
                .world_transform(a, h.driver.stable_index()),
            Affine::scale(3.0)
        );
    }

    #[test]
    fn baked_value_reaches_both_slots() {
        let mut h = Harness::new();
        let (a, _) = h.drawable();
        h.commands.set_node(a, NodeValue::Depth(4.0), WriteMode::Bake);
        let _ = h.tick();
        let _ = h.tick();
        let nodes = h.driver.scene().nodes();
        assert_eq!(nodes.depth(a, BufferIndex::ZERO), 4.0);
        assert_eq!(nodes.depth(a, BufferIndex::ONE), 4.0);
        assert_eq!(nodes.world_depth(a, BufferIndex::ZERO), 4.0);
        assert_eq!(nodes.world_depth(a, BufferIndex::ONE), 4.0);
    }

    #[test]
    fn direct_write_is_frame_local() {
        let mut h = Harness::new();
        let (a, r) = h.drawable();
        let _ = h.tick();

        h.commands
            .set_renderer(r, RendererValue::Opacity(0.5), WriteMode::Set);
        let frame = h.tick();
        assert_eq!(
            frame.instructions().get(0).unwrap().opacity_type,
            OpacityType::Translucent
        );

        let _ = h.tick();
        let frame = h.tick();
        let inst = frame.instructions().get(0).unwrap();
        assert_eq!(inst.node, a);
        assert_eq!(inst.opacity, 1.0, "reverted to base");
    }

    #[test]
    fn destroyed_target_drains_cleanly() {
        let mut h = Harness::new();
        let (a, _) = h.drawable();
        let _ = h.tick();

        h.commands.destroy_node(&mut h.registry, a);
        h.commands.set_node(a, NodeValue::Opacity(0.3), WriteMode::Bake);
        h.commands.attach(a, NodeId::ROOT);
        let frame = h.tick();
        let stats = frame.drain_stats();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.dangling, 2);
        assert!(frame.instructions().is_empty());
        assert!(h.commands.is_empty());
    }

    #[test]
    fn resync_reaches_both_indices_then_stops() {
        let mut h = Harness::new();
        let (a, _) = h.drawable();
        let touches = |frame: &Frame| {
            frame
                .resync()
                .iter()
                .any(|r| r.object() == ObjectRef::Node(a))
        };

        assert!(touches(h.tick()));
        assert!(touches(h.tick()), "reverse index resyncs next frame");
        assert!(!touches(h.tick()));

        h.commands.destroy_node(&mut h.registry, a);
        let frame = h.tick();
        assert!(
            frame
                .resync()
                .contains(&Resync::Removed(ObjectRef::Node(a)))
        );
    }

    #[test]
    fn quiescent_frame_reuses_instruction_storage() {
        let mut h = Harness::new();
        for _ in 0..100 {
            let _ = h.drawable();
        }
        let _ = h.tick();
        let capacity = h.driver.frame().instructions().capacity();
        for _ in 0..3 {
            let frame = h.tick();
            assert_eq!(frame.instructions().len(), 100);
            assert!(frame.resync().is_empty() || frame.frame_index() < 2);
        }
        assert_eq!(h.driver.frame().instructions().capacity(), capacity);
    }

    #[test]
    fn render_frame_guard_returns_to_idle() {
        let mut h = Harness::new();
        let _ = h.drawable();
        let _ = h.tick();
        assert_eq!(h.driver.state(), CycleState::Flipped);
        {
            let frame = h.driver.begin_frame();
            assert_eq!(frame.buffer_index(), BufferIndex::ONE);
            assert_eq!(frame.instructions().len(), 1);
            frame.end_frame();
        }
        assert_eq!(h.driver.state(), CycleState::Idle);
    }

    #[test]
    #[should_panic(expected = "begin_frame without a freshly built frame")]
    fn begin_frame_twice_panics() {
        let mut h = Harness::new();
        let _ = h.tick();
        drop(h.driver.begin_frame());
        let _ = h.driver.begin_frame();
    }

    #[test]
    fn swap_frame_moves_frame_out() {
        let mut h = Harness::new();
        let _ = h.drawable();
        let _ = h.tick();
        let built = h.driver.swap_frame(Frame::new());
        assert_eq!(built.instructions().len(), 1);
        assert_eq!(built.buffer_index(), BufferIndex::ONE);
        assert_eq!(h.driver.state(), CycleState::Idle);

        let frame = h.tick();
        assert_eq!(frame.instructions().len(), 1);
        assert_eq!(frame.buffer_index(), BufferIndex::ZERO);
    }

    #[test]
    fn present_hands_frame_to_consumer() {
        struct Counter(usize);
        impl RenderConsumer for Counter {
            fn consume(&mut self, frame: &Frame) {
                self.0 += frame.instructions().len();
            }
        }

        let mut h = Harness::new();
        let _ = h.drawable();
        let _ = h.drawable();
        let _ = h.tick();
        let mut consumer = Counter(0);
        h.driver.present(&mut consumer);
        assert_eq!(consumer.0, 2);
        assert_eq!(h.driver.state(), CycleState::Idle);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn phases_are_traced_in_order() {
        use alloc::vec::Vec;

        use crate::trace::{FrameSummary, TraceSink};

        #[derive(Default)]
        struct Sink {
            phases: Vec<PhaseKind>,
            summaries: Vec<FrameSummary>,
        }
        impl TraceSink for Sink {
            fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
                self.phases.push(e.phase);
            }
            fn on_frame_summary(&mut self, s: &FrameSummary) {
                self.summaries.push(*s);
            }
        }

        let mut h = Harness::new();
        let _ = h.drawable();
        let mut sink = Sink::default();
        let _ = h.driver.update(&mut h.commands, &mut Tracer::new(&mut sink));
        assert_eq!(sink.phases, PhaseKind::ALL);
        assert_eq!(sink.summaries.len(), 1);
        assert_eq!(sink.summaries[0].applied, 4);
        assert_eq!(sink.summaries[0].instructions, 1);
        assert_eq!(sink.summaries[0].stable_index, BufferIndex::ONE);
    }
}
