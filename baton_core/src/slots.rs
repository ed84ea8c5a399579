// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generation-checked slot table for scene-side object storage.

use alloc::vec::Vec;

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A table of optional values addressed by `(index, generation)` pairs.
///
/// Indices are chosen by the producer-side [`Registry`](crate::registry::Registry);
/// the table grows on demand to accommodate them.
#[derive(Clone, Debug)]
pub(crate) struct SlotTable<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> SlotTable<T> {
    /// Stores `value` at `idx` under `generation`.
    ///
    /// Returns `false` and drops `value` if the slot is occupied.
    pub(crate) fn insert(&mut self, idx: u32, generation: u32, value: T) -> bool {
        let i = idx as usize;
        if i >= self.slots.len() {
            self.slots.resize_with(i + 1, || Slot {
                generation: 0,
                value: None,
            });
        }
        let slot = &mut self.slots[i];
        if slot.value.is_some() {
            return false;
        }
        slot.generation = generation;
        slot.value = Some(value);
        true
    }

    pub(crate) fn get(&self, idx: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(idx as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, idx: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(idx as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub(crate) fn contains(&self, idx: u32, generation: u32) -> bool {
        self.get(idx, generation).is_some()
    }

    /// Removes and returns the value if `(idx, generation)` is live.
    pub(crate) fn remove(&mut self, idx: u32, generation: u32) -> Option<T> {
        self.slots
            .get_mut(idx as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.take())
    }

    /// Iterates live entries mutably as `(index, generation, value)`.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u32, u32, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "slot indices originate from u32 handles"
            )]
            let idx = i as u32;
            let generation = slot.generation;
            slot.value.as_mut().map(|v| (idx, generation, v))
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value.is_some()).count()
    }
}
