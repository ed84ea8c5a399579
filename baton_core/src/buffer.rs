// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-buffered storage selected by a one-bit frame index.
//!
//! Every mutable field of a scene object lives in two slots. During a frame
//! the update stage owns the slot at the *update* index and the render stage
//! reads the slot at the *stable* index; the two roles swap once per frame
//! when the [`UpdateDriver`](crate::driver::UpdateDriver) flips its index.
//!
//! Three building blocks live here:
//!
//! - [`DoubleBuffered`] — two plain slots, used for derived state that is
//!   recomputed every time it is dirty (world transform, world opacity).
//! - [`Property`] — two slots plus a persistent base value and a 2-bit reset
//!   state. Supports the *direct* ([`set`](Property::set)) and *baked*
//!   ([`bake`](Property::bake)) write disciplines.
//! - [`ResendFlags`] — the per-object, per-index marker telling the render
//!   side which buffer still has to be resynchronized.

use core::fmt;

/// Selects one of the two slots of a double-buffered value.
///
/// Only the driver ever flips the index; everything else receives it by
/// value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferIndex(u8);

impl BufferIndex {
    /// Slot 0.
    pub const ZERO: Self = Self(0);
    /// Slot 1.
    pub const ONE: Self = Self(1);

    /// Returns the slot number (0 or 1).
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Returns the opposite slot.
    #[inline]
    #[must_use]
    pub const fn other(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Swaps to the opposite slot.
    #[inline]
    pub(crate) fn flip(&mut self) {
        self.0 ^= 1;
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << self.0
    }
}

impl fmt::Debug for BufferIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferIndex({})", self.0)
    }
}

/// A value stored in two slots, one per buffer index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoubleBuffered<T> {
    slots: [T; 2],
}

impl<T: Copy> DoubleBuffered<T> {
    /// Creates a value with both slots initialized to `value`.
    #[inline]
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            slots: [value, value],
        }
    }

    /// Reads the slot at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: BufferIndex) -> T {
        self.slots[index.get()]
    }

    /// Writes the slot at `index`, leaving the other slot untouched.
    #[inline]
    pub fn set(&mut self, index: BufferIndex, value: T) {
        self.slots[index.get()] = value;
    }

    /// Writes both slots. Only valid while no reader is bound to either.
    #[inline]
    pub(crate) fn fill(&mut self, value: T) {
        self.slots = [value, value];
    }
}

const CLEAN: u8 = 0b00;
const BAKED: u8 = 0b01;
const SET: u8 = 0b10;

/// A double-buffered property with a persistent base value.
///
/// The reset state counts how many upcoming frames still have to copy the
/// base value into their writable slot:
///
/// | write      | writable slot | base    | resets pending |
/// |------------|---------------|---------|----------------|
/// | `bake(v)`  | `v`           | `v`     | 1              |
/// | `set(v)`   | `v`           | unchanged | 2            |
///
/// [`reset_to_base`](Self::reset_to_base) runs at the start of every update
/// and shifts the state right. A baked value therefore reaches the other slot
/// on the following frame, and a direct value is visible for the frame it was
/// written in before both slots fall back to the base value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Property<T> {
    values: DoubleBuffered<T>,
    base: T,
    reset: u8,
}

impl<T: Copy + PartialEq> Property<T> {
    /// Creates a clean property with both slots and the base set to `value`.
    #[inline]
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            values: DoubleBuffered::new(value),
            base: value,
            reset: CLEAN,
        }
    }

    /// Reads the slot at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: BufferIndex) -> T {
        self.values.get(index)
    }

    /// Returns the persistent base value.
    #[inline]
    #[must_use]
    pub fn base(&self) -> T {
        self.base
    }

    /// Direct write: `value` is visible to re-reads of `update` for this frame
    /// only. The base value is not changed.
    #[inline]
    pub fn set(&mut self, update: BufferIndex, value: T) {
        self.values.set(update, value);
        self.reset = SET;
    }

    /// Baked write: `value` becomes the persistent value. The slot opposite to
    /// `update` keeps its old value until the next frame's reset.
    #[inline]
    pub fn bake(&mut self, update: BufferIndex, value: T) {
        self.values.set(update, value);
        self.base = value;
        self.reset = BAKED;
    }

    /// Copies the base value into the slot at `update` if a reset is pending.
    ///
    /// Returns `true` if the slot's value changed.
    #[inline]
    pub fn reset_to_base(&mut self, update: BufferIndex) -> bool {
        if self.reset == CLEAN {
            return false;
        }
        let changed = self.values.get(update) != self.base;
        self.values.set(update, self.base);
        self.reset >>= 1;
        changed
    }

    /// Returns `true` when no reset is pending.
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.reset == CLEAN
    }

    /// Reinitializes the property for a recycled object slot.
    #[inline]
    pub(crate) fn reinit(&mut self, value: T) {
        *self = Self::new(value);
    }
}

/// Per-object marker for render-side resynchronization.
///
/// One bit per buffer index. A change marks both bits; each frame
/// [`take`](Self::take)s the bit for its own update index, so the change is
/// pushed exactly once for the buffer being built now and once for the
/// buffer built on the following frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResendFlags(u8);

impl ResendFlags {
    /// No resend pending.
    pub const CLEAN: Self = Self(0);

    /// Marks both buffer indices.
    #[inline]
    pub fn mark(&mut self) {
        self.0 = BufferIndex::ZERO.bit() | BufferIndex::ONE.bit();
    }

    /// Marks a single buffer index.
    #[inline]
    pub fn mark_index(&mut self, index: BufferIndex) {
        self.0 |= index.bit();
    }

    /// Consumes the bit for `index`, returning whether it was set.
    ///
    /// The bit for the reverse index is left as is.
    #[inline]
    pub fn take(&mut self, index: BufferIndex) -> bool {
        let was_set = self.is_set(index);
        self.0 &= !index.bit();
        was_set
    }

    /// Returns whether the bit for `index` is set.
    #[inline]
    #[must_use]
    pub const fn is_set(self, index: BufferIndex) -> bool {
        self.0 & index.bit() != 0
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_clean(self) -> bool {
        self.0 == 0
    }

    /// Clears both bits.
    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl fmt::Debug for ResendFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResendFlags({:#04b})", self.0)
    }
}
