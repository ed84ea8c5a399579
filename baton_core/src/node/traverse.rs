// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::store::NodeStore;
use crate::id::{INVALID, NodeId};

/// An iterator over the direct children of a node.
///
/// Created by [`NodeStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a NodeStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a NodeStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(NodeId::new(idx, self.store.generation[idx as usize]))
    }
}

impl NodeStore {
    /// Returns the current traversal order (depth-first pre-order from the
    /// root) as raw slot indices.
    ///
    /// Nodes that are not connected to the root are not part of the order.
    /// Refreshed by each update's evaluation pass.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    /// Rebuilds the depth-first pre-order traversal from the root.
    pub(crate) fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        let mut stack = alloc::vec![NodeId::ROOT.idx];
        while let Some(idx) = stack.pop() {
            self.traversal_order.push(idx);
            // Reverse the pushed children so the first child pops first.
            let start = stack.len();
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
            stack[start..].reverse();
        }
    }
}
