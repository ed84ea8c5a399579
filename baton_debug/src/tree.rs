// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented node-tree dump.
//!
//! [`write_tree`] prints every node reachable from the root, one line per
//! node, with its local and world values at one buffer index:
//!
//! ```text
//! Node(0@gen0)
//!   Node(1@gen0) opacity=1.00/0.50 depth=0/0 translate=(10.0, 0.0)/(10.0, 0.0) renderers=[RendererId(0@gen0)]
//!     Node(2@gen0) opacity=0.50/0.25 depth=1/1 translate=(0.0, 0.0)/(10.0, 0.0) hidden
//! ```
//!
//! Values are printed as `local/world`.

use std::io::{self, Write};

use baton_core::buffer::BufferIndex;
use baton_core::id::NodeId;
use baton_core::scene::Scene;

/// Writes the node tree of `scene` at `index` to `writer`.
pub fn write_tree(scene: &Scene, index: BufferIndex, writer: &mut dyn Write) -> io::Result<()> {
    let nodes = scene.nodes();
    let mut stack = vec![(NodeId::ROOT, 0_usize)];
    let mut children = Vec::new();

    while let Some((id, level)) = stack.pop() {
        write!(writer, "{:indent$}{id:?}", "", indent = level * 2)?;
        if id != NodeId::ROOT {
            let local = nodes.transform(id, index).translation();
            let world = nodes.world_transform(id, index).translation();
            write!(
                writer,
                " opacity={:.2}/{:.2} depth={}/{} translate=({:.1}, {:.1})/({:.1}, {:.1})",
                nodes.opacity(id, index),
                nodes.world_opacity(id, index),
                nodes.depth(id, index),
                nodes.world_depth(id, index),
                local.x,
                local.y,
                world.x,
                world.y,
            )?;
            let renderers = nodes.renderers(id);
            if !renderers.is_empty() {
                write!(writer, " renderers={renderers:?}")?;
            }
            if !nodes.world_visible(id, index) {
                write!(writer, " hidden")?;
            }
        }
        writeln!(writer)?;

        children.clear();
        children.extend(nodes.children(id));
        stack.extend(children.iter().rev().map(|&child| (child, level + 1)));
    }
    Ok(())
}

/// Returns the dump produced by [`write_tree`] as a string.
#[must_use]
pub fn tree_string(scene: &Scene, index: BufferIndex) -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_tree(scene, index, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}
