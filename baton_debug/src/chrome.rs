// Copyright 2026 the Baton Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become duration events; everything else is an instant event with
/// its counters in `args`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = nanos_to_us(record.nanos);
        let event = match record.event {
            RecordedEvent::FrameBegin(e) => instant(
                "FrameBegin",
                "Frame",
                ts,
                json!({
                    "frame_index": e.frame_index,
                    "update_index": e.update_index.get(),
                }),
            ),
            RecordedEvent::PhaseBegin(e) => json!({
                "ph": "B",
                "name": e.phase.name(),
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            }),
            RecordedEvent::PhaseEnd(e) => json!({
                "ph": "E",
                "name": e.phase.name(),
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            }),
            RecordedEvent::Drain(e) => instant(
                "Drain",
                "Frame",
                ts,
                json!({
                    "frame_index": e.frame_index,
                    "applied": e.applied,
                    "dangling": e.dangling,
                    "rejected": e.rejected,
                }),
            ),
            RecordedEvent::Build(e) => instant(
                "Build",
                "Frame",
                ts,
                json!({
                    "frame_index": e.frame_index,
                    "instructions": e.instructions,
                    "transparent": e.transparent,
                    "culled": e.culled,
                    "invisible": e.invisible,
                }),
            ),
            RecordedEvent::Flip(e) => instant(
                "Flip",
                "Frame",
                ts,
                json!({
                    "frame_index": e.frame_index,
                    "stable_index": e.stable_index.get(),
                }),
            ),
            RecordedEvent::FrameSummary(s) => instant(
                "FrameSummary",
                "Summary",
                ts,
                json!({
                    "frame_index": s.frame_index,
                    "stable_index": s.stable_index.get(),
                    "resets": s.resets,
                    "applied": s.applied,
                    "dangling": s.dangling,
                    "rejected": s.rejected,
                    "transforms": s.transforms,
                    "opacities": s.opacities,
                    "degenerate": s.degenerate,
                    "instructions": s.instructions,
                    "resync": s.resync,
                    "keep_rendering": s.keep_rendering,
                }),
            ),
            RecordedEvent::ObjectChanges {
                frame_index,
                resynced,
                removed,
            } => instant(
                "ObjectChanges",
                "Rich",
                ts,
                json!({
                    "frame_index": frame_index,
                    "resynced": resynced,
                    "removed": removed,
                }),
            ),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(name: &str, cat: &str, ts: f64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": 0,
        "s": "t",
        "args": args,
    })
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}
