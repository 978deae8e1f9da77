// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Only pulses carry a host timestamp. Every other event is stamped with the
//! timestamp of the most recent pulse before it in the recording (zero before
//! the first pulse), so it lines up under the pulse that caused it.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use kinema_core::time::Timebase;

use crate::recorder::{RecordedEvent, RecordedOrigin, decode};

const TID_CLOCK: u32 = 0;
const TID_ACTIONS: u32 = 1;
const TID_FRAMES: u32 = 2;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Pulse(e) => {
                ts = ticks_to_us(e.now.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "Pulse",
                    "cat": "Clock",
                    "ts": ts,
                    "pid": 0,
                    "tid": TID_CLOCK,
                    "s": "t",
                    "args": {
                        "pulse_index": e.pulse_index,
                        "delta_ms": e.delta_ms,
                        "accumulated_ms": e.accumulated_ms,
                        "subscribers": e.subscribers,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "delta_ms",
                    "ts": ts,
                    "pid": 0,
                    "args": { "delta_ms": e.delta_ms }
                }));
            }
            RecordedEvent::ClockIdle(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ClockIdle",
                    "cat": "Clock",
                    "ts": ts,
                    "pid": 0,
                    "tid": TID_CLOCK,
                    "s": "g",
                    "args": {
                        "pulse_index": e.pulse_index,
                        "accumulated_ms": e.accumulated_ms,
                    }
                }));
            }
            RecordedEvent::CallbackFailed {
                pulse_index,
                origin,
                message,
            } => {
                let (tid, origin) = match origin {
                    RecordedOrigin::Subscription(id) => (TID_CLOCK, format!("subscription {id}")),
                    RecordedOrigin::Action(id) => (TID_ACTIONS, format!("action {id}")),
                };
                events.push(json!({
                    "ph": "i",
                    "name": "CallbackFailed",
                    "cat": "Error",
                    "ts": ts,
                    "pid": 0,
                    "tid": tid,
                    "s": "t",
                    "args": {
                        "pulse_index": pulse_index,
                        "origin": origin,
                        "message": message,
                    }
                }));
            }
            RecordedEvent::ActionFired {
                pulse_index,
                action,
                name,
                fires,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": name.unwrap_or_else(|| format!("action {action}")),
                    "cat": "Action",
                    "ts": ts,
                    "pid": 0,
                    "tid": TID_ACTIONS,
                    "s": "t",
                    "args": {
                        "pulse_index": pulse_index,
                        "action": action,
                        "fires": fires,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Frame",
                    "cat": "Orchestrator",
                    "ts": ts,
                    "pid": 0,
                    "tid": TID_FRAMES,
                    "s": "t",
                    "args": {
                        "frame_index": s.frame_index,
                        "pulse_index": s.pulse_index,
                        "world_offset": [s.world_offset.x, s.world_offset.y],
                        "logical_size": [s.logical_size.width, s.logical_size.height],
                        "drawn": s.drawn,
                        "skipped": s.skipped,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_millis(ticks) * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use kinema_core::time::HostTime;
    use kinema_core::trace::{ClockIdleEvent, FrameSummary, PulseEvent, TraceSink};
    use kurbo::{Point, Size};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_pulse(&PulseEvent {
            pulse_index: 1,
            now: HostTime(2_000),
            delta_ms: 0.0,
            accumulated_ms: 0.0,
            subscribers: 1,
        });
        rec.on_frame_summary(&FrameSummary {
            frame_index: 0,
            pulse_index: 1,
            world_offset: Point::new(4.0, -4.0),
            logical_size: Size::new(64.0, 64.0),
            drawn: 3,
            skipped: 0,
        });
        rec.on_clock_idle(&ClockIdleEvent {
            pulse_index: 1,
            accumulated_ms: 0.0,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::MICROS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        // Pulse instant plus its delta counter.
        assert_eq!(parsed[0]["name"], "Pulse");
        assert_eq!(parsed[0]["ts"], 2000.0);
        assert_eq!(parsed[1]["ph"], "C");

        // Later events inherit the pulse timestamp.
        assert_eq!(parsed[2]["name"], "Frame");
        assert_eq!(parsed[2]["ts"], 2000.0);
        assert_eq!(parsed[2]["args"]["drawn"], 3);
        assert_eq!(parsed[3]["name"], "ClockIdle");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
