// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Pulse
//! timestamps are converted to milliseconds using a [`Timebase`].

use std::io::Write;

use kinema_core::time::{HostTime, Timebase};
use kinema_core::trace::{
    ActionFiredEvent, CallbackFailedEvent, CallbackOrigin, ClockIdleEvent, FrameSummary,
    PulseEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn host_ms(&self, t: HostTime) -> f64 {
        self.timebase.ticks_to_millis(t.ticks())
    }
}

fn origin_label(origin: CallbackOrigin) -> String {
    match origin {
        CallbackOrigin::Subscription(id) => format!("subscription={}", id.get()),
        CallbackOrigin::Action(id) => format!("action={}", id.get()),
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_pulse(&mut self, e: &PulseEvent) {
        let now = self.host_ms(e.now);
        let _ = writeln!(
            self.writer,
            "[pulse] #{} now={now:.3}ms delta={:.2}ms acc={:.2}ms subscribers={}",
            e.pulse_index, e.delta_ms, e.accumulated_ms, e.subscribers,
        );
    }

    fn on_clock_idle(&mut self, e: &ClockIdleEvent) {
        let _ = writeln!(
            self.writer,
            "[idle] after #{} acc={:.2}ms",
            e.pulse_index, e.accumulated_ms,
        );
    }

    fn on_callback_failed(&mut self, e: &CallbackFailedEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[callback:failed] #{} {} error={:?}",
            e.pulse_index,
            origin_label(e.origin),
            e.error.message(),
        );
    }

    fn on_action_fired(&mut self, e: &ActionFiredEvent<'_>) {
        let _ = write!(
            self.writer,
            "[action] #{} id={} fires={}",
            e.pulse_index,
            e.action.get(),
            e.fires,
        );
        if let Some(name) = e.name {
            let _ = write!(self.writer, " name={name}");
        }
        let _ = writeln!(self.writer);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[frame] {} pulse=#{} offset=({:.1}, {:.1}) size={}x{} drawn={} skipped={}",
            s.frame_index,
            s.pulse_index,
            s.world_offset.x,
            s.world_offset.y,
            s.logical_size.width,
            s.logical_size.height,
            s.drawn,
            s.skipped,
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use kinema_core::clock::{Clock, ClockConfig, ManualPulse};
    use kinema_core::error::CallbackError;
    use kurbo::{Point, Size};

    use super::*;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pulse_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new(), Timebase::MICROS);
        sink.on_pulse(&PulseEvent {
            pulse_index: 4,
            now: HostTime(16_500),
            delta_ms: 16.5,
            accumulated_ms: 49.5,
            subscribers: 2,
        });
        assert_eq!(
            output(sink),
            "[pulse] #4 now=16.500ms delta=16.50ms acc=49.50ms subscribers=2\n"
        );
    }

    #[test]
    fn frame_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new(), Timebase::MILLIS);
        sink.on_frame_summary(&FrameSummary {
            frame_index: 12,
            pulse_index: 30,
            world_offset: Point::new(-8.0, 2.5),
            logical_size: Size::new(320.0, 240.0),
            drawn: 5,
            skipped: 1,
        });
        let text = output(sink);
        assert!(text.starts_with("[frame] 12 pulse=#30"), "got {text}");
        assert!(text.contains("offset=(-8.0, 2.5) size=320x240"), "got {text}");
        assert!(text.contains("drawn=5 skipped=1"), "got {text}");
    }

    #[test]
    fn clock_session_lines() {
        let sink = Rc::new(RefCell::new(PrettyPrintSink::with_writer(
            Vec::new(),
            Timebase::MILLIS,
        )));
        let source = Rc::new(ManualPulse::new());
        let clock = Clock::new(ClockConfig::millis(), source.clone());
        let _ = clock.set_trace_sink(Some(Box::new(Rc::clone(&sink))));

        let sub = clock.subscribe(|_, _| Err(CallbackError::new("no sprite sheet")));
        source.fire(HostTime(100));
        sub.unsubscribe();
        source.fire(HostTime(116));
        let _ = clock.set_trace_sink(None);

        let sink = Rc::try_unwrap(sink).ok().unwrap().into_inner();
        let text = output(sink);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("[pulse] #1 now=100.000ms delta=0.00ms"), "got {text}");
        assert_eq!(
            lines[1],
            format!(
                "[callback:failed] #1 subscription={} error=\"no sprite sheet\"",
                sub.id().get()
            )
        );
    }
}
