// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Numbers are fixed-size; callback
//! error messages and action names are length-prefixed UTF-8. [`decode`]
//! reads them back as an iterator of [`RecordedEvent`].

use kinema_core::time::HostTime;
use kinema_core::trace::{
    ActionFiredEvent, CallbackFailedEvent, CallbackOrigin, ClockIdleEvent, FrameSummary,
    PulseEvent, TraceSink,
};
use kurbo::{Point, Size};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PULSE: u8 = 1;
const TAG_CLOCK_IDLE: u8 = 2;
const TAG_CALLBACK_FAILED: u8 = 3;
const TAG_ACTION_FIRED: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;

const ORIGIN_SUBSCRIPTION: u8 = 0;
const ORIGIN_ACTION: u8 = 1;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
        self.write_u32(len);
        self.buf.extend_from_slice(&s.as_bytes()[..len as usize]);
    }

    fn write_option_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.write_u8(1);
                self.write_str(s);
            }
            None => self.write_u8(0),
        }
    }

    fn write_origin(&mut self, origin: CallbackOrigin) {
        match origin {
            CallbackOrigin::Subscription(id) => {
                self.write_u8(ORIGIN_SUBSCRIPTION);
                self.write_u64(id.get());
            }
            CallbackOrigin::Action(id) => {
                self.write_u8(ORIGIN_ACTION);
                self.write_u64(id.get());
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_pulse(&mut self, e: &PulseEvent) {
        self.write_u8(TAG_PULSE);
        self.write_u64(e.pulse_index);
        self.write_u64(e.now.ticks());
        self.write_f64(e.delta_ms);
        self.write_f64(e.accumulated_ms);
        self.write_u32(e.subscribers);
    }

    fn on_clock_idle(&mut self, e: &ClockIdleEvent) {
        self.write_u8(TAG_CLOCK_IDLE);
        self.write_u64(e.pulse_index);
        self.write_f64(e.accumulated_ms);
    }

    fn on_callback_failed(&mut self, e: &CallbackFailedEvent<'_>) {
        self.write_u8(TAG_CALLBACK_FAILED);
        self.write_u64(e.pulse_index);
        self.write_origin(e.origin);
        self.write_str(e.error.message());
    }

    fn on_action_fired(&mut self, e: &ActionFiredEvent<'_>) {
        self.write_u8(TAG_ACTION_FIRED);
        self.write_u64(e.pulse_index);
        self.write_u64(e.action.get());
        self.write_option_str(e.name);
        self.write_u64(e.fires);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.pulse_index);
        self.write_f64(s.world_offset.x);
        self.write_f64(s.world_offset.y);
        self.write_f64(s.logical_size.width);
        self.write_f64(s.logical_size.height);
        self.write_u32(s.drawn);
        self.write_u32(s.skipped);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Which kind of callback a recorded failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedOrigin {
    /// A clock subscription, by raw id.
    Subscription(u64),
    /// A scheduled action, by raw id.
    Action(u64),
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`PulseEvent`].
    Pulse(PulseEvent),
    /// A [`ClockIdleEvent`].
    ClockIdle(ClockIdleEvent),
    /// A [`CallbackFailedEvent`], with the message copied out.
    CallbackFailed {
        /// Pulse during which the failure happened.
        pulse_index: u64,
        /// Which callback failed.
        origin: RecordedOrigin,
        /// The error message.
        message: String,
    },
    /// An [`ActionFiredEvent`], with the name copied out.
    ActionFired {
        /// Pulse that drove the tick.
        pulse_index: u64,
        /// Raw action id.
        action: u64,
        /// Action name, if any.
        name: Option<String>,
        /// Invocations this tick.
        fires: u64,
    },
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_f64(&mut self) -> Option<f64> {
        Some(f64::from_bits(self.read_u64()?))
    }

    fn read_string(&mut self) -> Option<String> {
        let len = usize::try_from(self.read_u32()?).ok()?;
        String::from_utf8(self.take(len)?.to_vec()).ok()
    }

    fn read_option_string(&mut self) -> Option<Option<String>> {
        match self.read_u8()? {
            0 => Some(None),
            _ => Some(Some(self.read_string()?)),
        }
    }

    fn read_origin(&mut self) -> Option<RecordedOrigin> {
        let kind = self.read_u8()?;
        let id = self.read_u64()?;
        Some(match kind {
            ORIGIN_SUBSCRIPTION => RecordedOrigin::Subscription(id),
            _ => RecordedOrigin::Action(id),
        })
    }

    fn decode_pulse(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Pulse(PulseEvent {
            pulse_index: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            delta_ms: self.read_f64()?,
            accumulated_ms: self.read_f64()?,
            subscribers: self.read_u32()?,
        }))
    }

    fn decode_clock_idle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ClockIdle(ClockIdleEvent {
            pulse_index: self.read_u64()?,
            accumulated_ms: self.read_f64()?,
        }))
    }

    fn decode_callback_failed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CallbackFailed {
            pulse_index: self.read_u64()?,
            origin: self.read_origin()?,
            message: self.read_string()?,
        })
    }

    fn decode_action_fired(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ActionFired {
            pulse_index: self.read_u64()?,
            action: self.read_u64()?,
            name: self.read_option_string()?,
            fires: self.read_u64()?,
        })
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            pulse_index: self.read_u64()?,
            world_offset: Point::new(self.read_f64()?, self.read_f64()?),
            logical_size: Size::new(self.read_f64()?, self.read_f64()?),
            drawn: self.read_u32()?,
            skipped: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_PULSE => self.decode_pulse(),
            TAG_CLOCK_IDLE => self.decode_clock_idle(),
            TAG_CALLBACK_FAILED => self.decode_callback_failed(),
            TAG_ACTION_FIRED => self.decode_action_fired(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
