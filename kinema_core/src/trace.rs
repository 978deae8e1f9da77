// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! clock, action channels and frame orchestrator call as they run. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! A [`Tracer`] lives inside each [`Clock`](crate::clock::Clock) and is shared
//! by everything driven by that clock. When the `trace` feature is **off**,
//! every `Tracer` method compiles to nothing and installed sinks are dropped.
//! When **on**, each method performs a single `Option` branch before
//! dispatching.
//!
//! To keep access to a sink after installing it, install an
//! `Rc<RefCell<S>>` clone; [`TraceSink`] is implemented for that wrapper.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use kurbo::{Point, Size};

use crate::action::ActionId;
use crate::clock::SubscriptionId;
use crate::error::CallbackError;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once per clock pulse, before any subscriber runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseEvent {
    /// Monotonic pulse counter (starts at 1).
    pub pulse_index: u64,
    /// Host timestamp carried by the pulse.
    pub now: HostTime,
    /// Clamped delta delivered to subscribers, in milliseconds.
    pub delta_ms: f64,
    /// Accumulated clock time after this pulse, in milliseconds.
    pub accumulated_ms: f64,
    /// Number of subscribers in this pulse's snapshot.
    pub subscribers: u32,
}

/// Emitted when a pulse ends with no subscribers left and the clock stops
/// requesting pulses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockIdleEvent {
    /// Index of the last pulse before going idle.
    pub pulse_index: u64,
    /// Accumulated clock time, which survives the idle period.
    pub accumulated_ms: f64,
}

/// Which kind of callback produced a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackOrigin {
    /// A clock subscriber.
    Subscription(SubscriptionId),
    /// A scheduled action.
    Action(ActionId),
}

/// Emitted when a callback returns an error. The error is not propagated.
#[derive(Clone, Copy, Debug)]
pub struct CallbackFailedEvent<'a> {
    /// Pulse during which the failure happened (0 before the first pulse).
    pub pulse_index: u64,
    /// Which callback failed.
    pub origin: CallbackOrigin,
    /// The returned error.
    pub error: &'a CallbackError,
}

/// Emitted after a scheduled action fired during a tick.
#[derive(Clone, Copy, Debug)]
pub struct ActionFiredEvent<'a> {
    /// Pulse that drove the tick.
    pub pulse_index: u64,
    /// Which action fired.
    pub action: ActionId,
    /// The action's name, if it has one.
    pub name: Option<&'a str>,
    /// How many times the callback ran this tick.
    pub fires: u64,
}

/// Per-frame summary emitted by the frame orchestrator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSummary {
    /// Orchestrator frame counter.
    pub frame_index: u64,
    /// Clock pulse that drove the frame (0 for manual frames).
    pub pulse_index: u64,
    /// World offset used for the draw pass.
    pub world_offset: Point,
    /// Logical surface size applied this frame.
    pub logical_size: Size,
    /// Entities drawn.
    pub drawn: u32,
    /// Entities skipped because they were hidden.
    pub skipped: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the start of each clock pulse.
    fn on_pulse(&mut self, e: &PulseEvent) {
        _ = e;
    }

    /// Called when the clock goes idle.
    fn on_clock_idle(&mut self, e: &ClockIdleEvent) {
        _ = e;
    }

    /// Called when a callback reports a failure.
    fn on_callback_failed(&mut self, e: &CallbackFailedEvent<'_>) {
        _ = e;
    }

    /// Called after a scheduled action fired.
    fn on_action_fired(&mut self, e: &ActionFiredEvent<'_>) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_pulse(&mut self, e: &PulseEvent) {
        if let Ok(mut s) = self.try_borrow_mut() {
            s.on_pulse(e);
        }
    }

    fn on_clock_idle(&mut self, e: &ClockIdleEvent) {
        if let Ok(mut s) = self.try_borrow_mut() {
            s.on_clock_idle(e);
        }
    }

    fn on_callback_failed(&mut self, e: &CallbackFailedEvent<'_>) {
        if let Ok(mut s) = self.try_borrow_mut() {
            s.on_callback_failed(e);
        }
    }

    fn on_action_fired(&mut self, e: &ActionFiredEvent<'_>) {
        if let Ok(mut s) = self.try_borrow_mut() {
            s.on_action_fired(e);
        }
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        if let Ok(mut sink) = self.try_borrow_mut() {
            sink.on_frame_summary(s);
        }
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer
// ---------------------------------------------------------------------------

/// Shared slot holding an optional boxed [`TraceSink`].
///
/// Methods take `&self` so that every component driven by a clock can emit
/// through the same tracer while the clock is mid-pulse. A sink that is
/// already dispatching (because it somehow re-entered the frame loop) drops
/// the nested event instead of panicking.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: RefCell<Option<Box<dyn TraceSink>>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

impl Tracer {
    /// Creates a tracer with no sink installed.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            #[cfg(feature = "trace")]
            sink: RefCell::new(None),
        }
    }

    /// Installs `sink`, returning the previously installed one.
    ///
    /// Without the `trace` feature the sink is dropped and `None` returned.
    pub fn set_sink(&self, sink: Option<Box<dyn TraceSink>>) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            match self.sink.try_borrow_mut() {
                Ok(mut slot) => core::mem::replace(&mut *slot, sink),
                Err(_) => sink,
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            None
        }
    }

    #[cfg(feature = "trace")]
    #[inline]
    fn dispatch(&self, f: impl FnOnce(&mut dyn TraceSink)) {
        if let Ok(mut slot) = self.sink.try_borrow_mut()
            && let Some(s) = slot.as_deref_mut()
        {
            f(s);
        }
    }

    /// Emits a [`PulseEvent`].
    #[inline]
    pub fn pulse(&self, e: &PulseEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s| s.on_pulse(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ClockIdleEvent`].
    #[inline]
    pub fn clock_idle(&self, e: &ClockIdleEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s| s.on_clock_idle(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CallbackFailedEvent`].
    #[inline]
    pub fn callback_failed(&self, e: &CallbackFailedEvent<'_>) {
        #[cfg(feature = "trace")]
        self.dispatch(|s| s.on_callback_failed(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ActionFiredEvent`].
    #[inline]
    pub fn action_fired(&self, e: &ActionFiredEvent<'_>) {
        #[cfg(feature = "trace")]
        self.dispatch(|s| s.on_action_fired(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        self.dispatch(|sink| sink.on_frame_summary(s));
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
