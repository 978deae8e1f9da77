// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared frame clock.
//!
//! [`Clock`] turns host frame pulses into `(delta_ms, accumulated_ms)`
//! notifications for every registered subscriber. It is active while it has
//! at least one subscriber and idle otherwise:
//!
//! ```text
//!             subscribe (0 → 1)
//!   Idle ─────────────────────────► Active ──┐
//!    ▲     request one pulse           │     │ pulse: snapshot subscribers,
//!    │                                 │     │ invoke each, request next
//!    └─────────────────────────────────┘ ◄───┘
//!     last subscriber gone: cancel pending pulse,
//!     forget timestamp baseline (keep accumulated time)
//! ```
//!
//! The clock never generates time. A [`PulseSource`] is asked for exactly
//! one pulse at a time and answers by calling [`Clock::pulse`] with the host
//! timestamp.
//!
//! `Clock` is a cheap handle; clones share state. Create one per host frame
//! source and pass it to everything that needs ticks.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::error::CallbackResult;
use crate::time::{HostTime, Timebase};
use crate::trace::{
    CallbackFailedEvent, CallbackOrigin, ClockIdleEvent, PulseEvent, TraceSink, Tracer,
};

/// Largest delta, in milliseconds, that subscribers will ever observe.
pub const MAX_DELTA_MS: f64 = 100.0;

/// Host primitive that delivers frame pulses on request.
///
/// The clock calls [`request`](Self::request) when it needs the next pulse
/// and never has more than one request outstanding. Implementations answer a
/// request exactly once by calling [`Clock::pulse`] on the upgraded handle,
/// unless [`cancel`](Self::cancel) arrives first.
pub trait PulseSource {
    /// Schedules one pulse for `clock`.
    fn request(&self, clock: &WeakClock);

    /// Cancels the outstanding request, if any.
    fn cancel(&self);
}

/// Clock configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockConfig {
    /// Unit of the timestamps passed to [`Clock::pulse`].
    pub timebase: Timebase,
    /// Upper clamp for the delivered delta, in milliseconds.
    pub max_delta_ms: f64,
}

impl ClockConfig {
    /// Default configuration: microsecond ticks, 100 ms clamp.
    pub const DEFAULT: Self = Self::web();

    /// Configuration for `requestAnimationFrame` pulses (µs ticks).
    #[must_use]
    pub const fn web() -> Self {
        Self {
            timebase: Timebase::MICROS,
            max_delta_ms: MAX_DELTA_MS,
        }
    }

    /// Configuration for pulses stamped in whole milliseconds.
    #[must_use]
    pub const fn millis() -> Self {
        Self {
            timebase: Timebase::MILLIS,
            max_delta_ms: MAX_DELTA_MS,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Identity of one `subscribe` call.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Returns the raw id (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

type TickCallback = Box<dyn FnMut(f64, f64) -> CallbackResult>;

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    callback: Rc<RefCell<TickCallback>>,
}

struct ClockInner {
    config: ClockConfig,
    source: Rc<dyn PulseSource>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
    /// Timestamp of the previous pulse; `None` while idle.
    baseline: Cell<Option<HostTime>>,
    accumulated_ms: Cell<f64>,
    pulse_pending: Cell<bool>,
    in_pulse: Cell<bool>,
    pulse_index: Cell<u64>,
    tracer: Tracer,
}

/// Process-wide cooperative frame clock.
///
/// See the [module documentation](self) for the lifecycle.
#[derive(Clone)]
pub struct Clock {
    inner: Rc<ClockInner>,
}

/// Non-owning handle to a [`Clock`], held by pulse sources.
#[derive(Clone, Default)]
pub struct WeakClock(Weak<ClockInner>);

impl WeakClock {
    /// Returns the clock if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Clock> {
        self.0.upgrade().map(|inner| Clock { inner })
    }
}

impl fmt::Debug for WeakClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakClock")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

impl Clock {
    /// Creates an idle clock fed by `source`.
    #[must_use]
    pub fn new(config: ClockConfig, source: Rc<dyn PulseSource>) -> Self {
        Self {
            inner: Rc::new(ClockInner {
                config,
                source,
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                baseline: Cell::new(None),
                accumulated_ms: Cell::new(0.0),
                pulse_pending: Cell::new(false),
                in_pulse: Cell::new(false),
                pulse_index: Cell::new(0),
                tracer: Tracer::none(),
            }),
        }
    }

    /// Returns a non-owning handle to this clock.
    #[must_use]
    pub fn downgrade(&self) -> WeakClock {
        WeakClock(Rc::downgrade(&self.inner))
    }

    /// Returns the clock configuration.
    #[must_use]
    pub fn config(&self) -> ClockConfig {
        self.inner.config
    }

    /// Registers `callback` to receive `(delta_ms, accumulated_ms)` on every
    /// pulse.
    ///
    /// Each call creates an independent registration, even for identical
    /// callbacks. If this makes the clock active, a pulse is requested.
    /// A callback registered while a pulse is running first runs on the
    /// next pulse.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(f64, f64) -> CallbackResult + 'static,
    {
        let inner = &self.inner;
        let id = SubscriptionId(inner.next_id.get());
        inner.next_id.set(id.0 + 1);
        inner.subscribers.borrow_mut().push(Subscriber {
            id,
            callback: Rc::new(RefCell::new(Box::new(callback))),
        });
        if !inner.in_pulse.get() {
            self.request_pulse();
        }
        Subscription {
            clock: Rc::downgrade(&self.inner),
            id,
            active: Cell::new(true),
        }
    }

    /// Returns `true` while at least one subscriber is registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.inner.subscribers.borrow().is_empty()
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Returns `true` while a pulse request is outstanding.
    #[must_use]
    pub fn is_pulse_pending(&self) -> bool {
        self.inner.pulse_pending.get()
    }

    /// Returns the accumulated clock time in milliseconds.
    #[must_use]
    pub fn accumulated_ms(&self) -> f64 {
        self.inner.accumulated_ms.get()
    }

    /// Returns the number of pulses processed so far.
    #[must_use]
    pub fn pulse_index(&self) -> u64 {
        self.inner.pulse_index.get()
    }

    /// Cancels any outstanding pulse request and forgets the timestamp
    /// baseline. Subscribers are untouched; the next subscribe or
    /// unsubscribe re-requests a pulse if anyone is still registered.
    pub fn force_stop(&self) {
        let inner = &self.inner;
        if inner.pulse_pending.replace(false) {
            inner.source.cancel();
        }
        inner.baseline.set(None);
    }

    /// Installs a trace sink shared by everything this clock drives,
    /// returning the previous one.
    pub fn set_trace_sink(&self, sink: Option<Box<dyn TraceSink>>) -> Option<Box<dyn TraceSink>> {
        self.inner.tracer.set_sink(sink)
    }

    pub(crate) fn tracer(&self) -> &Tracer {
        &self.inner.tracer
    }

    /// Advances the clock to `now` and notifies subscribers.
    ///
    /// Called by the [`PulseSource`]. The first pulse after idle only seeds
    /// the baseline and delivers a zero delta. Later deltas are clamped to
    /// [`ClockConfig::max_delta_ms`]. Subscribers run from a snapshot taken
    /// before the first invocation; a failing subscriber is recorded and
    /// skipped. A nested call from inside a subscriber is ignored.
    pub fn pulse(&self, now: HostTime) {
        let inner = &self.inner;
        if inner.in_pulse.get() {
            return;
        }
        inner.pulse_pending.set(false);

        let snapshot: Vec<Subscriber> = inner.subscribers.borrow().clone();
        if snapshot.is_empty() {
            inner.baseline.set(None);
            return;
        }

        let delta_ms = match inner.baseline.get() {
            None => 0.0,
            Some(previous) => now
                .saturating_duration_since(previous)
                .to_millis_f64(inner.config.timebase)
                .min(inner.config.max_delta_ms)
                .max(0.0),
        };
        inner.baseline.set(Some(now));
        let accumulated_ms = inner.accumulated_ms.get() + delta_ms;
        inner.accumulated_ms.set(accumulated_ms);
        let pulse_index = inner.pulse_index.get() + 1;
        inner.pulse_index.set(pulse_index);

        inner.tracer.pulse(&PulseEvent {
            pulse_index,
            now,
            delta_ms,
            accumulated_ms,
            subscribers: u32::try_from(snapshot.len()).unwrap_or(u32::MAX),
        });

        inner.in_pulse.set(true);
        for subscriber in &snapshot {
            let Ok(mut callback) = subscriber.callback.try_borrow_mut() else {
                continue;
            };
            if let Err(error) = callback(delta_ms, accumulated_ms) {
                inner.tracer.callback_failed(&CallbackFailedEvent {
                    pulse_index,
                    origin: CallbackOrigin::Subscription(subscriber.id),
                    error: &error,
                });
            }
        }
        inner.in_pulse.set(false);

        if self.is_active() {
            self.request_pulse();
        } else {
            inner.baseline.set(None);
            inner.tracer.clock_idle(&ClockIdleEvent {
                pulse_index,
                accumulated_ms,
            });
        }
    }

    fn request_pulse(&self) {
        let inner = &self.inner;
        if inner.pulse_pending.get() || !self.is_active() {
            return;
        }
        inner.pulse_pending.set(true);
        inner.source.request(&self.downgrade());
    }
}

impl ClockInner {
    fn remove(self: &Rc<Self>, id: SubscriptionId) {
        let removed = {
            let mut subscribers = self.subscribers.borrow_mut();
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            before != subscribers.len()
        };
        if !removed || self.in_pulse.get() {
            // Mid-pulse changes are settled when the pulse finishes.
            return;
        }
        let clock = Clock {
            inner: Rc::clone(self),
        };
        if clock.is_active() {
            clock.request_pulse();
        } else {
            if self.pulse_pending.replace(false) {
                self.source.cancel();
            }
            self.baseline.set(None);
        }
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        f.debug_struct("Clock")
            .field("config", &inner.config)
            .field("subscribers", &inner.subscribers.borrow().len())
            .field("baseline", &inner.baseline.get())
            .field("accumulated_ms", &inner.accumulated_ms.get())
            .field("pulse_pending", &inner.pulse_pending.get())
            .field("pulse_index", &inner.pulse_index.get())
            .finish_non_exhaustive()
    }
}

/// Registration handle returned by [`Clock::subscribe`].
///
/// Dropping the handle does **not** unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe).
#[must_use = "the callback stays registered until `unsubscribe` is called"]
pub struct Subscription {
    clock: Weak<ClockInner>,
    id: SubscriptionId,
    active: Cell<bool>,
}

impl Subscription {
    /// Removes exactly this registration. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(inner) = self.clock.upgrade() {
            inner.remove(self.id);
        }
    }

    /// Returns the registration id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `true` until [`unsubscribe`](Self::unsubscribe) is called.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ManualPulse
// ---------------------------------------------------------------------------

/// A [`PulseSource`] driven by hand, for tests and headless hosts.
///
/// Requests are only recorded; [`fire`](Self::fire) delivers the pending
/// pulse.
#[derive(Debug, Default)]
pub struct ManualPulse {
    pending: RefCell<Option<WeakClock>>,
    requests: Cell<u64>,
    cancels: Cell<u64>,
}

impl ManualPulse {
    /// Creates a source with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a request is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Total number of requests received.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests.get()
    }

    /// Total number of cancellations received.
    #[must_use]
    pub fn cancels(&self) -> u64 {
        self.cancels.get()
    }

    /// Delivers the outstanding pulse stamped `now`.
    ///
    /// Returns `false` if nothing was pending.
    pub fn fire(&self, now: HostTime) -> bool {
        let pending = self.pending.borrow_mut().take();
        match pending.as_ref().and_then(WeakClock::upgrade) {
            Some(clock) => {
                clock.pulse(now);
                true
            }
            None => false,
        }
    }
}

impl PulseSource for ManualPulse {
    fn request(&self, clock: &WeakClock) {
        self.requests.set(self.requests.get() + 1);
        *self.pending.borrow_mut() = Some(clock.clone());
    }

    fn cancel(&self) {
        self.cancels.set(self.cancels.get() + 1);
        self.pending.borrow_mut().take();
    }
}
