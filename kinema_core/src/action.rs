// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-owner timers driven by the shared clock.
//!
//! An [`ActionChannel`] holds an ordered list of scheduled actions and, while
//! running, a single [`Clock`] subscription. Every tick it advances each
//! action by the clock delta:
//!
//! - a *periodic* action fires whenever its elapsed time reaches the
//!   interval. With catch-up (the default) a long tick fires it as many times
//!   as whole intervals fit; without catch-up it fires at most once per tick
//!   and the leftover keeps accumulating. An interval of zero fires exactly
//!   once per tick.
//! - a *one-shot* action fires once its elapsed time reaches the delay and is
//!   then removed.
//!
//! Ticks iterate a snapshot of the action list. Actions scheduled from a
//! callback first fire on the next tick; actions cancelled from a callback do
//! not fire again, even later in the same tick.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::clock::{Clock, Subscription};
use crate::error::CallbackResult;
use crate::trace::{ActionFiredEvent, CallbackFailedEvent, CallbackOrigin};

/// Identity of one scheduled action within its channel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub(crate) u64);

impl ActionId {
    /// Returns the raw id (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionId({})", self.0)
    }
}

/// Options for [`ActionChannel::schedule_periodic`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodicOptions {
    /// Name used by [`ActionChannel::cancel`]. Need not be unique.
    pub name: Option<String>,
    /// Invoke the callback once, synchronously, when scheduling.
    pub fire_immediately: bool,
    /// Fire once per whole elapsed interval instead of once per tick.
    pub catch_up: bool,
}

impl Default for PeriodicOptions {
    fn default() -> Self {
        Self {
            name: None,
            fire_immediately: false,
            catch_up: true,
        }
    }
}

impl PeriodicOptions {
    /// Default options: unnamed, no immediate fire, catch-up on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the action name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fires once at registration.
    #[must_use]
    pub fn fire_immediately(mut self) -> Self {
        self.fire_immediately = true;
        self
    }

    /// Fires at most once per tick.
    #[must_use]
    pub fn without_catch_up(mut self) -> Self {
        self.catch_up = false;
        self
    }
}

/// Options for [`ActionChannel::schedule_once`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OnceOptions {
    /// Name used by [`ActionChannel::cancel`].
    pub name: Option<String>,
}

impl OnceOptions {
    /// Unnamed one-shot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the action name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Clone, Copy, Debug)]
enum Timer {
    Periodic { interval_ms: u64, catch_up: bool },
    Once { delay_ms: u64 },
}

type ActionCallback = Box<dyn FnMut() -> CallbackResult>;

struct ScheduledAction {
    id: ActionId,
    name: Option<String>,
    timer: Timer,
    elapsed_ms: Cell<f64>,
    /// Set when the action leaves the list; a cancelled action never fires.
    cancelled: Cell<bool>,
    callback: RefCell<ActionCallback>,
}

impl ScheduledAction {
    fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

struct ChannelInner {
    clock: Clock,
    actions: RefCell<Vec<Rc<ScheduledAction>>>,
    subscription: RefCell<Option<Subscription>>,
    next_id: Cell<u64>,
    destroyed: Cell<bool>,
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}

/// A list of timed actions sharing one clock subscription.
///
/// Clones share the same channel. The channel unsubscribes from the clock
/// when the last handle is dropped.
#[derive(Clone)]
pub struct ActionChannel {
    inner: Rc<ChannelInner>,
}

impl ActionChannel {
    /// Creates a stopped, empty channel on `clock`.
    #[must_use]
    pub fn new(clock: &Clock) -> Self {
        Self {
            inner: Rc::new(ChannelInner {
                clock: clock.clone(),
                actions: RefCell::new(Vec::new()),
                subscription: RefCell::new(None),
                next_id: Cell::new(0),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// Schedules `callback` every `interval_ms` milliseconds.
    ///
    /// The interval is floored to a non-negative whole number. Ignored on a
    /// destroyed channel.
    pub fn schedule_periodic<F>(
        &self,
        interval_ms: f64,
        callback: F,
        options: PeriodicOptions,
    ) -> &Self
    where
        F: FnMut() -> CallbackResult + 'static,
    {
        let timer = Timer::Periodic {
            interval_ms: floor_ms(interval_ms),
            catch_up: options.catch_up,
        };
        let Some(action) = self.push(timer, options.name, Box::new(callback)) else {
            return self;
        };
        if options.fire_immediately {
            self.invoke(&action);
        }
        self
    }

    /// Schedules `callback` once, after `delay_ms` milliseconds.
    ///
    /// The delay is floored to a non-negative whole number. Ignored on a
    /// destroyed channel.
    pub fn schedule_once<F>(&self, delay_ms: f64, callback: F, options: OnceOptions) -> &Self
    where
        F: FnMut() -> CallbackResult + 'static,
    {
        let timer = Timer::Once {
            delay_ms: floor_ms(delay_ms),
        };
        _ = self.push(timer, options.name, Box::new(callback));
        self
    }

    /// Subscribes the channel to its clock. Does nothing if already running
    /// or destroyed.
    pub fn start(&self) -> &Self {
        let inner = &self.inner;
        if inner.destroyed.get() || inner.subscription.borrow().is_some() {
            return self;
        }
        let weak = Rc::downgrade(inner);
        let subscription = inner.clock.subscribe(move |delta_ms, _| {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.advance(delta_ms);
            }
            Ok(())
        });
        *inner.subscription.borrow_mut() = Some(subscription);
        self
    }

    /// Unsubscribes from the clock. Actions and their elapsed time are kept.
    pub fn stop(&self) -> &Self {
        let subscription = self.inner.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self
    }

    /// Removes every action named `name`, or every action when `name` is
    /// `None`. The running state is unchanged.
    pub fn cancel(&self, name: Option<&str>) -> &Self {
        let removed: Vec<Rc<ScheduledAction>> = {
            let mut actions = self.inner.actions.borrow_mut();
            match name {
                Some(name) => {
                    let (removed, kept) = actions.drain(..).partition(|a| a.is_named(name));
                    *actions = kept;
                    removed
                }
                None => actions.drain(..).collect(),
            }
        };
        for action in &removed {
            action.cancelled.set(true);
        }
        // Callbacks are dropped here, outside the list borrow.
        drop(removed);
        self
    }

    /// Stops the channel and discards every action. The channel cannot be
    /// started again.
    pub fn destroy(&self) -> &Self {
        self.stop();
        self.cancel(None);
        self.inner.destroyed.set(true);
        self
    }

    /// Returns `true` while subscribed to the clock.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.subscription.borrow().is_some()
    }

    /// Returns `true` after [`destroy`](Self::destroy).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Number of scheduled actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.actions.borrow().len()
    }

    /// Returns `true` if no actions are scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.actions.borrow().is_empty()
    }

    /// Returns `true` if at least one action is named `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.actions.borrow().iter().any(|a| a.is_named(name))
    }

    /// Advances every action by `delta_ms` and fires the ones that are due.
    ///
    /// This is what the clock subscription calls each tick; hosts may also
    /// drive a stopped channel by hand. Negative and non-finite deltas count
    /// as zero.
    pub fn advance(&self, delta_ms: f64) -> &Self {
        let inner = &self.inner;
        if inner.destroyed.get() {
            return self;
        }
        let delta_ms = if delta_ms.is_finite() && delta_ms > 0.0 {
            delta_ms
        } else {
            0.0
        };

        let snapshot: Vec<Rc<ScheduledAction>> = inner.actions.borrow().clone();
        for action in &snapshot {
            if action.cancelled.get() {
                continue;
            }
            let fires = match action.timer {
                Timer::Periodic { interval_ms: 0, .. } => self.invoke_times(action, 1),
                Timer::Periodic {
                    interval_ms,
                    catch_up,
                } => {
                    let interval = interval_ms as f64;
                    let elapsed = action.elapsed_ms.get() + delta_ms;
                    if elapsed < interval {
                        action.elapsed_ms.set(elapsed);
                        continue;
                    }
                    let due = if catch_up {
                        whole_intervals(elapsed, interval)
                    } else {
                        1
                    };
                    action.elapsed_ms.set(elapsed - due as f64 * interval);
                    self.invoke_times(action, due)
                }
                Timer::Once { delay_ms } => {
                    let elapsed = action.elapsed_ms.get() + delta_ms;
                    action.elapsed_ms.set(elapsed);
                    if elapsed < delay_ms as f64 {
                        continue;
                    }
                    action.cancelled.set(true);
                    let fired = u64::from(self.invoke(action));
                    self.remove(action.id);
                    fired
                }
            };
            if fires > 0 {
                inner.clock.tracer().action_fired(&ActionFiredEvent {
                    pulse_index: inner.clock.pulse_index(),
                    action: action.id,
                    name: action.name.as_deref(),
                    fires,
                });
            }
        }
        self
    }

    fn push(
        &self,
        timer: Timer,
        name: Option<String>,
        callback: ActionCallback,
    ) -> Option<Rc<ScheduledAction>> {
        let inner = &self.inner;
        if inner.destroyed.get() {
            return None;
        }
        let id = ActionId(inner.next_id.get());
        inner.next_id.set(id.0 + 1);
        let action = Rc::new(ScheduledAction {
            id,
            name,
            timer,
            elapsed_ms: Cell::new(0.0),
            cancelled: Cell::new(false),
            callback: RefCell::new(callback),
        });
        inner.actions.borrow_mut().push(Rc::clone(&action));
        Some(action)
    }

    fn remove(&self, id: ActionId) {
        let removed: Vec<Rc<ScheduledAction>> = {
            let mut actions = self.inner.actions.borrow_mut();
            let (removed, kept) = actions.drain(..).partition(|a| a.id == id);
            *actions = kept;
            removed
        };
        drop(removed);
    }

    /// Runs a periodic callback up to `times` times, stopping early if the
    /// action is cancelled by its own invocation.
    fn invoke_times(&self, action: &ScheduledAction, times: u64) -> u64 {
        let mut fired = 0;
        for _ in 0..times {
            if action.cancelled.get() || self.inner.destroyed.get() {
                break;
            }
            if self.invoke(action) {
                fired += 1;
            }
        }
        fired
    }

    /// Invokes the callback once, recording a returned failure. Returns
    /// `false` if the callback is already running.
    fn invoke(&self, action: &ScheduledAction) -> bool {
        let Ok(mut callback) = action.callback.try_borrow_mut() else {
            return false;
        };
        if let Err(error) = callback() {
            let clock = &self.inner.clock;
            clock.tracer().callback_failed(&CallbackFailedEvent {
                pulse_index: clock.pulse_index(),
                origin: CallbackOrigin::Action(action.id),
                error: &error,
            });
        }
        true
    }
}

impl fmt::Debug for ActionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionChannel")
            .field("actions", &self.len())
            .field("running", &self.is_running())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` casts saturate and map NaN to zero"
)]
fn floor_ms(ms: f64) -> u64 {
    if ms.is_nan() || ms <= 0.0 {
        return 0;
    }
    ms as u64
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "quotient of finite non-negative values; `as` saturates"
)]
fn whole_intervals(elapsed: f64, interval: f64) -> u64 {
    (elapsed / interval) as u64
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::clock::{ClockConfig, ManualPulse};
    use crate::error::CallbackError;
    use crate::time::HostTime;

    fn channel() -> (ActionChannel, Clock, Rc<ManualPulse>) {
        let source = Rc::new(ManualPulse::new());
        let clock = Clock::new(ClockConfig::millis(), source.clone());
        (ActionChannel::new(&clock), clock, source)
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() -> CallbackResult + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        (count, move || {
            inner.set(inner.get() + 1);
            Ok(())
        })
    }

    fn elapsed_of(channel: &ActionChannel, index: usize) -> f64 {
        channel.inner.actions.borrow()[index].elapsed_ms.get()
    }

    #[test]
    fn catch_up_fires_once_per_whole_interval() {
        let (channel, _clock, _source) = channel();
        let (count, cb) = counter();
        channel.schedule_periodic(200.0, cb, PeriodicOptions::new());

        channel.advance(500.0);
        assert_eq!(count.get(), 2);
        assert!((elapsed_of(&channel, 0) - 100.0).abs() < 1e-9, "leftover 100 ms");
    }

    #[test]
    fn without_catch_up_fires_once_and_carries_leftover() {
        let (channel, _clock, _source) = channel();
        let (count, cb) = counter();
        channel.schedule_periodic(200.0, cb, PeriodicOptions::new().without_catch_up());

        channel.advance(500.0);
        assert_eq!(count.get(), 1);
        assert!((elapsed_of(&channel, 0) - 300.0).abs() < 1e-9, "leftover 300 ms");

        channel.advance(500.0);
        assert_eq!(count.get(), 2);
        assert!((elapsed_of(&channel, 0) - 600.0).abs() < 1e-9, "leftover grows");
    }

    #[test]
    fn one_shot_fires_once_then_is_removed() {
        let (channel, _clock, _source) = channel();
        let (count, cb) = counter();
        channel.schedule_once(1000.0, cb, OnceOptions::new());

        channel.advance(400.0).advance(400.0);
        assert_eq!(count.get(), 0);
        channel.advance(400.0);
        assert_eq!(count.get(), 1);
        assert!(channel.is_empty(), "one-shot removed after firing");
        channel.advance(5000.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn intervals_are_floored() {
        let (channel, _clock, _source) = channel();
        let (count, cb) = counter();
        channel.schedule_periodic(10.9, cb, PeriodicOptions::new());
        channel.advance(10.0);
        assert_eq!(count.get(), 1);
        assert_eq!(floor_ms(-3.0), 0);
        assert_eq!(floor_ms(f64::NAN), 0);
    }

    #[test]
    fn cancel_by_name_and_all() {
        let (channel, clock, _source) = channel();
        let (x_count, x) = counter();
        let (y_count, y) = counter();
        let (x2_count, x2) = counter();
        channel
            .schedule_periodic(10.0, x, PeriodicOptions::new().named("x"))
            .schedule_periodic(10.0, y, PeriodicOptions::new().named("y"))
            .schedule_once(10.0, x2, OnceOptions::new().named("x"))
            .start();

        channel.cancel(Some("x"));
        assert!(!channel.contains("x"));
        assert!(channel.contains("y"));
        assert!(channel.is_running(), "cancel leaves running state alone");

        channel.advance(10.0);
        assert_eq!((x_count.get(), y_count.get(), x2_count.get()), (0, 1, 0));

        channel.cancel(None);
        assert!(channel.is_empty());
        assert!(channel.is_running());
        assert!(clock.is_active());
    }

    #[test]
    fn zero_interval_fires_every_clock_tick() {
        let (channel, clock, source) = channel();
        let (count, cb) = counter();
        channel.schedule_periodic(0.0, cb, PeriodicOptions::new()).start();
        assert!(clock.is_active());

        source.fire(HostTime(0));
        source.fire(HostTime(7));
        source.fire(HostTime(30));
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn stop_and_start_preserve_elapsed_time() {
        let (channel, clock, source) = channel();
        let (count, cb) = counter();
        channel.schedule_periodic(50.0, cb, PeriodicOptions::new()).start();
        source.fire(HostTime(0));
        source.fire(HostTime(30));

        channel.stop().stop();
        assert!(!channel.is_running());
        assert!(!clock.is_active(), "last subscriber left");

        channel.start().start();
        assert_eq!(clock.subscriber_count(), 1, "start is idempotent");
        source.fire(HostTime(1_000));
        source.fire(HostTime(1_020));
        assert_eq!(count.get(), 1, "30 ms kept + 20 ms reaches the interval");
    }

    #[test]
    fn fire_immediately_runs_outside_tick_accounting() {
        let (channel, _clock, _source) = channel();
        let (count, cb) = counter();
        channel.schedule_periodic(100.0, cb, PeriodicOptions::new().fire_immediately());
        assert_eq!(count.get(), 1);
        assert!(elapsed_of(&channel, 0).abs() < 1e-9, "elapsed untouched");

        channel.advance(99.0);
        assert_eq!(count.get(), 1);
        channel.advance(1.0);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn failing_action_keeps_its_schedule() {
        let (channel, _clock, _source) = channel();
        let attempts = Rc::new(Cell::new(0));
        let inner = Rc::clone(&attempts);
        let (count, cb) = counter();
        channel
            .schedule_periodic(
                10.0,
                move || {
                    inner.set(inner.get() + 1);
                    Err(CallbackError::new("nope"))
                },
                PeriodicOptions::new().fire_immediately(),
            )
            .schedule_periodic(10.0, cb, PeriodicOptions::new());

        channel.advance(10.0).advance(10.0);
        assert_eq!(attempts.get(), 3, "retried on schedule");
        assert_eq!(count.get(), 2, "sibling unaffected");
    }

    #[test]
    fn actions_added_mid_tick_wait_and_cancelled_ones_stop() {
        let (channel, _clock, _source) = channel();
        let order = Rc::new(RefCell::new(Vec::new()));

        let handle = channel.clone();
        let log = Rc::clone(&order);
        channel.schedule_periodic(
            10.0,
            move || {
                log.borrow_mut().push("first");
                handle.cancel(Some("victim"));
                let log = Rc::clone(&log);
                handle.schedule_once(
                    0.0,
                    move || {
                        log.borrow_mut().push("late");
                        Ok(())
                    },
                    OnceOptions::new(),
                );
                Ok(())
            },
            PeriodicOptions::new().named("first"),
        );
        let log = Rc::clone(&order);
        channel.schedule_periodic(
            10.0,
            move || {
                log.borrow_mut().push("victim");
                Ok(())
            },
            PeriodicOptions::new().named("victim"),
        );

        channel.advance(10.0);
        assert_eq!(*order.borrow(), vec!["first"]);

        channel.cancel(Some("first"));
        channel.advance(10.0);
        assert_eq!(*order.borrow(), vec!["first", "late"]);
        assert!(channel.is_empty());
    }

    #[test]
    fn catch_up_stops_when_action_cancels_itself() {
        let (channel, _clock, _source) = channel();
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let handle = channel.clone();
        channel.schedule_periodic(
            10.0,
            move || {
                inner.set(inner.get() + 1);
                handle.cancel(Some("self"));
                Ok(())
            },
            PeriodicOptions::new().named("self"),
        );
        channel.advance(50.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn destroy_is_terminal() {
        let (channel, clock, _source) = channel();
        let (count, cb) = counter();
        channel.schedule_periodic(10.0, cb, PeriodicOptions::new()).start();
        channel.destroy();
        assert!(channel.is_destroyed());
        assert!(!channel.is_running());
        assert!(!clock.is_active());

        let (_, again) = counter();
        channel.schedule_once(0.0, again, OnceOptions::new()).start();
        assert!(channel.is_empty(), "scheduling ignored after destroy");
        assert!(!channel.is_running(), "start ignored after destroy");
        channel.advance(100.0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn dropping_last_handle_unsubscribes() {
        let (channel, clock, _source) = channel();
        channel.start();
        assert!(clock.is_active());
        drop(channel);
        assert!(!clock.is_active());
    }
}
