// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` pulse source.
//!
//! [`RafPulse`] answers the clock's pulse requests with the browser's
//! `requestAnimationFrame` API. Each callback receives a
//! [`DOMHighResTimeStamp`][mdn] (milliseconds from `performance.now()`),
//! which is converted to microsecond [`HostTime`] ticks and handed to
//! [`Clock::pulse`].
//!
//! At most one animation frame is outstanding; the clock requests the next
//! one after every pulse while it has subscribers and cancels it when the
//! last one leaves.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use kinema_core::clock::{Clock, PulseSource, WeakClock};
use kinema_core::time::{HostTime, Timebase};

// Global bindings, so no Window or Performance lookup per frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type RafClosure = Closure<dyn FnMut(f64)>;

struct RafInner {
    /// The JS closure registered with `requestAnimationFrame`. It holds only
    /// a weak reference back to this struct.
    closure: RafClosure,

    /// Clock that asked for the pending frame.
    target: RefCell<WeakClock>,

    /// The ID returned by the outstanding `requestAnimationFrame` call.
    raf_id: Cell<Option<i32>>,
}

/// A [`PulseSource`] backed by `requestAnimationFrame`.
///
/// Usually created through [`clock`](crate::clock), which wires a new
/// `RafPulse` into a [`Clock`] with the web configuration.
pub struct RafPulse {
    inner: Rc<RafInner>,
}

impl RafPulse {
    /// Creates a pulse source with nothing scheduled.
    #[must_use]
    pub fn new() -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<RafInner>| {
            let weak = weak.clone();
            let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.raf_id.set(None);
                let clock = inner.target.borrow().upgrade();
                if let Some(clock) = clock {
                    clock.pulse(HostTime::from_millis_f64(timestamp_ms, Timebase::MICROS));
                }
            }) as Box<dyn FnMut(f64)>);
            RafInner {
                closure,
                target: RefCell::new(WeakClock::default()),
                raf_id: Cell::new(None),
            }
        });
        Self { inner }
    }

    /// Returns `true` while an animation frame is requested.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.raf_id.get().is_some()
    }
}

impl Default for RafPulse {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseSource for RafPulse {
    fn request(&self, clock: &WeakClock) {
        *self.inner.target.borrow_mut() = clock.clone();
        if self.inner.raf_id.get().is_some() {
            return;
        }
        let id = request_animation_frame(self.inner.closure.as_ref().unchecked_ref());
        self.inner.raf_id.set(Some(id));
    }

    fn cancel(&self) {
        if let Some(id) = self.inner.raf_id.take() {
            cancel_animation_frame(id);
        }
    }
}

impl Drop for RafPulse {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl core::fmt::Debug for RafPulse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafPulse")
            .field("raf_id", &self.inner.raf_id.get())
            .finish_non_exhaustive()
    }
}

/// Creates a [`Clock`] driven by `requestAnimationFrame`.
#[must_use]
pub fn clock() -> Clock {
    Clock::new(
        kinema_core::clock::ClockConfig::web(),
        Rc::new(RafPulse::new()),
    )
}
