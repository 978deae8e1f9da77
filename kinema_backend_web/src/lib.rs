// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for kinema.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`RafPulse`]: `requestAnimationFrame` pulse source, and [`clock`] to
//!   build a [`Clock`](kinema_core::clock::Clock) on top of it
//! - [`CanvasBackend`]: 2D canvas drawing backend
//! - [`CanvasSurface`]: absolute CSS placement of the canvas, used by the
//!   cage viewport
//! - [`content_box_size`]: container measurement for dynamic camera sizes

#![no_std]

extern crate alloc;

mod canvas;
mod raf;
mod surface;

pub use canvas::CanvasBackend;
pub use kinema_core::backend::DrawBackend;
pub use raf::{RafPulse, clock};
pub use surface::{CanvasSurface, content_box_size};

use kinema_core::time::{HostTime, Timebase};

/// Browser resources missing at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The canvas did not provide a 2D rendering context.
    #[error("2D canvas context is unavailable")]
    ContextUnavailable,
}

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks. Use [`timebase`] to
/// convert to nanoseconds.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(raf::performance_now(), timebase())
}

/// Returns the web [`Timebase`]: 1 tick = 1 µs = 1000 ns.
#[must_use]
pub fn timebase() -> Timebase {
    Timebase::MICROS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timebase_is_microsecond() {
        let tb = timebase();
        // 1 tick = 1 µs = 1000 ns
        assert_eq!(tb.ticks_to_nanos(1), 1000);
        assert_eq!(tb.ticks_to_nanos(1_000_000), 1_000_000_000);
    }

    #[test]
    fn backend_error_message() {
        use alloc::string::ToString as _;
        assert_eq!(
            BackendError::ContextUnavailable.to_string(),
            "2D canvas context is unavailable"
        );
    }
}
