// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pulse timestamps and timebase conversion.
//!
//! A frame pulse carries a [`HostTime`]: a monotonic timestamp in whatever
//! tick unit the host pulse source uses (microseconds for the browser's
//! `requestAnimationFrame`, milliseconds for hand-driven tests).
//!
//! [`Timebase`] carries the rational conversion factor from ticks to
//! nanoseconds, and [`Duration`] is a span in the same tick units. The
//! [`Clock`](crate::clock::Clock) works in these units internally and only
//! converts to floating-point milliseconds at the subscriber boundary.

use core::fmt;
use core::ops::{Add, Sub};

/// A monotonic pulse timestamp in host-specific ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns the span between `self` and an earlier timestamp, or zero if
    /// `earlier` is actually later.
    ///
    /// Pulse sources are allowed to report non-monotonic timestamps (e.g.
    /// after a clock adjustment); this never underflows.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Creates a timestamp from fractional milliseconds.
    ///
    /// Negative and non-finite inputs map to zero.
    #[inline]
    #[must_use]
    pub fn from_millis_f64(ms: f64, timebase: Timebase) -> Self {
        Self(timebase.millis_to_ticks(ms))
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Rational conversion factor from ticks to nanoseconds.
///
/// `nanoseconds = ticks * numer / denom`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the ticks-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// Ticks are nanoseconds.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Ticks are microseconds (the web backend's unit).
    pub const MICROS: Self = Self {
        numer: 1_000,
        denom: 1,
    };

    /// Ticks are milliseconds.
    pub const MILLIS: Self = Self {
        numer: 1_000_000,
        denom: 1,
    };

    /// Creates a new timebase with the given numerator and denominator.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(denom != 0, "timebase denominator must not be zero");
        Self { numer, denom }
    }

    /// Converts a tick count to nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        let wide = ticks as u128 * self.numer as u128 / self.denom as u128;
        wide as u64
    }

    /// Converts a tick count to fractional milliseconds.
    #[inline]
    #[must_use]
    pub fn ticks_to_millis(self, ticks: u64) -> f64 {
        self.ticks_to_nanos(ticks) as f64 / 1_000_000.0
    }

    /// Converts fractional milliseconds to a tick count.
    ///
    /// Negative and non-finite inputs map to zero; the result saturates at
    /// `u64::MAX`.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "float-to-int `as` casts saturate and map NaN to zero"
    )]
    pub fn millis_to_ticks(self, ms: f64) -> u64 {
        if ms.is_nan() || ms <= 0.0 || self.numer == 0 {
            return 0;
        }
        (ms * 1_000_000.0 * f64::from(self.denom) / f64::from(self.numer)) as u64
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

/// A span between two pulses, in host ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Converts this duration to fractional milliseconds.
    #[inline]
    #[must_use]
    pub fn to_millis_f64(self, timebase: Timebase) -> f64 {
        timebase.ticks_to_millis(self.0)
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_timebase_converts_to_millis() {
        let tb = Timebase::MICROS;
        assert_eq!(tb.ticks_to_nanos(1), 1_000, "1 µs tick");
        assert!(
            (tb.ticks_to_millis(16_667) - 16.667).abs() < 1e-9,
            "16667 µs is 16.667 ms"
        );
    }

    #[test]
    fn millis_round_trip() {
        let tb = Timebase::MILLIS;
        let t = HostTime::from_millis_f64(250.0, tb);
        assert_eq!(t, HostTime(250));
        assert!((Duration(250).to_millis_f64(tb) - 250.0).abs() < 1e-9, "250 ms");
    }

    #[test]
    fn negative_and_nan_millis_map_to_zero() {
        let tb = Timebase::MICROS;
        assert_eq!(tb.millis_to_ticks(-5.0), 0);
        assert_eq!(tb.millis_to_ticks(f64::NAN), 0);
        assert_eq!(HostTime::from_millis_f64(1.5, tb), HostTime(1_500));
    }

    #[test]
    fn backwards_timestamps_saturate() {
        let later = HostTime(1_000);
        let earlier = HostTime(400);
        assert_eq!(later.saturating_duration_since(earlier), Duration(600));
        assert_eq!(earlier.saturating_duration_since(later), Duration::ZERO);
        assert_eq!((later - earlier).ticks(), 600);
        assert_eq!(earlier + Duration(600), later);
    }
}
