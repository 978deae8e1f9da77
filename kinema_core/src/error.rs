// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Two failure classes reach callers of this crate:
//!
//! - [`GeometryError`]: a setup mistake in viewport geometry (a size that
//!   cannot be inferred or is not a usable number). Returned synchronously to
//!   whoever asked for the computation.
//! - [`CallbackError`]: the failure value a user callback returns. The clock
//!   and action channels record these through the trace sink and carry on;
//!   they are never propagated.
//!
//! Backend crates define their own construction errors for resources that
//! are missing on the host platform.

use alloc::string::String;
use core::fmt;

/// Invalid or missing geometry input.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A width or height was NaN or infinite.
    #[error("size {width}x{height} is not finite")]
    NonFiniteSize {
        /// Offending width.
        width: f64,
        /// Offending height.
        height: f64,
    },
    /// A width or height was negative.
    #[error("size {width}x{height} is negative")]
    NegativeSize {
        /// Offending width.
        width: f64,
        /// Offending height.
        height: f64,
    },
    /// An entity scale was NaN, infinite or negative.
    #[error("scale {0} is not a finite non-negative number")]
    InvalidScale(f64),
    /// An entity position was NaN or infinite.
    #[error("position ({x}, {y}) is not finite")]
    NonFinitePosition {
        /// Offending x coordinate.
        x: f64,
        /// Offending y coordinate.
        y: f64,
    },
}

/// Failure reported by a user-supplied tick or action callback.
#[derive(Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Creates an error carrying `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackError({:?})", self.message)
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<GeometryError> for CallbackError {
    fn from(err: GeometryError) -> Self {
        use alloc::string::ToString as _;
        Self {
            message: err.to_string(),
        }
    }
}

/// Outcome of one callback invocation.
///
/// The scheduler inspects the value only to record failures; an `Err` never
/// changes what runs next.
pub type CallbackResult = Result<(), CallbackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_error_converts_into_callback_error() {
        let err = CallbackError::from(GeometryError::InvalidScale(-1.0));
        assert_eq!(err.message(), "scale -1 is not a finite non-negative number");
    }

    #[test]
    fn callback_error_from_str_and_string() {
        assert_eq!(CallbackError::from("boom"), CallbackError::new("boom"));
        assert_eq!(
            CallbackError::from(String::from("boom")).message(),
            "boom",
            "message is carried verbatim"
        );
    }
}
