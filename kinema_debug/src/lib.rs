// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for kinema
//! diagnostics.
//!
//! This crate provides [`TraceSink`](kinema_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! Install a sink on a clock with
//! [`Clock::set_trace_sink`](kinema_core::clock::Clock::set_trace_sink).
//! Wrap it in `Rc<RefCell<_>>` first to read it back afterwards.

pub mod chrome;
pub mod pretty;
pub mod recorder;
