// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame scheduling and viewport tracking for 2D sprite animation.
//!
//! `kinema_core` turns an external frame pulse into delta-time ticks, runs
//! per-owner timers on those ticks and sequences one draw pass per frame
//! through a viewport strategy. It is `no_std` compatible (with `alloc`),
//! single-threaded and never generates time on its own.
//!
//! # Architecture
//!
//! ```text
//!   Backend (pulse source)
//!       │ HostTime
//!       ▼
//!   Clock::pulse() ──► subscribers (delta_ms, accumulated_ms)
//!       │                    │
//!       │                    ├──► ActionChannel::advance() ──► timer callbacks
//!       │                    │
//!       │                    └──► FrameOrchestrator frame
//!       │                              │
//!       │                    ViewportStrategy::layout
//!       │                              │
//!       │                              ▼
//!       └── request next pulse    DrawBackend (size, place, clear, pass, draw)
//! ```
//!
//! **[`clock`]**: The shared [`Clock`](clock::Clock). Fans pulses out to
//! subscribers, clamps deltas and stops requesting pulses when idle.
//!
//! **[`action`]**: [`ActionChannel`](action::ActionChannel), with periodic and
//! one-shot timers and catch-up.
//!
//! **[`viewport`]**: The [`Cage`](viewport::Cage) and
//! [`Camera`](viewport::Camera) strategies.
//!
//! **[`orchestrator`]**: [`FrameOrchestrator`](orchestrator::FrameOrchestrator)
//! sequences viewport update, surface sizing and the draw pass.
//!
//! **[`scene`]**: The [`Renderable`](scene::Renderable) entity query.
//!
//! **[`backend`]**: The [`DrawBackend`](backend::DrawBackend) contract that
//! platform backends implement.
//!
//! **[`time`]**: Host timestamps and timebase conversion.
//!
//! **[`error`]**: Geometry and callback errors.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use kinema_core::action::{ActionChannel, PeriodicOptions};
//! use kinema_core::clock::{Clock, ClockConfig, ManualPulse};
//! use kinema_core::time::HostTime;
//!
//! let source = Rc::new(ManualPulse::new());
//! let clock = Clock::new(ClockConfig::millis(), source.clone());
//!
//! let blinks = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&blinks);
//! let channel = ActionChannel::new(&clock);
//! channel
//!     .schedule_periodic(
//!         250.0,
//!         move || {
//!             counter.set(counter.get() + 1);
//!             Ok(())
//!         },
//!         PeriodicOptions::new().named("blink"),
//!     )
//!     .start();
//!
//! source.fire(HostTime(0));
//! source.fire(HostTime(80));
//! source.fire(HostTime(160));
//! source.fire(HostTime(260));
//! assert_eq!(blinks.get(), 1);
//! ```
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod action;
pub mod backend;
pub mod clock;
pub mod error;
pub mod orchestrator;
pub mod scene;
pub mod time;
pub mod trace;
pub mod viewport;
