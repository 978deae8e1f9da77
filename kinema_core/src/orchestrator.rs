// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame sequencing of viewport, surface and draw pass.
//!
//! A [`FrameOrchestrator`] subscribes to the [`Clock`] while playing. Each
//! tick it runs one frame:
//!
//! ```text
//! viewport layout ─► set_logical_size ─► [place_surface]
//!        ─► clear ─► begin_pass(−offset) ─► draw (ascending draw order) ─► end_pass
//! ```
//!
//! The followed entity is held weakly; once its owner drops it the viewport
//! behaves as if nothing were followed.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Size;

use crate::backend::{Background, DrawBackend};
use crate::clock::{Clock, Subscription};
use crate::error::{CallbackError, GeometryError};
use crate::scene::{EntitySource, Renderable, sorted_by_draw_order};
use crate::trace::FrameSummary;
use crate::viewport::ViewportStrategy;

/// Orchestrator configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// What each frame is cleared to.
    pub background: Background,
}

/// Notification delivered to lifecycle listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// [`FrameOrchestrator::play`] subscribed to the clock.
    Played,
    /// [`FrameOrchestrator::pause`] unsubscribed from the clock.
    Paused,
    /// A frame was drawn.
    Frame {
        /// Frame counter after the frame.
        frame_index: u64,
    },
    /// [`FrameOrchestrator::destroy`] ran.
    Destroyed,
}

type Listener = Rc<RefCell<Box<dyn FnMut(LifecycleEvent)>>>;

struct FrameState<B> {
    backend: B,
    viewport: Box<dyn ViewportStrategy>,
    entities: Option<Box<dyn EntitySource>>,
    follow: Option<Weak<dyn Renderable>>,
    config: OrchestratorConfig,
    frame_index: u64,
    draw_list: Vec<Rc<dyn Renderable>>,
}

impl<B: DrawBackend> FrameState<B> {
    /// Updates the viewport and applies size and placement to the surface.
    fn layout(&mut self) -> Result<Size, GeometryError> {
        let followed = self.follow.as_ref().and_then(Weak::upgrade);
        let followed = followed.as_deref();
        let size = self.viewport.layout(followed)?;
        self.backend.set_logical_size(size);
        if self.viewport.places_surface()
            && let Some(surface) = self.backend.surface()
        {
            self.viewport.place_surface(surface, followed);
        }
        Ok(size)
    }

    fn frame(&mut self, pulse_index: u64) -> Result<FrameSummary, GeometryError> {
        let logical_size = self.layout()?;
        let world_offset = self.viewport.world_offset();

        self.backend.clear(self.config.background);
        self.backend.begin_pass(-world_offset.to_vec2());

        self.draw_list.clear();
        if let Some(entities) = &self.entities {
            entities.collect(&mut self.draw_list);
        }
        sorted_by_draw_order(&mut self.draw_list);
        let (mut drawn, mut skipped) = (0_u32, 0_u32);
        for entity in &self.draw_list {
            if entity.is_visible() {
                self.backend.draw(entity.as_ref());
                drawn += 1;
            } else {
                skipped += 1;
            }
        }
        self.backend.end_pass();
        self.draw_list.clear();

        self.frame_index += 1;
        Ok(FrameSummary {
            frame_index: self.frame_index,
            pulse_index,
            world_offset,
            logical_size,
            drawn,
            skipped,
        })
    }
}

struct OrchestratorInner<B> {
    clock: Clock,
    state: RefCell<FrameState<B>>,
    subscription: RefCell<Option<Subscription>>,
    listeners: RefCell<Vec<Listener>>,
    destroyed: Cell<bool>,
}

impl<B> Drop for OrchestratorInner<B> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}

/// Drives a [`DrawBackend`] from the clock through a [`ViewportStrategy`].
///
/// Clones share the same orchestrator.
pub struct FrameOrchestrator<B> {
    inner: Rc<OrchestratorInner<B>>,
}

impl<B> Clone for FrameOrchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: DrawBackend + 'static> FrameOrchestrator<B> {
    /// Creates a paused orchestrator.
    pub fn new(
        clock: &Clock,
        backend: B,
        viewport: impl ViewportStrategy + 'static,
        entities: impl EntitySource + 'static,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Rc::new(OrchestratorInner {
                clock: clock.clone(),
                state: RefCell::new(FrameState {
                    backend,
                    viewport: Box::new(viewport),
                    entities: Some(Box::new(entities)),
                    follow: None,
                    config,
                    frame_index: 0,
                    draw_list: Vec::new(),
                }),
                subscription: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// Starts drawing on every clock tick.
    ///
    /// Does nothing if already playing or destroyed. Otherwise sizes and
    /// places the surface immediately, then subscribes to the clock. A
    /// geometry error from that first layout is returned and nothing is
    /// subscribed; errors on later ticks are reported to the trace sink.
    pub fn play(&self) -> Result<(), GeometryError> {
        let inner = &self.inner;
        if inner.destroyed.get() || inner.subscription.borrow().is_some() {
            return Ok(());
        }
        if let Ok(mut state) = inner.state.try_borrow_mut() {
            state.layout()?;
        }

        let weak = Rc::downgrade(inner);
        let subscription = inner.clock.subscribe(move |_, _| {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            let pulse_index = inner.clock.pulse_index();
            Self { inner }
                .run_frame(pulse_index)
                .map_err(CallbackError::from)
        });
        *inner.subscription.borrow_mut() = Some(subscription);
        self.emit(LifecycleEvent::Played);
        Ok(())
    }

    /// Stops drawing. Entity and viewport state is kept.
    pub fn pause(&self) {
        let subscription = self.inner.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            self.emit(LifecycleEvent::Paused);
        }
    }

    /// Pauses and releases the entity source and followed entity.
    ///
    /// The orchestrator cannot be played again.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.pause();
        if let Ok(mut state) = self.inner.state.try_borrow_mut() {
            state.entities = None;
            state.follow = None;
            state.draw_list = Vec::new();
        }
        self.emit(LifecycleEvent::Destroyed);
        self.inner.listeners.borrow_mut().clear();
    }

    /// Draws one frame now, outside the clock. Useful while paused.
    pub fn render_once(&self) -> Result<(), GeometryError> {
        if self.inner.destroyed.get() {
            return Ok(());
        }
        self.run_frame(0)
    }

    /// Sets (or clears) the followed entity. Only a weak reference is kept.
    pub fn set_follow(&self, entity: Option<&Rc<dyn Renderable>>) {
        if let Ok(mut state) = self.inner.state.try_borrow_mut() {
            state.follow = entity.map(Rc::downgrade);
        }
    }

    /// Returns the followed entity if it is still alive.
    #[must_use]
    pub fn follow(&self) -> Option<Rc<dyn Renderable>> {
        let state = self.inner.state.try_borrow().ok()?;
        state.follow.as_ref().and_then(Weak::upgrade)
    }

    /// Replaces the viewport strategy. Takes effect on the next frame.
    pub fn set_viewport(&self, viewport: impl ViewportStrategy + 'static) {
        if let Ok(mut state) = self.inner.state.try_borrow_mut() {
            state.viewport = Box::new(viewport);
        }
    }

    /// Changes what frames are cleared to.
    pub fn set_background(&self, background: Background) {
        if let Ok(mut state) = self.inner.state.try_borrow_mut() {
            state.config.background = background;
        }
    }

    /// Registers a lifecycle listener.
    pub fn on_lifecycle(&self, listener: impl FnMut(LifecycleEvent) + 'static) {
        if self.inner.destroyed.get() {
            return;
        }
        self.inner
            .listeners
            .borrow_mut()
            .push(Rc::new(RefCell::new(Box::new(listener))));
    }

    /// Runs `f` with the backend. Returns `None` while a frame is drawing.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        let mut state = self.inner.state.try_borrow_mut().ok()?;
        Some(f(&mut state.backend))
    }

    /// Number of frames drawn so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.inner.state.try_borrow().map_or(0, |s| s.frame_index)
    }

    /// Returns `true` while subscribed to the clock.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.inner.subscription.borrow().is_some()
    }

    /// Returns `true` after [`destroy`](Self::destroy).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    fn run_frame(&self, pulse_index: u64) -> Result<(), GeometryError> {
        let summary = {
            // A frame requested from inside a frame is dropped.
            let Ok(mut state) = self.inner.state.try_borrow_mut() else {
                return Ok(());
            };
            state.frame(pulse_index)?
        };
        self.inner.clock.tracer().frame_summary(&summary);
        self.emit(LifecycleEvent::Frame {
            frame_index: summary.frame_index,
        });
        Ok(())
    }

    fn emit(&self, event: LifecycleEvent) {
        let snapshot: Vec<Listener> = self.inner.listeners.borrow().clone();
        for listener in &snapshot {
            if let Ok(mut listener) = listener.try_borrow_mut() {
                listener(event);
            }
        }
    }
}

impl<B> fmt::Debug for FrameOrchestrator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        f.debug_struct("FrameOrchestrator")
            .field("playing", &inner.subscription.borrow().is_some())
            .field("destroyed", &inner.destroyed.get())
            .field(
                "frame_index",
                &inner.state.try_borrow().map(|s| s.frame_index).ok(),
            )
            .finish_non_exhaustive()
    }
}
