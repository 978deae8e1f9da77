// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for drawing surfaces.
//!
//! Kinema splits platform-specific work into *backend* crates. Each backend
//! provides the following pieces:
//!
//! - **Pulse source**: Implements [`PulseSource`] on top of a platform frame
//!   callback (e.g. `requestAnimationFrame`) and feeds [`HostTime`] stamps
//!   into the [`Clock`].
//!
//! - **Time**: `now() -> HostTime` and `timebase() -> Timebase` free
//!   functions that read the platform's monotonic clock.
//!
//! - **Drawing**: Implements [`DrawBackend`] to clear the surface, set its
//!   logical size and draw entity frames inside a translated pass.
//!
//! - **Placement**: Optionally implements [`SurfacePlacement`] so viewport
//!   strategies that move the surface itself (the cage) can position it.
//!
//! # Crate boundaries
//!
//! `kinema_core` owns the clock, action channels, viewport strategies, the
//! orchestrator and this contract module. Backend crates depend on
//! `kinema_core` and provide platform glue. Application code depends on both
//! and wires them together.
//!
//! [`PulseSource`]: crate::clock::PulseSource
//! [`Clock`]: crate::clock::Clock
//! [`HostTime`]: crate::time::HostTime

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use crate::scene::{Flip, ImageId, Renderable};

/// An 8-bit-per-channel, non-premultiplied color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// What the surface is cleared to before each draw pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Background {
    /// Fully transparent.
    #[default]
    Transparent,
    /// A solid fill.
    Solid(Rgba8),
}

/// Moves the drawing surface on screen.
pub trait SurfacePlacement {
    /// Places the surface's top-left corner at integer pixel `(x, y)`
    /// relative to its container.
    fn place_at(&mut self, x: i32, y: i32);
}

/// Draws entity frames onto a surface.
///
/// The orchestrator calls the methods in this order every frame:
///
/// ```text
/// set_logical_size → [surface().place_at] → clear → begin_pass → draw* → end_pass
/// ```
pub trait DrawBackend {
    /// Resizes the surface to `size` logical pixels. Called every frame;
    /// implementations skip the work when the size did not change.
    fn set_logical_size(&mut self, size: Size);

    /// Clears the whole surface.
    fn clear(&mut self, background: Background);

    /// Starts a pass in which world coordinates are shifted by `translation`.
    fn begin_pass(&mut self, translation: Vec2);

    /// Draws one visible entity in world coordinates.
    fn draw(&mut self, entity: &dyn Renderable);

    /// Ends the current pass.
    fn end_pass(&mut self);

    /// Returns the placement handle if this backend's surface can move.
    fn surface(&mut self) -> Option<&mut dyn SurfacePlacement> {
        None
    }
}

// ---------------------------------------------------------------------------
// RecordingBackend
// ---------------------------------------------------------------------------

/// One call observed by a [`RecordingBackend`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// `set_logical_size`.
    SetLogicalSize(Size),
    /// `surface().place_at`.
    PlaceAt(i32, i32),
    /// `clear`.
    Clear(Background),
    /// `begin_pass`.
    BeginPass(Vec2),
    /// `draw`, with the entity's properties at the time of the call.
    Draw {
        /// Image drawn.
        image: ImageId,
        /// Source rectangle.
        frame: Rect,
        /// Entity top-left in world coordinates.
        top_left: Point,
        /// Entity scale.
        scale: f64,
        /// Entity mirroring.
        flip: Flip,
    },
    /// `end_pass`.
    EndPass,
}

/// A [`DrawBackend`] that records every call, for tests and headless hosts.
#[derive(Clone, Debug, Default)]
pub struct RecordingBackend {
    /// Calls in order.
    pub commands: Vec<Command>,
    movable: bool,
}

impl RecordingBackend {
    /// Creates a backend whose surface is fixed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose surface accepts placement.
    #[must_use]
    pub fn movable() -> Self {
        Self {
            commands: Vec::new(),
            movable: true,
        }
    }

    /// Removes and returns the recorded calls.
    pub fn take(&mut self) -> Vec<Command> {
        core::mem::take(&mut self.commands)
    }
}

impl DrawBackend for RecordingBackend {
    fn set_logical_size(&mut self, size: Size) {
        self.commands.push(Command::SetLogicalSize(size));
    }

    fn clear(&mut self, background: Background) {
        self.commands.push(Command::Clear(background));
    }

    fn begin_pass(&mut self, translation: Vec2) {
        self.commands.push(Command::BeginPass(translation));
    }

    fn draw(&mut self, entity: &dyn Renderable) {
        self.commands.push(Command::Draw {
            image: entity.image(),
            frame: entity.frame(),
            top_left: entity.top_left().unwrap_or(entity.position()),
            scale: entity.scale(),
            flip: entity.flip(),
        });
    }

    fn end_pass(&mut self) {
        self.commands.push(Command::EndPass);
    }

    fn surface(&mut self) -> Option<&mut dyn SurfacePlacement> {
        if self.movable { Some(self) } else { None }
    }
}

impl SurfacePlacement for RecordingBackend {
    fn place_at(&mut self, x: i32, y: i32) {
        self.commands.push(Command::PlaceAt(x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_recording_backend_has_no_surface() {
        let mut fixed = RecordingBackend::new();
        assert!(fixed.surface().is_none());

        let mut movable = RecordingBackend::movable();
        if let Some(surface) = movable.surface() {
            surface.place_at(3, -4);
        }
        assert_eq!(movable.take(), [Command::PlaceAt(3, -4)]);
        assert!(movable.commands.is_empty(), "take drains the log");
    }

    #[test]
    fn background_defaults_to_transparent() {
        assert_eq!(Background::default(), Background::Transparent);
        assert_eq!(Rgba8::rgb(1, 2, 3).a, 255);
    }
}
