// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport strategies.
//!
//! Once per frame the orchestrator asks the active [`ViewportStrategy`] for
//! a world offset and a logical surface size, given the optionally followed
//! entity. Two strategies are provided:
//!
//! - [`Cage`] moves the surface itself so it sits exactly over the followed
//!   entity. It is the only strategy that [places](ViewportStrategy::place_surface)
//!   the surface.
//! - [`Camera`] keeps the surface fixed and pans the world offset, either
//!   centering the entity or following it through a deadzone.
//!
//! Strategies hold no state besides the stored offset; the offset snaps to
//! the computed value every frame.

mod cage;
mod camera;

pub use cage::Cage;
pub use camera::{BaseSize, Camera, CameraConfig, Follow};

use kurbo::{Point, Size};

use crate::backend::SurfacePlacement;
use crate::error::GeometryError;
use crate::scene::Renderable;

/// Logical size used when nothing else determines one.
pub const DEFAULT_SIZE: Size = Size::new(64.0, 64.0);

/// Computes the world offset and logical size for each frame.
pub trait ViewportStrategy {
    /// Recomputes the stored world offset from `entity`.
    ///
    /// With no entity the offset resets to the origin.
    fn update_follow(&mut self, entity: Option<&dyn Renderable>) -> Result<(), GeometryError>;

    /// World coordinate that maps to the surface's top-left corner.
    fn world_offset(&self) -> Point;

    /// Size of the drawing surface in logical pixels.
    fn logical_size(&self, entity: Option<&dyn Renderable>) -> Result<Size, GeometryError>;

    /// Updates the offset from `entity` and returns this frame's logical
    /// size. Called once per frame by the orchestrator.
    ///
    /// Strategies whose size source is costly or may change between calls
    /// override this to evaluate it once.
    fn layout(&mut self, entity: Option<&dyn Renderable>) -> Result<Size, GeometryError> {
        self.update_follow(entity)?;
        self.logical_size(entity)
    }

    /// Returns `true` if this strategy moves the surface.
    fn places_surface(&self) -> bool {
        false
    }

    /// Moves the surface to match the stored offset. Only called when
    /// [`places_surface`](Self::places_surface) is `true`.
    fn place_surface(&self, surface: &mut dyn SurfacePlacement, entity: Option<&dyn Renderable>) {
        _ = (surface, entity);
    }
}
