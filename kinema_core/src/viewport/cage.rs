// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Point, Size};

use super::{DEFAULT_SIZE, ViewportStrategy};
use crate::backend::SurfacePlacement;
use crate::error::GeometryError;
use crate::scene::Renderable;

/// Keeps the surface exactly over the followed entity.
///
/// The surface is as large as the entity's rendered frame and its top-left
/// corner tracks the entity's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cage {
    offset: Point,
}

impl Cage {
    /// Creates a cage at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset rounded to whole pixels.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "offsets are validated finite; `as` saturates beyond i32"
    )]
    fn pixel_offset(&self) -> (i32, i32) {
        let rounded = self.offset.round();
        (rounded.x as i32, rounded.y as i32)
    }
}

impl ViewportStrategy for Cage {
    fn update_follow(&mut self, entity: Option<&dyn Renderable>) -> Result<(), GeometryError> {
        self.offset = match entity {
            Some(entity) => entity.top_left()?,
            None => Point::ORIGIN,
        };
        Ok(())
    }

    fn world_offset(&self) -> Point {
        self.offset
    }

    fn logical_size(&self, entity: Option<&dyn Renderable>) -> Result<Size, GeometryError> {
        entity.map_or(Ok(DEFAULT_SIZE), |e| e.rendered_size())
    }

    fn places_surface(&self) -> bool {
        true
    }

    fn place_surface(&self, surface: &mut dyn SurfacePlacement, _entity: Option<&dyn Renderable>) {
        let (x, y) = self.pixel_offset();
        surface.place_at(x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Command, RecordingBackend};
    use crate::scene::test_support::TestSprite;

    #[test]
    fn centered_entity_offset_is_its_top_left() {
        let sprite = TestSprite::new(Point::new(50.0, 50.0), 20.0, 10.0).centered();
        let mut cage = Cage::new();
        cage.update_follow(Some(&sprite)).unwrap();
        assert_eq!(cage.world_offset(), Point::new(40.0, 45.0));
        assert_eq!(cage.logical_size(Some(&sprite)), Ok(Size::new(20.0, 10.0)));
    }

    #[test]
    fn top_left_anchor_uses_position() {
        let sprite = TestSprite::new(Point::new(7.0, -3.0), 4.0, 4.0);
        let mut cage = Cage::new();
        cage.update_follow(Some(&sprite)).unwrap();
        assert_eq!(cage.world_offset(), Point::new(7.0, -3.0));
    }

    #[test]
    fn no_entity_resets_to_origin_and_default_size() {
        let sprite = TestSprite::new(Point::new(9.0, 9.0), 4.0, 4.0);
        let mut cage = Cage::new();
        cage.update_follow(Some(&sprite)).unwrap();
        cage.update_follow(None).unwrap();
        assert_eq!(cage.world_offset(), Point::ORIGIN);
        assert_eq!(cage.logical_size(None), Ok(DEFAULT_SIZE));
    }

    #[test]
    fn placement_rounds_to_whole_pixels() {
        let sprite = TestSprite::new(Point::new(10.4, 20.6), 4.0, 4.0);
        let mut cage = Cage::new();
        cage.update_follow(Some(&sprite)).unwrap();
        assert!(cage.places_surface());

        let mut backend = RecordingBackend::movable();
        cage.place_surface(&mut backend, Some(&sprite));
        assert_eq!(backend.take(), [Command::PlaceAt(10, 21)]);
    }

    #[test]
    fn invalid_scale_is_reported() {
        let sprite = TestSprite::new(Point::ORIGIN, 4.0, 4.0)
            .centered()
            .with_scale(f64::NAN);
        let mut cage = Cage::new();
        assert!(cage.update_follow(Some(&sprite)).is_err());
    }
}
