// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::fmt;

use kurbo::{Point, Size, Vec2};

use super::{DEFAULT_SIZE, ViewportStrategy};
use crate::error::GeometryError;
use crate::scene::{Renderable, check_size};

/// How a [`Camera`] tracks the followed entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Follow {
    /// Keep the entity's visual center in the middle of the surface.
    #[default]
    Center,
    /// Pan only when the entity's center leaves a rectangle of the given
    /// half extents around the viewport center.
    Deadzone {
        /// Horizontal half extent.
        dx: f64,
        /// Vertical half extent.
        dy: f64,
    },
    /// Leave the offset where it is.
    None,
}

/// Logical size configured independently of the followed entity.
#[derive(Clone)]
pub enum BaseSize {
    /// A constant size.
    Fixed(Size),
    /// Evaluated on every call, e.g. from a container's content box.
    /// Returning `None` falls back to the entity-derived size.
    Dynamic(Rc<dyn Fn() -> Option<Size>>),
}

impl BaseSize {
    /// Evaluates the base size.
    #[must_use]
    pub fn resolve(&self) -> Option<Size> {
        match self {
            Self::Fixed(size) => Some(*size),
            Self::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for BaseSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(size) => f.debug_tuple("Fixed").field(size).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// [`Camera`] configuration.
#[derive(Clone, Debug, Default)]
pub struct CameraConfig {
    /// Tracking mode.
    pub follow: Follow,
    /// Preferred logical size.
    pub base_size: Option<BaseSize>,
    /// Added to the entity-derived size when no base size applies.
    pub padding: Size,
}

impl CameraConfig {
    /// Centers the followed entity.
    #[must_use]
    pub fn centered() -> Self {
        Self::default()
    }

    /// Follows through a deadzone with half extents `(dx, dy)`.
    #[must_use]
    pub fn deadzone(dx: f64, dy: f64) -> Self {
        Self {
            follow: Follow::Deadzone { dx, dy },
            ..Self::default()
        }
    }

    /// Never pans.
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            follow: Follow::None,
            ..Self::default()
        }
    }

    /// Sets a constant base size.
    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.base_size = Some(BaseSize::Fixed(size));
        self
    }

    /// Sets a base size evaluated on every frame.
    #[must_use]
    pub fn with_dynamic_size(mut self, f: impl Fn() -> Option<Size> + 'static) -> Self {
        self.base_size = Some(BaseSize::Dynamic(Rc::new(f)));
        self
    }

    /// Sets the padding added to an entity-derived size.
    #[must_use]
    pub fn with_padding(mut self, padding: Size) -> Self {
        self.padding = padding;
        self
    }
}

/// Fixed surface with a panning world offset.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    config: CameraConfig,
    offset: Point,
}

impl Camera {
    /// Creates a camera at the origin.
    #[must_use]
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            offset: Point::ORIGIN,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Changes the tracking mode, keeping the current offset.
    pub fn set_follow(&mut self, follow: Follow) {
        self.config.follow = follow;
    }

    /// Moves the offset by hand. Useful with [`Follow::None`].
    pub fn set_world_offset(&mut self, offset: Point) {
        self.offset = offset;
    }

    /// Moves the offset toward `entity` for a surface of `size`.
    fn track(&mut self, entity: &dyn Renderable, size: Size) -> Result<(), GeometryError> {
        match self.config.follow {
            Follow::None => {}
            Follow::Center => {
                let center = entity.bounds()?.center();
                self.offset = center - size.to_vec2() / 2.0;
            }
            Follow::Deadzone { dx, dy } => {
                let center = entity.bounds()?.center();
                self.offset += self.deadzone_shift(center, size, dx, dy);
            }
        }
        Ok(())
    }

    fn deadzone_shift(&self, center: Point, size: Size, dx: f64, dy: f64) -> Vec2 {
        let view_center = self.offset + size.to_vec2() / 2.0;
        Vec2::new(
            overshoot(center.x, view_center.x, dx.abs()),
            overshoot(center.y, view_center.y, dy.abs()),
        )
    }
}

/// Distance `value` lies outside `[mid - half, mid + half]`, signed.
fn overshoot(value: f64, mid: f64, half: f64) -> f64 {
    if value > mid + half {
        value - (mid + half)
    } else if value < mid - half {
        value - (mid - half)
    } else {
        0.0
    }
}

impl ViewportStrategy for Camera {
    fn update_follow(&mut self, entity: Option<&dyn Renderable>) -> Result<(), GeometryError> {
        let Some(entity) = entity else {
            self.offset = Point::ORIGIN;
            return Ok(());
        };
        if self.config.follow == Follow::None {
            return Ok(());
        }
        let size = self.logical_size(Some(entity))?;
        self.track(entity, size)
    }

    fn layout(&mut self, entity: Option<&dyn Renderable>) -> Result<Size, GeometryError> {
        let size = self.logical_size(entity)?;
        match entity {
            Some(entity) => self.track(entity, size)?,
            None => self.offset = Point::ORIGIN,
        }
        Ok(size)
    }

    fn world_offset(&self) -> Point {
        self.offset
    }

    fn logical_size(&self, entity: Option<&dyn Renderable>) -> Result<Size, GeometryError> {
        if let Some(size) = self.config.base_size.as_ref().and_then(BaseSize::resolve) {
            return check_size(size);
        }
        match entity {
            Some(entity) => check_size(entity.rendered_size()? + self.config.padding),
            None => Ok(DEFAULT_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::scene::test_support::TestSprite;

    fn sprite_centered_at(x: f64, y: f64) -> TestSprite {
        TestSprite::new(Point::new(x, y), 10.0, 10.0).centered()
    }

    #[test]
    fn deadzone_moves_only_by_overshoot() {
        let config = CameraConfig::deadzone(20.0, 20.0).with_size(Size::new(200.0, 200.0));
        let mut camera = Camera::new(config);
        // Viewport center is (100, 100).
        camera.update_follow(Some(&sprite_centered_at(110.0, 105.0))).unwrap();
        assert_eq!(camera.world_offset(), Point::ORIGIN, "inside the deadzone");

        camera.update_follow(Some(&sprite_centered_at(125.0, 100.0))).unwrap();
        assert_eq!(camera.world_offset(), Point::new(5.0, 0.0));

        camera.update_follow(Some(&sprite_centered_at(105.0, 60.0))).unwrap();
        assert_eq!(
            camera.world_offset(),
            Point::new(5.0, -20.0),
            "moves up by the overshoot past the top edge"
        );
    }

    #[test]
    fn center_mode_centers_entity() {
        let mut camera = Camera::new(CameraConfig::centered().with_size(Size::new(100.0, 50.0)));
        camera.update_follow(Some(&sprite_centered_at(300.0, 200.0))).unwrap();
        assert_eq!(camera.world_offset(), Point::new(250.0, 175.0));
    }

    #[test]
    fn none_mode_freezes_offset() {
        let mut camera = Camera::new(CameraConfig::fixed());
        camera.set_world_offset(Point::new(12.0, 34.0));
        camera.update_follow(Some(&sprite_centered_at(500.0, 500.0))).unwrap();
        assert_eq!(camera.world_offset(), Point::new(12.0, 34.0));

        camera.update_follow(None).unwrap();
        assert_eq!(camera.world_offset(), Point::ORIGIN, "no entity resets");
    }

    #[test]
    fn frozen_camera_ignores_unusable_entity_position() {
        let mut camera = Camera::new(CameraConfig::fixed());
        camera.set_world_offset(Point::new(12.0, 34.0));
        let lost = TestSprite::new(Point::new(f64::NAN, 0.0), 10.0, 10.0);

        assert_eq!(camera.update_follow(Some(&lost)), Ok(()));
        assert_eq!(camera.layout(Some(&lost)), Ok(Size::new(10.0, 10.0)));
        assert_eq!(camera.world_offset(), Point::new(12.0, 34.0));
    }

    #[test]
    fn layout_evaluates_dynamic_size_once() {
        let calls = Rc::new(Cell::new(0_u32));
        let counter = Rc::clone(&calls);
        let mut camera = Camera::new(CameraConfig::centered().with_dynamic_size(move || {
            counter.set(counter.get() + 1);
            Some(Size::new(100.0, 50.0))
        }));

        let size = camera.layout(Some(&sprite_centered_at(300.0, 200.0)));
        assert_eq!(size, Ok(Size::new(100.0, 50.0)));
        assert_eq!(camera.world_offset(), Point::new(250.0, 175.0));
        assert_eq!(calls.get(), 1, "one evaluation per frame");

        assert_eq!(camera.layout(None), Ok(Size::new(100.0, 50.0)));
        assert_eq!(camera.world_offset(), Point::ORIGIN, "no entity resets");
        assert_eq!(calls.get(), 2, "one evaluation per frame");
    }

    #[test]
    fn logical_size_prefers_base_then_entity_then_default() {
        let sprite = TestSprite::new(Point::ORIGIN, 30.0, 20.0);
        let padded = Camera::new(CameraConfig::centered().with_padding(Size::new(4.0, 6.0)));
        assert_eq!(padded.logical_size(Some(&sprite)), Ok(Size::new(34.0, 26.0)));
        assert_eq!(padded.logical_size(None), Ok(DEFAULT_SIZE));

        let fixed = Camera::new(CameraConfig::centered().with_size(Size::new(320.0, 240.0)));
        assert_eq!(fixed.logical_size(Some(&sprite)), Ok(Size::new(320.0, 240.0)));
    }

    #[test]
    fn dynamic_base_size_is_evaluated_each_call() {
        let width = Rc::new(Cell::new(Some(100.0)));
        let source = Rc::clone(&width);
        let camera = Camera::new(
            CameraConfig::centered()
                .with_dynamic_size(move || source.get().map(|w| Size::new(w, 50.0))),
        );
        assert_eq!(camera.logical_size(None), Ok(Size::new(100.0, 50.0)));
        width.set(Some(180.0));
        assert_eq!(camera.logical_size(None), Ok(Size::new(180.0, 50.0)));
        width.set(None);
        assert_eq!(camera.logical_size(None), Ok(DEFAULT_SIZE), "falls back");
    }

    #[test]
    fn invalid_base_size_is_an_error() {
        let camera = Camera::new(CameraConfig::centered().with_size(Size::new(f64::NAN, 1.0)));
        assert!(matches!(
            camera.logical_size(None),
            Err(GeometryError::NonFiniteSize { .. })
        ));
    }
}
