// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderable entity query.
//!
//! Entities are owned elsewhere (sprite pools, view bookkeeping). The frame
//! loop only needs to read a few properties from each one, described by
//! [`Renderable`], and a way to enumerate the current set, described by
//! [`EntitySource`].

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::{Point, Rect, Size, Vec2};

use crate::error::GeometryError;

/// Which point of an entity its position refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Position is the top-left corner.
    #[default]
    TopLeft,
    /// Position is the visual center.
    Center,
}

/// Mirroring applied when drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flip {
    /// Mirror left-right.
    pub horizontal: bool,
    /// Mirror top-bottom.
    pub vertical: bool,
}

impl Flip {
    /// No mirroring.
    pub const NONE: Self = Self {
        horizontal: false,
        vertical: false,
    };

    /// Left-right mirroring only.
    pub const HORIZONTAL: Self = Self {
        horizontal: true,
        vertical: false,
    };

    /// Top-bottom mirroring only.
    pub const VERTICAL: Self = Self {
        horizontal: false,
        vertical: true,
    };

    /// Per-axis scale factors (`1` or `-1`).
    #[must_use]
    pub fn factors(self) -> Vec2 {
        Vec2::new(
            if self.horizontal { -1.0 } else { 1.0 },
            if self.vertical { -1.0 } else { 1.0 },
        )
    }
}

/// Handle to an image registered with a drawing backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(pub u32);

/// Read-only view of something the frame loop can draw.
pub trait Renderable {
    /// Hidden entities are skipped by the draw pass.
    fn is_visible(&self) -> bool {
        true
    }

    /// World position of the [`anchor`](Self::anchor) point.
    fn position(&self) -> Point;

    /// Which point [`position`](Self::position) refers to.
    fn anchor(&self) -> Anchor {
        Anchor::TopLeft
    }

    /// Uniform scale applied to the source frame.
    fn scale(&self) -> f64 {
        1.0
    }

    /// Mirroring applied when drawing.
    fn flip(&self) -> Flip {
        Flip::NONE
    }

    /// Source rectangle of the current animation frame, in image pixels.
    fn frame(&self) -> Rect;

    /// Image the frame is cut from.
    fn image(&self) -> ImageId;

    /// Sort key; lower values draw first.
    fn draw_order(&self) -> f64 {
        0.0
    }

    /// On-screen size: source frame size times scale.
    fn rendered_size(&self) -> Result<Size, GeometryError> {
        let scale = self.scale();
        if !scale.is_finite() || scale < 0.0 {
            return Err(GeometryError::InvalidScale(scale));
        }
        check_size(self.frame().size() * scale)
    }

    /// World position of the top-left corner.
    fn top_left(&self) -> Result<Point, GeometryError> {
        let position = self.position();
        if !position.is_finite() {
            return Err(GeometryError::NonFinitePosition {
                x: position.x,
                y: position.y,
            });
        }
        Ok(match self.anchor() {
            Anchor::TopLeft => position,
            Anchor::Center => position - self.rendered_size()?.to_vec2() / 2.0,
        })
    }

    /// World-space bounding rectangle.
    fn bounds(&self) -> Result<Rect, GeometryError> {
        Ok(Rect::from_origin_size(self.top_left()?, self.rendered_size()?))
    }
}

/// Rejects sizes that are negative or not finite.
pub fn check_size(size: Size) -> Result<Size, GeometryError> {
    if !size.is_finite() {
        return Err(GeometryError::NonFiniteSize {
            width: size.width,
            height: size.height,
        });
    }
    if size.width < 0.0 || size.height < 0.0 {
        return Err(GeometryError::NegativeSize {
            width: size.width,
            height: size.height,
        });
    }
    Ok(size)
}

/// Enumerates the entities to draw this frame.
pub trait EntitySource {
    /// Appends the current entities to `out`, in any order.
    fn collect(&self, out: &mut Vec<Rc<dyn Renderable>>);
}

impl EntitySource for Vec<Rc<dyn Renderable>> {
    fn collect(&self, out: &mut Vec<Rc<dyn Renderable>>) {
        out.extend(self.iter().cloned());
    }
}

impl<T: EntitySource + ?Sized> EntitySource for Rc<RefCell<T>> {
    fn collect(&self, out: &mut Vec<Rc<dyn Renderable>>) {
        if let Ok(source) = self.try_borrow() {
            source.collect(out);
        }
    }
}

/// Stable sort by ascending [`Renderable::draw_order`].
pub fn sorted_by_draw_order(entities: &mut [Rc<dyn Renderable>]) {
    entities.sort_by(|a, b| a.draw_order().total_cmp(&b.draw_order()));
}

#[cfg(test)]
pub(crate) mod test_support {
    use core::cell::Cell;

    use super::*;

    /// Minimal renderable with interior-mutable position.
    #[derive(Debug)]
    pub(crate) struct TestSprite {
        pub(crate) position: Cell<Point>,
        pub(crate) anchor: Anchor,
        pub(crate) scale: f64,
        pub(crate) frame: Rect,
        pub(crate) visible: Cell<bool>,
        pub(crate) order: f64,
        pub(crate) image: ImageId,
    }

    impl TestSprite {
        pub(crate) fn new(position: Point, width: f64, height: f64) -> Self {
            Self {
                position: Cell::new(position),
                anchor: Anchor::TopLeft,
                scale: 1.0,
                frame: Rect::new(0.0, 0.0, width, height),
                visible: Cell::new(true),
                order: 0.0,
                image: ImageId(0),
            }
        }

        pub(crate) fn centered(mut self) -> Self {
            self.anchor = Anchor::Center;
            self
        }

        pub(crate) fn with_order(mut self, order: f64) -> Self {
            self.order = order;
            self
        }

        pub(crate) fn with_scale(mut self, scale: f64) -> Self {
            self.scale = scale;
            self
        }

        pub(crate) fn with_image(mut self, image: u32) -> Self {
            self.image = ImageId(image);
            self
        }
    }

    impl Renderable for TestSprite {
        fn is_visible(&self) -> bool {
            self.visible.get()
        }

        fn position(&self) -> Point {
            self.position.get()
        }

        fn anchor(&self) -> Anchor {
            self.anchor
        }

        fn scale(&self) -> f64 {
            self.scale
        }

        fn frame(&self) -> Rect {
            self.frame
        }

        fn image(&self) -> ImageId {
            self.image
        }

        fn draw_order(&self) -> f64 {
            self.order
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::test_support::TestSprite;
    use super::*;

    #[test]
    fn center_anchor_offsets_by_half_size() {
        let sprite = TestSprite::new(Point::new(50.0, 50.0), 10.0, 5.0)
            .centered()
            .with_scale(2.0);
        assert_eq!(sprite.rendered_size(), Ok(Size::new(20.0, 10.0)));
        assert_eq!(sprite.top_left(), Ok(Point::new(40.0, 45.0)));
        assert_eq!(sprite.bounds(), Ok(Rect::new(40.0, 45.0, 60.0, 55.0)));
    }

    #[test]
    fn invalid_geometry_is_reported() {
        let sprite = TestSprite::new(Point::ORIGIN, 8.0, 8.0).with_scale(-1.0);
        assert_eq!(sprite.rendered_size(), Err(GeometryError::InvalidScale(-1.0)));

        let lost = TestSprite::new(Point::new(f64::INFINITY, 0.0), 8.0, 8.0);
        assert!(matches!(
            lost.top_left(),
            Err(GeometryError::NonFinitePosition { .. })
        ));
        assert!(matches!(
            check_size(Size::new(-1.0, 4.0)),
            Err(GeometryError::NegativeSize { .. })
        ));
    }

    fn ordered(order: f64, image: u32) -> Rc<dyn Renderable> {
        Rc::new(
            TestSprite::new(Point::ORIGIN, 1.0, 1.0)
                .with_order(order)
                .with_image(image),
        )
    }

    #[test]
    fn draw_order_sort_is_stable() {
        let mut entities = vec![
            ordered(2.0, 0),
            ordered(1.0, 1),
            ordered(2.0, 2),
            ordered(-1.0, 3),
        ];
        sorted_by_draw_order(&mut entities);
        let images: Vec<u32> = entities.iter().map(|e| e.image().0).collect();
        assert_eq!(images, [3, 1, 0, 2]);
    }

    #[test]
    fn shared_source_collects_through_refcell() {
        let list = vec![ordered(0.0, 0)];
        let shared = Rc::new(RefCell::new(list));
        let mut out = Vec::new();
        shared.collect(&mut out);
        assert_eq!(out.len(), 1);
    }
}
