// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 2D canvas drawing backend.
//!
//! Draws entity frames with `drawImage`, cutting the source rectangle out of
//! a registered image and scaling it to the entity's rendered size. Image
//! smoothing is disabled so pixel art stays crisp.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use kinema_core::backend::{Background, DrawBackend, SurfacePlacement};
use kinema_core::scene::{ImageId, Renderable};
use kurbo::{Size, Vec2};
use wasm_bindgen::JsCast as _;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, HtmlImageElement};

use crate::BackendError;
use crate::surface::CanvasSurface;

/// Draws onto an `HtmlCanvasElement` through its 2D context.
pub struct CanvasBackend {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    surface: CanvasSurface,
    images: Vec<HtmlImageElement>,
    size: Option<Size>,
}

impl core::fmt::Debug for CanvasBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasBackend")
            .field("canvas", &"HtmlCanvasElement")
            .field("images", &self.images.len())
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl CanvasBackend {
    /// Acquires the 2D context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ContextUnavailable`] if the browser does not
    /// hand out a 2D context for this canvas.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, BackendError> {
        let context = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or(BackendError::ContextUnavailable)?;
        context.set_image_smoothing_enabled(false);
        let surface = CanvasSurface::new(canvas.clone().unchecked_into::<HtmlElement>());
        Ok(Self {
            canvas,
            context,
            surface,
            images: Vec::new(),
            size: None,
        })
    }

    /// Registers an image and returns its handle.
    pub fn add_image(&mut self, image: HtmlImageElement) -> ImageId {
        let id = ImageId(u32::try_from(self.images.len()).unwrap_or(u32::MAX));
        self.images.push(image);
        id
    }

    /// Returns the canvas element.
    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Returns the 2D context.
    #[must_use]
    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.context
    }

    fn image(&self, id: ImageId) -> Option<&HtmlImageElement> {
        self.images.get(usize::try_from(id.0).ok()?)
    }
}

/// Rounds a logical length to a canvas dimension.
#[expect(
    clippy::cast_possible_truncation,
    reason = "sizes are validated finite and non-negative; `as` saturates"
)]
fn pixels(length: f64) -> u32 {
    let rounded = (length + 0.5) as u64;
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

fn css_color(background: Background) -> Option<String> {
    match background {
        Background::Transparent => None,
        Background::Solid(c) => Some(format!(
            "rgba({}, {}, {}, {})",
            c.r,
            c.g,
            c.b,
            f64::from(c.a) / 255.0
        )),
    }
}

impl DrawBackend for CanvasBackend {
    fn set_logical_size(&mut self, size: Size) {
        if self.size == Some(size) {
            return;
        }
        self.size = Some(size);
        let (w, h) = (pixels(size.width), pixels(size.height));
        self.canvas.set_width(w);
        self.canvas.set_height(h);
        let s = self.surface.element().style();
        let _ = s.set_property("width", &format!("{w}px"));
        let _ = s.set_property("height", &format!("{h}px"));
        // Resizing resets the context state.
        self.context.set_image_smoothing_enabled(false);
    }

    fn clear(&mut self, background: Background) {
        let width = f64::from(self.canvas.width());
        let height = f64::from(self.canvas.height());
        let _ = self.context.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        self.context.clear_rect(0.0, 0.0, width, height);
        if let Some(color) = css_color(background) {
            self.context.set_fill_style_str(&color);
            self.context.fill_rect(0.0, 0.0, width, height);
        }
    }

    fn begin_pass(&mut self, translation: Vec2) {
        self.context.save();
        let _ = self.context.translate(translation.x, translation.y);
    }

    fn draw(&mut self, entity: &dyn Renderable) {
        let Some(image) = self.image(entity.image()) else {
            return;
        };
        let (Ok(top_left), Ok(size)) = (entity.top_left(), entity.rendered_size()) else {
            return;
        };
        let flip = entity.flip();
        let factors = flip.factors();
        let frame = entity.frame();

        let ctx = &self.context;
        ctx.save();
        let _ = ctx.translate(
            top_left.x + if flip.horizontal { size.width } else { 0.0 },
            top_left.y + if flip.vertical { size.height } else { 0.0 },
        );
        let _ = ctx.scale(factors.x, factors.y);
        let _ = ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
            image,
            frame.x0,
            frame.y0,
            frame.width(),
            frame.height(),
            0.0,
            0.0,
            size.width,
            size.height,
        );
        ctx.restore();
    }

    fn end_pass(&mut self) {
        self.context.restore();
    }

    fn surface(&mut self) -> Option<&mut dyn SurfacePlacement> {
        Some(&mut self.surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::backend::Rgba8;

    #[test]
    fn logical_lengths_round_to_pixels() {
        assert_eq!(pixels(63.4), 63);
        assert_eq!(pixels(63.5), 64);
        assert_eq!(pixels(0.0), 0);
    }

    #[test]
    fn background_css() {
        assert_eq!(css_color(Background::Transparent), None);
        assert_eq!(
            css_color(Background::Solid(Rgba8::rgb(255, 0, 16))).as_deref(),
            Some("rgba(255, 0, 16, 1)")
        );
    }
}
