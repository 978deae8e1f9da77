// Copyright 2026 the Kinema Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSS placement of the drawing surface.

use alloc::format;

use kinema_core::backend::SurfacePlacement;
use kurbo::Size;
use wasm_bindgen::JsCast as _;
use web_sys::{Element, HtmlElement};

/// Positions an element absolutely within its parent, in CSS pixels.
///
/// The first placement gives the element `position: absolute`. Each time
/// the element is placed under a different parent, a statically positioned
/// parent is promoted to `position: relative`, so `left`/`top` are measured
/// from the parent's padding box.
pub struct CanvasSurface {
    element: HtmlElement,
    prepared: bool,
    parent: Option<Element>,
}

impl core::fmt::Debug for CanvasSurface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasSurface")
            .field("element", &"HtmlElement")
            .field("prepared", &self.prepared)
            .field("parent", &self.parent.is_some())
            .finish()
    }
}

impl CanvasSurface {
    /// Wraps `element`. Nothing is changed until the first placement.
    #[must_use]
    pub fn new(element: HtmlElement) -> Self {
        Self {
            element,
            prepared: false,
            parent: None,
        }
    }

    /// Returns the placed element.
    #[must_use]
    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    fn prepare(&mut self) {
        if !self.prepared {
            let _ = self.element.style().set_property("position", "absolute");
            self.prepared = true;
        }
        let parent = self.element.parent_element();
        if parent_changed(self.parent.as_ref(), parent.as_ref()) {
            if let Some(parent) = &parent {
                ensure_positioned(parent);
            }
            self.parent = parent;
        }
    }
}

impl SurfacePlacement for CanvasSurface {
    fn place_at(&mut self, x: i32, y: i32) {
        self.prepare();
        let s = self.element.style();
        let _ = s.set_property("left", &format!("{x}px"));
        let _ = s.set_property("top", &format!("{y}px"));
    }
}

/// Returns `true` when the element now sits under a different parent than
/// the one last prepared.
fn parent_changed<T: PartialEq>(prepared: Option<&T>, current: Option<&T>) -> bool {
    prepared != current
}

/// Gives a statically positioned element `position: relative`.
fn ensure_positioned(element: &Element) {
    let position = computed_property(element, "position");
    if matches!(position.as_deref(), None | Some("" | "static"))
        && let Ok(element) = element.clone().dyn_into::<HtmlElement>()
    {
        let _ = element.style().set_property("position", "relative");
    }
}

fn computed_property(element: &Element, name: &str) -> Option<alloc::string::String> {
    let style = web_sys::window()?.get_computed_style(element).ok()??;
    style.get_property_value(name).ok()
}

/// Parses a computed CSS length such as `"12.5px"`.
fn parse_px(value: &str) -> Option<f64> {
    value.trim().strip_suffix("px")?.trim().parse().ok()
}

/// Returns the content-box size of `element`: its client size minus
/// padding, in CSS pixels.
///
/// Returns `None` when the element is not rendered (zero client size) or
/// its computed style is unavailable. Suitable as a dynamic camera base
/// size:
///
/// ```rust,ignore
/// let container = canvas.parent_element().unwrap();
/// let config = CameraConfig::centered().with_dynamic_size(move || content_box_size(&container));
/// ```
#[must_use]
pub fn content_box_size(element: &Element) -> Option<Size> {
    let width = f64::from(element.client_width());
    let height = f64::from(element.client_height());
    if width <= 0.0 && height <= 0.0 {
        return None;
    }
    let padding = |name: &str| {
        computed_property(element, name)
            .as_deref()
            .and_then(parse_px)
            .unwrap_or(0.0)
    };
    let size = Size::new(
        width - padding("padding-left") - padding("padding-right"),
        height - padding("padding-top") - padding("padding-bottom"),
    );
    Some(Size::new(size.width.max(0.0), size.height.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reparenting_is_detected() {
        assert!(parent_changed(None, Some(&1)), "first parent");
        assert!(!parent_changed(Some(&1), Some(&1)), "same parent");
        assert!(parent_changed(Some(&1), Some(&2)), "moved to another parent");
        assert!(parent_changed(Some(&1), None), "detached");
        assert!(!parent_changed::<u8>(None, None), "still detached");
    }

    #[test]
    fn parses_pixel_lengths() {
        assert_eq!(parse_px("12px"), Some(12.0));
        assert_eq!(parse_px(" 3.5px "), Some(3.5));
        assert_eq!(parse_px("auto"), None);
        assert_eq!(parse_px("4em"), None);
    }
}
