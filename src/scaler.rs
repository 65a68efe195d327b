//! Device-pixel-ratio correction for the canvas surface.
//!
//! The backing store is sized in device pixels while the element keeps its
//! logical CSS size; a uniform scale transform then lets every drawing command
//! be issued in logical units.

use crate::config::{Layout, CANVAS_FONT};
use crate::error::BridgeError;

/// Vendor-prefixed backing store ratio properties, probed in order.
pub const BACKING_STORE_PROPERTIES: [&str; 5] = [
    "webkitBackingStorePixelRatio",
    "mozBackingStorePixelRatio",
    "msBackingStorePixelRatio",
    "oBackingStorePixelRatio",
    "backingStorePixelRatio",
];

/// The subset of a 2D drawing context the bridge and simulations rely on.
pub trait CanvasContext {
    fn scale(&self, x: f64, y: f64) -> Result<(), BridgeError>;
    fn set_image_smoothing_enabled(&self, enabled: bool);
    fn set_font(&self, font: &str);
    fn set_text_baseline(&self, baseline: &str);
    fn set_fill_style(&self, style: &str);
    fn fill_rect(&self, x: f64, y: f64, width: f64, height: f64);
    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), BridgeError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub logical_width: f64,
    pub logical_height: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub ratio: f64,
}

impl CanvasGeometry {
    pub fn new(layout: &Layout, device_pixel_ratio: f64, backing_store_ratio: Option<f64>) -> Self {
        Self {
            logical_width: layout.logical_width(),
            logical_height: layout.logical_height(),
            cell_width: layout.cell_width,
            cell_height: layout.cell_height,
            ratio: pixel_ratio_correction(device_pixel_ratio, backing_store_ratio),
        }
    }

    pub fn device_width(&self) -> u32 {
        (self.logical_width * self.ratio).round() as u32
    }

    pub fn device_height(&self) -> u32 {
        (self.logical_height * self.ratio).round() as u32
    }

    pub fn css_width(&self) -> String {
        format!("{}px", self.logical_width)
    }

    pub fn css_height(&self) -> String {
        format!("{}px", self.logical_height)
    }
}

/// `device_pixel_ratio / backing_store_ratio`; absent or nonsensical inputs count as 1.
pub fn pixel_ratio_correction(device_pixel_ratio: f64, backing_store_ratio: Option<f64>) -> f64 {
    let sane = |value: f64| if value.is_finite() && value > 0.0 { value } else { 1.0 };

    sane(device_pixel_ratio) / sane(backing_store_ratio.unwrap_or(1.0))
}

/// Applies the transform and text settings. Must run after the canvas element
/// has been sized, since resizing resets context state.
pub fn configure<C: CanvasContext + ?Sized>(context: &C, geometry: &CanvasGeometry) -> Result<(), BridgeError> {
    context.scale(geometry.ratio, geometry.ratio)?;
    context.set_image_smoothing_enabled(false);
    context.set_font(CANVAS_FONT);
    context.set_text_baseline("top");

    Ok(())
}
