use crate::cell::CellRecord;
use crate::error::BridgeError;
use crate::input::BoundingBox;
use crate::scaler::{CanvasContext, CanvasGeometry};

pub type PointerCallback = Box<dyn FnMut(f64, f64)>;
pub type KeyCallback = Box<dyn FnMut(u32)>;
pub type FrameCallback = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Pre-formatted text container.
    Text,
    Canvas,
    /// Wrapper holding the cell pool of a grid surface.
    Block,
    Cell,
    LineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerMove,
    KeyDown,
}

/// Everything the bridge needs from its display environment.
///
/// Methods take `&self`: hosts are shared between the controller and the
/// callbacks it registers, and must tolerate re-entry from those callbacks.
pub trait Host {
    type Element: Clone;
    type Canvas: CanvasContext;
    type Listener;

    /// Resolves a container by id, or the document body when `id` is `None`.
    fn container(&self, id: Option<&str>) -> Option<Self::Element>;

    /// Removes the child of `container` carrying `id`, if any.
    fn remove_child_by_id(&self, container: &Self::Element, id: &str) -> bool;

    fn set_flex_layout(&self, container: &Self::Element) -> Result<(), BridgeError>;

    fn create_element(&self, kind: ElementKind, parent: &Self::Element) -> Result<Self::Element, BridgeError>;

    fn set_id(&self, element: &Self::Element, id: &str);

    /// Monospace, unpadded styling of a text surface.
    fn style_text(&self, element: &Self::Element) -> Result<(), BridgeError>;

    fn set_text(&self, element: &Self::Element, text: &str);

    fn canvas_context(&self, element: &Self::Element) -> Result<Self::Canvas, BridgeError>;

    fn device_pixel_ratio(&self) -> f64;

    fn backing_store_ratio(&self, context: &Self::Canvas) -> Option<f64>;

    /// Sizes the backing store in device pixels and the element in CSS pixels.
    fn size_canvas(&self, element: &Self::Element, geometry: &CanvasGeometry) -> Result<(), BridgeError>;

    fn paint_cell(&self, element: &Self::Element, record: &CellRecord) -> Result<(), BridgeError>;

    fn bounding_box(&self, element: &Self::Element) -> BoundingBox;

    fn remove(&self, element: &Self::Element);

    fn add_pointer_listener(&self, callback: PointerCallback) -> Result<Self::Listener, BridgeError>;

    fn add_key_listener(&self, callback: KeyCallback) -> Result<Self::Listener, BridgeError>;

    fn remove_listener(&self, listener: Self::Listener);

    fn request_animation_frame(&self, callback: FrameCallback) -> Result<(), BridgeError>;
}
