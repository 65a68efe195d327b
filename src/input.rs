/// Live bounding box of a surface element, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A box with no area belongs to a surface that is not laid out.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Pointer position normalised to `[0, 1] x [0, 1]` over the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
}

impl PointerSample {
    /// Samples outside the surface are dropped, never clamped.
    pub fn normalize(client_x: f64, client_y: f64, bounds: &BoundingBox) -> Option<Self> {
        if bounds.is_degenerate() {
            return None;
        }

        let x = (client_x - bounds.left) / bounds.width;
        let y = (client_y - bounds.top) / bounds.height;

        if (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y) {
            Some(Self { x, y })
        } else {
            None
        }
    }
}

/// Raw key code, forwarded to the simulation verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: u32,
}

impl KeyEvent {
    pub fn new(code: u32) -> Self {
        Self { code }
    }
}
