//! An in-memory [`Host`] with no display attached.
//!
//! Elements live in a flat node arena, listeners and animation frames are
//! queued until the caller dispatches or pumps them, and canvases rasterise
//! rectangle fills into an RGBA buffer. The command line runner drives bridges
//! through it, and it records enough to inspect what a bridge did to its host.

use crate::cell::{CellRecord, Rgb};
use crate::error::BridgeError;
use crate::host::{ElementKind, FrameCallback, Host, KeyCallback, ListenerKind, PointerCallback};
use crate::input::BoundingBox;
use crate::scaler::{CanvasContext, CanvasGeometry};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Body,
    Container,
    Element(ElementKind),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub id: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub text: String,
    pub styles: BTreeMap<String, String>,
    pub cell: Option<CellRecord>,
    pub bounds: BoundingBox,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            id: None,
            parent,
            children: Vec::new(),
            text: String::new(),
            styles: BTreeMap::new(),
            cell: None,
            bounds: BoundingBox::default(),
        }
    }
}

/// How many listeners of each kind were registered and removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStats {
    pub pointer_added: usize,
    pub pointer_removed: usize,
    pub key_added: usize,
    pub key_removed: usize,
}

impl ListenerStats {
    pub fn active(&self) -> usize {
        (self.pointer_added - self.pointer_removed) + (self.key_added - self.key_removed)
    }
}

#[derive(Debug)]
pub struct HeadlessListener {
    id: usize,
    kind: ListenerKind,
}

#[derive(Debug, Clone)]
struct CanvasState {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    scale: (f64, f64),
    smoothing: bool,
    font: String,
    baseline: String,
    fill: Rgb,
    rect_fills: usize,
    text_fills: usize,
}

impl CanvasState {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            scale: (1.0, 1.0),
            smoothing: true,
            font: "10px sans-serif".to_string(),
            baseline: "alphabetic".to_string(),
            fill: Rgb::BLACK,
            rect_fills: 0,
            text_fills: 0,
        }
    }
}

/// Drawing context of a headless canvas element.
#[derive(Debug, Clone)]
pub struct HeadlessCanvas {
    state: Rc<RefCell<CanvasState>>,
}

impl HeadlessCanvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(CanvasState::new(width, height))),
        }
    }

    /// Resizing clears the backing store and resets all context state.
    fn resize(&self, width: u32, height: u32) {
        *self.state.borrow_mut() = CanvasState::new(width, height);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let state = self.state.borrow();
        (state.width, state.height)
    }

    pub fn transform_scale(&self) -> (f64, f64) {
        self.state.borrow().scale
    }

    pub fn image_smoothing_enabled(&self) -> bool {
        self.state.borrow().smoothing
    }

    pub fn font(&self) -> String {
        self.state.borrow().font.clone()
    }

    pub fn text_baseline(&self) -> String {
        self.state.borrow().baseline.clone()
    }

    pub fn rect_fills(&self) -> usize {
        self.state.borrow().rect_fills
    }

    pub fn text_fills(&self) -> usize {
        self.state.borrow().text_fills
    }

    /// Colour of the device pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let state = self.state.borrow();

        if x >= state.width || y >= state.height {
            return None;
        }

        let offset = (y as usize * state.width as usize + x as usize) * 4;
        let px = &state.pixels[offset..offset + 4];

        Some(Rgb::new(px[0], px[1], px[2]))
    }

    pub fn pixels(&self) -> Vec<u8> {
        self.state.borrow().pixels.clone()
    }
}

impl CanvasContext for HeadlessCanvas {
    fn scale(&self, x: f64, y: f64) -> Result<(), BridgeError> {
        let mut state = self.state.borrow_mut();
        state.scale = (state.scale.0 * x, state.scale.1 * y);
        Ok(())
    }

    fn set_image_smoothing_enabled(&self, enabled: bool) {
        self.state.borrow_mut().smoothing = enabled;
    }

    fn set_font(&self, font: &str) {
        self.state.borrow_mut().font = font.to_string();
    }

    fn set_text_baseline(&self, baseline: &str) {
        self.state.borrow_mut().baseline = baseline.to_string();
    }

    fn set_fill_style(&self, style: &str) {
        // unparseable styles are ignored, like in a browser
        if let Some(color) = Rgb::from_css(style) {
            self.state.borrow_mut().fill = color;
        }
    }

    fn fill_rect(&self, x: f64, y: f64, width: f64, height: f64) {
        let mut state = self.state.borrow_mut();
        state.rect_fills += 1;

        let (sx, sy) = state.scale;
        let clamp_x = |v: f64| v.max(0.0).min(state.width as f64) as usize;
        let clamp_y = |v: f64| v.max(0.0).min(state.height as f64) as usize;

        let (x0, x1) = (clamp_x((x * sx).round()), clamp_x(((x + width) * sx).round()));
        let (y0, y1) = (clamp_y((y * sy).round()), clamp_y(((y + height) * sy).round()));
        let row = state.width as usize;
        let fill = state.fill;

        for py in y0..y1 {
            for px in x0..x1 {
                let offset = (py * row + px) * 4;
                state.pixels[offset..offset + 4].copy_from_slice(&[fill.r, fill.g, fill.b, 255]);
            }
        }
    }

    fn fill_text(&self, _text: &str, _x: f64, _y: f64) -> Result<(), BridgeError> {
        self.state.borrow_mut().text_fills += 1;
        Ok(())
    }
}

struct HeadlessState {
    nodes: Vec<Node>,
    canvases: HashMap<NodeId, HeadlessCanvas>,
    pointer_listeners: Vec<(usize, Rc<RefCell<PointerCallback>>)>,
    key_listeners: Vec<(usize, Rc<RefCell<KeyCallback>>)>,
    next_listener: usize,
    stats: ListenerStats,
    frames: Vec<FrameCallback>,
    device_pixel_ratio: f64,
    backing_store_ratio: Option<f64>,
    node_limit: Option<usize>,
}

impl HeadlessState {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, Some(parent)));

        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }

        id
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };

        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
    }

    fn is_attached(&self, mut id: NodeId) -> bool {
        loop {
            match self.node(id) {
                Some(Node { kind: NodeKind::Body, .. }) => return true,
                Some(Node { parent: Some(parent), .. }) => id = *parent,
                _ => return false,
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };

        if node.kind == NodeKind::Element(ElementKind::LineBreak) {
            out.push('\n');
            return;
        }

        out.push_str(&node.text);

        for child in &node.children {
            self.collect_text(*child, out);
        }
    }
}

pub struct HeadlessHost {
    state: RefCell<HeadlessState>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                nodes: vec![Node::new(NodeKind::Body, None)],
                canvases: HashMap::new(),
                pointer_listeners: Vec::new(),
                key_listeners: Vec::new(),
                next_listener: 0,
                stats: ListenerStats::default(),
                frames: Vec::new(),
                device_pixel_ratio: 1.0,
                backing_store_ratio: None,
                node_limit: None,
            }),
        }
    }

    pub fn with_pixel_ratio(self, device_pixel_ratio: f64, backing_store_ratio: Option<f64>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.device_pixel_ratio = device_pixel_ratio;
            state.backing_store_ratio = backing_store_ratio;
        }

        self
    }

    /// Makes `create_element` fail once the arena holds `limit` nodes.
    /// Detached nodes stay in the arena and keep counting.
    pub fn set_node_limit(&self, limit: Option<usize>) {
        self.state.borrow_mut().node_limit = limit;
    }

    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    pub fn body(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends a container with the given id to the body.
    pub fn add_container(&self, id: &str) -> NodeId {
        let mut state = self.state.borrow_mut();
        let node = state.push(NodeKind::Container, NodeId(0));

        if let Some(container) = state.node_mut(node) {
            container.id = Some(id.to_string());
        }

        node
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.state.borrow().node(id).cloned()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|node| node.children).unwrap_or_default()
    }

    /// Number of direct children of `parent` carrying the id `id`.
    pub fn children_with_id(&self, parent: NodeId, id: &str) -> usize {
        let state = self.state.borrow();

        state
            .node(parent)
            .map(|node| {
                node.children
                    .iter()
                    .filter(|child| state.node(**child).and_then(|c| c.id.as_deref()) == Some(id))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.state.borrow().is_attached(id)
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        self.node(id).and_then(|node| node.styles.get(property).cloned())
    }

    pub fn cell(&self, id: NodeId) -> Option<CellRecord> {
        self.node(id).and_then(|node| node.cell)
    }

    /// Painted records of the grid cells below `id`, in document order.
    pub fn cells(&self, id: NodeId) -> Vec<CellRecord> {
        let state = self.state.borrow();

        state
            .node(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| state.node(*child))
                    .filter(|child| child.kind == NodeKind::Element(ElementKind::Cell))
                    .map(|child| child.cell.unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rendered text of `id` and its descendants; line breaks become `\n`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.state.borrow().collect_text(id, &mut out);
        out
    }

    pub fn set_bounds(&self, id: NodeId, bounds: BoundingBox) {
        if let Some(node) = self.state.borrow_mut().node_mut(id) {
            node.bounds = bounds;
        }
    }

    pub fn canvas(&self, id: NodeId) -> Option<HeadlessCanvas> {
        self.state.borrow().canvases.get(&id).cloned()
    }

    pub fn listener_stats(&self) -> ListenerStats {
        self.state.borrow().stats
    }

    pub fn dispatch_pointer_move(&self, client_x: f64, client_y: f64) {
        let listeners: Vec<_> = self
            .state
            .borrow()
            .pointer_listeners
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        for listener in listeners {
            (&mut *listener.borrow_mut())(client_x, client_y);
        }
    }

    pub fn dispatch_key_down(&self, code: u32) {
        let listeners: Vec<_> = self
            .state
            .borrow()
            .key_listeners
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        for listener in listeners {
            (&mut *listener.borrow_mut())(code);
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// Runs every animation callback requested so far, as one display
    /// refresh would. Callbacks requested meanwhile wait for the next call.
    pub fn advance_frame(&self) -> usize {
        let frames = std::mem::take(&mut self.state.borrow_mut().frames);
        let count = frames.len();

        for frame in frames {
            frame();
        }

        count
    }

    pub fn advance_frames(&self, refreshes: usize) {
        for _ in 0..refreshes {
            self.advance_frame();
        }
    }

    /// Picture of a canvas or grid surface; grid cells are drawn as solid
    /// background blocks of `cell_size` pixels.
    #[cfg(feature = "image")]
    pub fn snapshot(&self, id: NodeId, cell_size: (u32, u32)) -> Option<image::RgbaImage> {
        if let Some(canvas) = self.canvas(id) {
            let (width, height) = canvas.dimensions();
            return image::RgbaImage::from_raw(width, height, canvas.pixels());
        }

        let node = self.node(id)?;
        if node.kind != NodeKind::Element(ElementKind::Block) {
            return None;
        }

        let columns = node
            .children
            .iter()
            .filter_map(|child| self.node(*child))
            .take_while(|child| child.kind != NodeKind::Element(ElementKind::LineBreak))
            .count()
            .max(1);
        let cells = self.cells(id);
        let rows = (cells.len() + columns - 1) / columns;

        let mut output = image::RgbaImage::new(columns as u32 * cell_size.0, rows as u32 * cell_size.1);

        for (i, record) in cells.iter().enumerate() {
            let (cx, cy) = ((i % columns) as u32, (i / columns) as u32);
            let bg = record.background;

            for py in 0..cell_size.1 {
                for px in 0..cell_size.0 {
                    output.put_pixel(
                        cx * cell_size.0 + px,
                        cy * cell_size.1 + py,
                        image::Rgba([bg.r, bg.g, bg.b, 255]),
                    );
                }
            }
        }

        Some(output)
    }

    fn set_style(&self, id: NodeId, property: &str, value: &str) {
        if let Some(node) = self.state.borrow_mut().node_mut(id) {
            node.styles.insert(property.to_string(), value.to_string());
        }
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for HeadlessHost {
    type Element = NodeId;
    type Canvas = HeadlessCanvas;
    type Listener = HeadlessListener;

    fn container(&self, id: Option<&str>) -> Option<NodeId> {
        let Some(id) = id else {
            return Some(self.body());
        };

        let state = self.state.borrow();

        (0..state.nodes.len())
            .map(NodeId)
            .find(|node| state.node(*node).and_then(|n| n.id.as_deref()) == Some(id) && state.is_attached(*node))
    }

    fn remove_child_by_id(&self, container: &NodeId, id: &str) -> bool {
        let mut state = self.state.borrow_mut();

        let found = state.node(*container).and_then(|node| {
            node.children
                .iter()
                .copied()
                .find(|child| state.node(*child).and_then(|c| c.id.as_deref()) == Some(id))
        });

        match found {
            Some(child) => {
                state.detach(child);
                true
            }
            None => false,
        }
    }

    fn set_flex_layout(&self, container: &NodeId) -> Result<(), BridgeError> {
        self.set_style(*container, "display", "flex");
        Ok(())
    }

    fn create_element(&self, kind: ElementKind, parent: &NodeId) -> Result<NodeId, BridgeError> {
        let mut state = self.state.borrow_mut();

        if state.node_limit.map_or(false, |limit| state.nodes.len() >= limit) {
            return Err(BridgeError::Host("node limit reached".to_string()));
        }

        if state.node(*parent).is_none() {
            return Err(BridgeError::Host(format!("unknown parent node {:?}", parent)));
        }

        Ok(state.push(NodeKind::Element(kind), *parent))
    }

    fn set_id(&self, element: &NodeId, id: &str) {
        if let Some(node) = self.state.borrow_mut().node_mut(*element) {
            node.id = Some(id.to_string());
        }
    }

    fn style_text(&self, element: &NodeId) -> Result<(), BridgeError> {
        self.set_style(*element, "padding", "0");
        self.set_style(*element, "line-height", "1");
        self.set_style(*element, "font-family", crate::config::TEXT_FONT_FAMILY);
        Ok(())
    }

    fn set_text(&self, element: &NodeId, text: &str) {
        if let Some(node) = self.state.borrow_mut().node_mut(*element) {
            node.text = text.to_string();
        }
    }

    fn canvas_context(&self, element: &NodeId) -> Result<HeadlessCanvas, BridgeError> {
        let mut state = self.state.borrow_mut();
        let kind = state.node(*element).map(|node| node.kind);

        match kind {
            Some(NodeKind::Element(ElementKind::Canvas)) => Ok(state
                .canvases
                .entry(*element)
                // browsers default a fresh canvas to 300x150
                .or_insert_with(|| HeadlessCanvas::new(300, 150))
                .clone()),
            _ => Err(BridgeError::Host("Canvas should have 2d context".to_string())),
        }
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.state.borrow().device_pixel_ratio
    }

    fn backing_store_ratio(&self, _context: &HeadlessCanvas) -> Option<f64> {
        self.state.borrow().backing_store_ratio
    }

    fn size_canvas(&self, element: &NodeId, geometry: &CanvasGeometry) -> Result<(), BridgeError> {
        let canvas = self.canvas_context(element)?;
        canvas.resize(geometry.device_width(), geometry.device_height());

        self.set_style(*element, "width", &geometry.css_width());
        self.set_style(*element, "height", &geometry.css_height());

        if let Some(node) = self.state.borrow_mut().node_mut(*element) {
            node.bounds.width = geometry.logical_width;
            node.bounds.height = geometry.logical_height;
        }

        Ok(())
    }

    fn paint_cell(&self, element: &NodeId, record: &CellRecord) -> Result<(), BridgeError> {
        let mut state = self.state.borrow_mut();
        let node = state
            .node_mut(*element)
            .ok_or_else(|| BridgeError::Host(format!("unknown cell node {:?}", element)))?;

        node.cell = Some(*record);
        node.text = record.glyph().to_string();
        node.styles.insert("background-color".to_string(), record.background.to_css());
        node.styles.insert("color".to_string(), record.foreground.to_css());

        Ok(())
    }

    fn bounding_box(&self, element: &NodeId) -> BoundingBox {
        self.node(*element).map(|node| node.bounds).unwrap_or_default()
    }

    fn remove(&self, element: &NodeId) {
        self.state.borrow_mut().detach(*element);
    }

    fn add_pointer_listener(&self, callback: PointerCallback) -> Result<HeadlessListener, BridgeError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener;

        state.next_listener += 1;
        state.stats.pointer_added += 1;
        state.pointer_listeners.push((id, Rc::new(RefCell::new(callback))));

        Ok(HeadlessListener {
            id,
            kind: ListenerKind::PointerMove,
        })
    }

    fn add_key_listener(&self, callback: KeyCallback) -> Result<HeadlessListener, BridgeError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener;

        state.next_listener += 1;
        state.stats.key_added += 1;
        state.key_listeners.push((id, Rc::new(RefCell::new(callback))));

        Ok(HeadlessListener {
            id,
            kind: ListenerKind::KeyDown,
        })
    }

    fn remove_listener(&self, listener: HeadlessListener) {
        let mut state = self.state.borrow_mut();

        match listener.kind {
            ListenerKind::PointerMove => {
                let before = state.pointer_listeners.len();
                state.pointer_listeners.retain(|(id, _)| *id != listener.id);
                state.stats.pointer_removed += before - state.pointer_listeners.len();
            }
            ListenerKind::KeyDown => {
                let before = state.key_listeners.len();
                state.key_listeners.retain(|(id, _)| *id != listener.id);
                state.stats.key_removed += before - state.key_listeners.len();
            }
        }
    }

    fn request_animation_frame(&self, callback: FrameCallback) -> Result<(), BridgeError> {
        self.state.borrow_mut().frames.push(callback);
        Ok(())
    }
}
