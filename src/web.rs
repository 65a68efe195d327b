use crate::bridge::Bridge;
use crate::cell::CellRecord;
use crate::config::{BridgeOptions, TEXT_FONT_FAMILY};
use crate::error::BridgeError;
use crate::host::{ElementKind, FrameCallback, Host, KeyCallback, PointerCallback};
use crate::input::BoundingBox;
use crate::scaler::{CanvasContext, CanvasGeometry, BACKING_STORE_PROPERTIES};
use crate::simulation::Simulation;
use log::{error, LevelFilter, Log, Metadata, Record};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    console, CanvasRenderingContext2d, Document, Event, HtmlCanvasElement, HtmlElement, KeyboardEvent,
    MouseEvent, Window,
};

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));

        match record.level() {
            log::Level::Error => console::error_1(&message),
            log::Level::Warn => console::warn_1(&message),
            log::Level::Info => console::info_1(&message),
            log::Level::Debug | log::Level::Trace => console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

#[wasm_bindgen]
extern "C" {
    /// A simulation object living on the JS side, e.g. a wasm-bindgen export
    /// of another crate.
    pub type JsSimulation;

    #[wasm_bindgen(method, catch, js_name = tick)]
    fn js_tick(this: &JsSimulation) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = render_to_string)]
    fn js_render_to_string(this: &JsSimulation) -> Result<String, JsValue>;

    #[wasm_bindgen(method, catch, js_name = render_to_canvas)]
    fn js_render_to_canvas(
        this: &JsSimulation,
        context: &CanvasRenderingContext2d,
        scale_x: f64,
        scale_y: f64,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = fill_render_buffer)]
    fn js_fill_render_buffer(this: &JsSimulation, buffer: &mut [u8]) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = move_mouse)]
    fn js_move_mouse(this: &JsSimulation, x: f64, y: f64) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = press_key)]
    fn js_press_key(this: &JsSimulation, code: u32) -> Result<(), JsValue>;
}

fn report(operation: &str, result: Result<(), JsValue>) {
    if let Err(e) = result {
        error!("Simulation {} failed: {}", operation, BridgeError::from(e));
    }
}

impl Simulation<CanvasRenderingContext2d> for JsSimulation {
    fn tick(&mut self) {
        report("tick", self.js_tick());
    }

    fn render_to_string(&mut self) -> String {
        self.js_render_to_string().unwrap_or_else(|e| {
            error!("Simulation render_to_string failed: {}", BridgeError::from(e));
            String::new()
        })
    }

    fn render_to_canvas(&mut self, context: &CanvasRenderingContext2d, scale_x: f64, scale_y: f64) {
        report("render_to_canvas", self.js_render_to_canvas(context, scale_x, scale_y));
    }

    fn fill_render_buffer(&mut self, buffer: &mut [u8]) {
        report("fill_render_buffer", self.js_fill_render_buffer(buffer));
    }

    fn move_mouse(&mut self, x: f64, y: f64) {
        report("move_mouse", self.js_move_mouse(x, y));
    }

    fn press_key(&mut self, code: u32) {
        report("press_key", self.js_press_key(code));
    }

    /// wasm-bindgen exports carry a `free()` releasing their Rust half.
    fn free(&mut self) {
        let free = js_sys::Reflect::get(&*self, &JsValue::from_str("free"))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok());

        if let Some(free) = free {
            report("free", free.call0(&*self).map(|_| ()));
        }
    }
}

#[allow(deprecated)]
impl CanvasContext for CanvasRenderingContext2d {
    fn scale(&self, x: f64, y: f64) -> Result<(), BridgeError> {
        CanvasRenderingContext2d::scale(self, x, y)?;
        Ok(())
    }

    fn set_image_smoothing_enabled(&self, enabled: bool) {
        CanvasRenderingContext2d::set_image_smoothing_enabled(self, enabled);
    }

    fn set_font(&self, font: &str) {
        CanvasRenderingContext2d::set_font(self, font);
    }

    fn set_text_baseline(&self, baseline: &str) {
        CanvasRenderingContext2d::set_text_baseline(self, baseline);
    }

    fn set_fill_style(&self, style: &str) {
        CanvasRenderingContext2d::set_fill_style(self, &JsValue::from_str(style));
    }

    fn fill_rect(&self, x: f64, y: f64, width: f64, height: f64) {
        CanvasRenderingContext2d::fill_rect(self, x, y, width, height);
    }

    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), BridgeError> {
        CanvasRenderingContext2d::fill_text(self, text, x, y)?;
        Ok(())
    }
}

pub struct WebListener {
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

/// DOM-backed host. Listeners are registered on the window.
pub struct WebHost {
    window: Window,
    document: Document,
}

impl WebHost {
    pub fn new() -> Result<Self, BridgeError> {
        let window = web_sys::window().ok_or_else(|| BridgeError::Host("No global window exists".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| BridgeError::Host("Window should have a document".to_string()))?;

        Ok(Self { window, document })
    }

    fn listen(&self, event: &'static str, closure: Closure<dyn FnMut(Event)>) -> Result<WebListener, BridgeError> {
        self.window
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;

        Ok(WebListener { event, closure })
    }
}

impl Host for WebHost {
    type Element = HtmlElement;
    type Canvas = CanvasRenderingContext2d;
    type Listener = WebListener;

    fn container(&self, id: Option<&str>) -> Option<HtmlElement> {
        match id {
            None => self.document.body(),
            Some(id) => self.document.get_element_by_id(id)?.dyn_into::<HtmlElement>().ok(),
        }
    }

    fn remove_child_by_id(&self, container: &HtmlElement, id: &str) -> bool {
        match container.query_selector(&format!("#{}", id)) {
            Ok(Some(previous)) => {
                previous.remove();
                true
            }
            _ => false,
        }
    }

    fn set_flex_layout(&self, container: &HtmlElement) -> Result<(), BridgeError> {
        container.style().set_property("display", "flex")?;
        Ok(())
    }

    fn create_element(&self, kind: ElementKind, parent: &HtmlElement) -> Result<HtmlElement, BridgeError> {
        let tag = match kind {
            ElementKind::Text => "pre",
            ElementKind::Canvas => "canvas",
            ElementKind::Block => "div",
            ElementKind::Cell => "span",
            ElementKind::LineBreak => "br",
        };

        let element = self
            .document
            .create_element(tag)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| BridgeError::Host(format!("<{}> is not an HTML element", tag)))?;

        parent.append_child(&element)?;

        Ok(element)
    }

    fn set_id(&self, element: &HtmlElement, id: &str) {
        element.set_id(id);
    }

    fn style_text(&self, element: &HtmlElement) -> Result<(), BridgeError> {
        let style = element.style();

        style.set_property("padding", "0")?;
        style.set_property("line-height", "1")?;
        style.set_property("font-family", TEXT_FONT_FAMILY)?;

        Ok(())
    }

    fn set_text(&self, element: &HtmlElement, text: &str) {
        element.set_text_content(Some(text));
    }

    fn canvas_context(&self, element: &HtmlElement) -> Result<CanvasRenderingContext2d, BridgeError> {
        let canvas = element
            .dyn_ref::<HtmlCanvasElement>()
            .ok_or_else(|| BridgeError::Host("Surface is not a canvas".to_string()))?;

        canvas
            .get_context("2d")?
            .ok_or_else(|| BridgeError::Host("Canvas should have 2d context".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| BridgeError::Host("Canvas context is not 2d".to_string()))
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn backing_store_ratio(&self, context: &CanvasRenderingContext2d) -> Option<f64> {
        BACKING_STORE_PROPERTIES.iter().find_map(|property| {
            js_sys::Reflect::get(context, &JsValue::from_str(property))
                .ok()
                .and_then(|value| value.as_f64())
        })
    }

    fn size_canvas(&self, element: &HtmlElement, geometry: &CanvasGeometry) -> Result<(), BridgeError> {
        let canvas = element
            .dyn_ref::<HtmlCanvasElement>()
            .ok_or_else(|| BridgeError::Host("Surface is not a canvas".to_string()))?;

        canvas.set_width(geometry.device_width());
        canvas.set_height(geometry.device_height());

        let style = element.style();
        style.set_property("width", &geometry.css_width())?;
        style.set_property("height", &geometry.css_height())?;

        Ok(())
    }

    fn paint_cell(&self, element: &HtmlElement, record: &CellRecord) -> Result<(), BridgeError> {
        let style = element.style();

        style.set_property("background-color", &record.background.to_css())?;
        style.set_property("color", &record.foreground.to_css())?;
        element.set_text_content(Some(&record.glyph().to_string()));

        Ok(())
    }

    fn bounding_box(&self, element: &HtmlElement) -> BoundingBox {
        let rect = element.get_bounding_client_rect();

        BoundingBox::new(rect.left(), rect.top(), rect.width(), rect.height())
    }

    fn remove(&self, element: &HtmlElement) {
        element.remove();
    }

    fn add_pointer_listener(&self, mut callback: PointerCallback) -> Result<WebListener, BridgeError> {
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Some(event) = event.dyn_ref::<MouseEvent>() {
                callback(f64::from(event.client_x()), f64::from(event.client_y()));
            }
        });

        self.listen("mousemove", closure)
    }

    #[allow(deprecated)]
    fn add_key_listener(&self, mut callback: KeyCallback) -> Result<WebListener, BridgeError> {
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                callback(event.key_code());
            }
        });

        self.listen("keydown", closure)
    }

    fn remove_listener(&self, listener: WebListener) {
        let removed = self
            .window
            .remove_event_listener_with_callback(listener.event, listener.closure.as_ref().unchecked_ref());

        if let Err(e) = removed {
            error!("Failed to remove {} listener: {}", listener.event, BridgeError::from(e));
        }
    }

    fn request_animation_frame(&self, callback: FrameCallback) -> Result<(), BridgeError> {
        let frame = Closure::once_into_js(move || callback());

        self.window.request_animation_frame(frame.unchecked_ref())?;

        Ok(())
    }
}

/// JS handle returned by [`run_bridge`].
#[wasm_bindgen]
pub struct BridgeHandle {
    bridge: Option<Bridge<WebHost, JsSimulation>>,
    ready: js_sys::Promise,
}

#[wasm_bindgen]
impl BridgeHandle {
    /// Resolves once the simulation is running; rejects if loading failed.
    #[wasm_bindgen(getter)]
    pub fn ready(&self) -> js_sys::Promise {
        self.ready.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn seed(&self) -> Option<u32> {
        self.bridge.as_ref().map(|bridge| bridge.seed())
    }

    pub fn dispose(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.dispose();
        }
    }
}

fn parse_options(options: &JsValue) -> Result<BridgeOptions, BridgeError> {
    if options.is_undefined() || options.is_null() {
        return Ok(BridgeOptions::default());
    }

    let raw = String::from(js_sys::JSON::stringify(options)?);

    BridgeOptions::from_json(&raw)
}

/// Attaches a bridge according to `options` and starts loading the
/// simulation through `load(seed)`, which must return the simulation object
/// or a promise of it.
#[wasm_bindgen(js_name = runBridge)]
pub fn run_bridge(options: JsValue, load: js_sys::Function) -> Result<BridgeHandle, JsValue> {
    init_panic_hook();
    init_logging();

    let options = parse_options(&options)?;
    let host = Rc::new(WebHost::new()?);
    let bridge = Bridge::<WebHost, JsSimulation>::create(host, &options)?;

    let pending = bridge.run(move |seed| async move {
        let to_load_error = |e: JsValue| BridgeError::Load(BridgeError::from(e).to_string());

        let loading = load
            .call1(&JsValue::NULL, &JsValue::from(seed))
            .map_err(to_load_error)?;
        let simulation = JsFuture::from(js_sys::Promise::resolve(&loading))
            .await
            .map_err(to_load_error)?;

        Ok(simulation.unchecked_into::<JsSimulation>())
    });

    let ready = wasm_bindgen_futures::future_to_promise(async move {
        pending.await.map(|_| JsValue::UNDEFINED).map_err(JsValue::from)
    });

    Ok(BridgeHandle {
        bridge: Some(bridge),
        ready,
    })
}
