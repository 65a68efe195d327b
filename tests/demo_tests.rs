use std::cell::Cell;
use std::rc::Rc;

use glyph_bridge::{
    cell::CellRecord,
    config::{BridgeOptions, Layout, RenderMode},
    demo::{DemoWorld, Terrain, KEY_DOWN, KEY_LEFT, KEY_UP},
    grid::Size,
    headless::{HeadlessCanvas, HeadlessHost},
    scaler::CanvasContext,
    Bridge, BridgeError, Simulation,
};

// Fixed seed for deterministic tests
const TEST_SEED: u32 = 42;

fn render(world: &mut DemoWorld) -> String {
    Simulation::<HeadlessCanvas>::render_to_string(world)
}

#[test]
fn test_same_seed_same_world() {
    let size = Size::new(30, 20);
    let mut a = DemoWorld::new(TEST_SEED, size);
    let mut b = DemoWorld::new(TEST_SEED, size);

    assert_eq!(render(&mut a), render(&mut b));
    assert_eq!(a.player(), b.player());
}

#[test]
fn test_world_is_walled_in() {
    let world = DemoWorld::new(TEST_SEED, Size::new(30, 20));

    for x in 0..30 {
        assert_eq!(world.terrain(x, 0), Some(Terrain::Wall));
        assert_eq!(world.terrain(x, 19), Some(Terrain::Wall));
    }
    for y in 0..20 {
        assert_eq!(world.terrain(0, y), Some(Terrain::Wall));
        assert_eq!(world.terrain(29, y), Some(Terrain::Wall));
    }

    let (x, y) = world.player();
    assert_eq!(world.terrain(x, y), Some(Terrain::Floor));
    assert_eq!(world.terrain(30, 0), None);
}

#[test]
fn test_render_to_string_shape() {
    let mut world = DemoWorld::new(TEST_SEED, Size::new(12, 5));
    let text = render(&mut world);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 5);
    assert!(lines.iter().all(|line| line.chars().count() == 12));
    assert_eq!(text.matches('@').count(), 1);
    assert!(text.ends_with('\n'));
}

#[test]
fn test_player_cannot_walk_into_walls() {
    let mut world = DemoWorld::new(TEST_SEED, Size::new(30, 20));
    let start = world.player();

    // the first floor cell in reading order has a wall to its left and above it
    Simulation::<HeadlessCanvas>::press_key(&mut world, KEY_LEFT);
    Simulation::<HeadlessCanvas>::tick(&mut world);
    assert_eq!(world.player(), start);

    Simulation::<HeadlessCanvas>::press_key(&mut world, KEY_UP);
    Simulation::<HeadlessCanvas>::tick(&mut world);
    assert_eq!(world.player(), start);
    assert_eq!(world.turn(), 2);
}

#[test]
fn test_last_key_before_step_wins() {
    let mut world = DemoWorld::new(TEST_SEED, Size::new(30, 20));
    let (x, y) = world.player();
    let below = world.terrain(x, y + 1);

    Simulation::<HeadlessCanvas>::press_key(&mut world, KEY_UP);
    Simulation::<HeadlessCanvas>::press_key(&mut world, KEY_DOWN);
    Simulation::<HeadlessCanvas>::tick(&mut world);

    let expected = if below == Some(Terrain::Floor) { (x, y + 1) } else { (x, y) };
    assert_eq!(world.player(), expected);

    // keys are consumed by the step
    Simulation::<HeadlessCanvas>::tick(&mut world);
    assert_eq!(world.player(), expected);
}

#[test]
fn test_pointer_moves_cursor() {
    let mut world = DemoWorld::new(TEST_SEED, Size::new(80, 50));
    assert_eq!(world.cursor(), None);

    Simulation::<HeadlessCanvas>::move_mouse(&mut world, 0.5, 0.5);
    assert_eq!(world.cursor(), Some((40, 25)));

    Simulation::<HeadlessCanvas>::move_mouse(&mut world, 1.0, 1.0);
    assert_eq!(world.cursor(), Some((79, 49)));

    Simulation::<HeadlessCanvas>::move_mouse(&mut world, 0.0, 0.0);
    assert_eq!(world.cursor(), Some((0, 0)));
}

#[test]
fn test_render_buffer_marks_player() {
    let size = Size::new(16, 8);
    let mut world = DemoWorld::new(TEST_SEED, size);
    let mut buffer = vec![0u8; size.area() * CellRecord::BYTES];

    Simulation::<HeadlessCanvas>::fill_render_buffer(&mut world, &mut buffer);

    let (x, y) = world.player();
    let offset = (y * size.width + x) * CellRecord::BYTES;
    let record = CellRecord::from_bytes(&buffer[offset..]).unwrap();
    assert_eq!(record.char_code, b'@');

    let corner = CellRecord::from_bytes(&buffer).unwrap();
    assert_eq!(corner.char_code, b'#');
}

#[test]
fn test_demo_world_drives_html_surface() {
    let host = Rc::new(HeadlessHost::new());
    let layout = Layout::new(Size::new(16, 8), 10.0, 10.0);
    let opts = BridgeOptions::default()
        .with_render_mode(RenderMode::Html)
        .with_seed("demo")
        .with_layout(layout);
    let bridge: Bridge<HeadlessHost, DemoWorld> = Bridge::create(Rc::clone(&host), &opts).unwrap();
    let surface = bridge.surface_element().unwrap();

    assert!(!host.text_content(surface).contains('@'));

    bridge.attach(DemoWorld::new(bridge.seed(), layout.grid));
    host.advance_frame();

    let text = host.text_content(surface);
    assert_eq!(text.matches('@').count(), 1);
    assert_eq!(text.lines().count(), 8);
    assert_eq!(host.cells(surface).len(), 16 * 8);

    bridge.dispose();
    assert_eq!(host.listener_stats().active(), 0);
}

#[test]
fn test_demo_world_drives_canvas_surface() {
    let host = Rc::new(HeadlessHost::new());
    let layout = Layout::new(Size::new(16, 8), 10.0, 10.0);
    let opts = BridgeOptions::default()
        .with_render_mode(RenderMode::Canvas2d)
        .with_seed("demo")
        .with_layout(layout);
    let bridge: Bridge<HeadlessHost, DemoWorld> = Bridge::create(Rc::clone(&host), &opts).unwrap();
    let canvas = host.canvas(bridge.surface_element().unwrap()).unwrap();

    bridge.attach(DemoWorld::new(bridge.seed(), layout.grid));
    host.advance_frame();

    assert_eq!(canvas.dimensions(), (160, 80));
    assert_eq!(canvas.rect_fills(), 16 * 8);
    assert!(canvas.text_fills() > 0);
}

/// Context whose text drawing always fails.
#[derive(Default)]
struct NoTextContext {
    rects: Cell<usize>,
    text_attempts: Cell<usize>,
}

impl CanvasContext for NoTextContext {
    fn scale(&self, _x: f64, _y: f64) -> Result<(), BridgeError> {
        Ok(())
    }

    fn set_image_smoothing_enabled(&self, _enabled: bool) {}

    fn set_font(&self, _font: &str) {}

    fn set_text_baseline(&self, _baseline: &str) {}

    fn set_fill_style(&self, _style: &str) {}

    fn fill_rect(&self, _x: f64, _y: f64, _width: f64, _height: f64) {
        self.rects.set(self.rects.get() + 1);
    }

    fn fill_text(&self, _text: &str, _x: f64, _y: f64) -> Result<(), BridgeError> {
        self.text_attempts.set(self.text_attempts.get() + 1);
        Err(BridgeError::Host("fillText rejected".to_string()))
    }
}

#[test]
fn test_failed_glyphs_do_not_stop_canvas_render() {
    let size = Size::new(12, 6);
    let mut world = DemoWorld::new(TEST_SEED, size);
    let context = NoTextContext::default();

    Simulation::<NoTextContext>::render_to_canvas(&mut world, &context, 10.0, 10.0);

    assert_eq!(context.rects.get(), size.area());
    assert!(context.text_attempts.get() > 0);
}
