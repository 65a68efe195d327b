use glyph_bridge::{
    cell::{CellRecord, Rgb, NBSP},
    config::{BridgeOptions, Layout, RenderMode},
    decoder::{apply_buffer, RenderBuffer},
    grid::{Grid, Size},
    input::{BoundingBox, PointerSample},
    scaler::{pixel_ratio_correction, CanvasGeometry},
    scheduler::{FrameAction, FrameScheduler, SchedulerState},
    seed::{derive_seed, hash_seed},
    BridgeError,
};
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use rand_xorshift::XorShiftRng;

// Fixed seed for deterministic tests
const TEST_SEED: u64 = 42;

#[test]
fn test_hash_seed_known_values() {
    assert_eq!(hash_seed(""), 0);
    assert_eq!(hash_seed("a"), 97);
    assert_eq!(hash_seed("ab"), 3105);
    assert_eq!(hash_seed("hello"), 99162322);
    // wraps instead of overflowing
    assert_eq!(hash_seed("polygenelubricants"), i32::MIN);
}

#[test]
fn test_hash_seed_counts_utf16_units() {
    // U+1F600 is a surrogate pair: 0xD83D then 0xDE00
    let expected = 0xD83Di32.wrapping_mul(31).wrapping_add(0xDE00);
    assert_eq!(hash_seed("\u{1F600}"), expected);
}

#[test]
fn test_derive_seed() {
    let mut rng = XorShiftRng::seed_from_u64(TEST_SEED);

    assert_eq!(derive_seed(Some("ab"), &mut rng), 3105);
    assert_eq!(derive_seed(Some("polygenelubricants"), &mut rng), 0x8000_0000);

    let mut a = XorShiftRng::seed_from_u64(TEST_SEED);
    let mut b = XorShiftRng::seed_from_u64(TEST_SEED);
    assert_eq!(derive_seed(None, &mut a), derive_seed(None, &mut b));
}

#[test]
fn test_render_mode_parsing() {
    assert_eq!("text".parse::<RenderMode>().unwrap(), RenderMode::Text);
    assert_eq!("canvas_2d".parse::<RenderMode>().unwrap(), RenderMode::Canvas2d);
    assert_eq!("html".parse::<RenderMode>().unwrap(), RenderMode::Html);

    for raw in ["webgl", "", "TEXT", "canvas2d"] {
        assert!(matches!(raw.parse::<RenderMode>(), Err(BridgeError::UnknownRenderMode(_))), "{}", raw);
    }

    for mode in RenderMode::ALL {
        assert_eq!(mode.to_string().parse::<RenderMode>().unwrap(), mode);
    }
}

#[test]
fn test_options_from_json() {
    let opts = BridgeOptions::from_json(r#"{"renderMode": "html", "seed": "abc", "containerId": "game"}"#).unwrap();
    assert_eq!(opts.render_mode().unwrap(), RenderMode::Html);
    assert_eq!(opts.seed.as_deref(), Some("abc"));
    assert_eq!(opts.container_id.as_deref(), Some("game"));
    assert_eq!(opts.layout, Layout::default());

    let empty = BridgeOptions::from_json("{}").unwrap();
    assert_eq!(empty.render_mode().unwrap(), RenderMode::Text);
    assert!(empty.seed.is_none());
    assert!(empty.container_id.is_none());
}

#[test]
fn test_options_seed_coercion() {
    let seed = |raw: &str| BridgeOptions::from_json(raw).unwrap().seed;

    assert_eq!(seed(r#"{"seed": 123}"#).as_deref(), Some("123"));
    assert_eq!(seed(r#"{"seed": true}"#).as_deref(), Some("true"));
    assert_eq!(seed(r#"{"seed": null}"#), None);
    assert_eq!(seed(r#"{"seed": ""}"#), None);
    assert_eq!(seed(r#"{"seed": 0}"#), None);
    assert_eq!(seed(r#"{"seed": false}"#), None);
}

#[test]
fn test_options_empty_strings_mean_absent() {
    let opts = BridgeOptions::from_json(r#"{"renderMode": "", "containerId": ""}"#).unwrap();
    assert_eq!(opts.render_mode().unwrap(), RenderMode::Text);
    assert_eq!(opts.container_id(), None);

    let opts = BridgeOptions::default().with_container("game");
    assert_eq!(opts.container_id(), Some("game"));
}

#[test]
fn test_options_reject_malformed_json() {
    let error = BridgeOptions::from_json("{renderMode: text}").unwrap_err();
    assert!(matches!(error, BridgeError::Options(_)));
    assert!(error.is_configuration());
}

#[test]
fn test_layout_dimensions() {
    let layout = Layout::default();
    assert_eq!(layout.grid, Size::new(80, 50));
    assert_eq!(layout.logical_width(), 800.0);
    assert_eq!(layout.logical_height(), 500.0);
    assert_eq!(layout.buffer_len(), 80 * 50 * 7);
}

#[test]
fn test_size_parsing() {
    assert_eq!("80x50".parse::<Size>().unwrap(), Size::new(80, 50));
    assert!("80".parse::<Size>().is_err());
    assert!("0x50".parse::<Size>().is_err());
    assert!("ax5".parse::<Size>().is_err());
}

#[test]
fn test_cell_record_glyphs() {
    let record = |code| CellRecord::new(Rgb::BLACK, Rgb::WHITE, code);

    assert_eq!(record(0).glyph(), NBSP);
    assert_eq!(record(32).glyph(), NBSP);
    assert_eq!(record(b'@').glyph(), '@');
    assert_eq!(record(0xE9).glyph(), 'é');
}

#[test]
fn test_cell_record_layout() {
    let bytes = [1, 2, 3, 4, 5, 6, b'x'];
    let record = CellRecord::from_bytes(&bytes).unwrap();

    assert_eq!(record.background, Rgb::new(1, 2, 3));
    assert_eq!(record.foreground, Rgb::new(4, 5, 6));
    assert_eq!(record.char_code, b'x');
    assert!(CellRecord::from_bytes(&bytes[..6]).is_none());

    let mut out = [0u8; 7];
    assert!(record.write_to(&mut out));
    assert_eq!(out, bytes);
    assert!(!record.write_to(&mut [0u8; 3]));
}

#[test]
fn test_rgb_css() {
    assert_eq!(Rgb::new(10, 20, 30).to_css(), "rgb(10,20,30)");
    assert_eq!(Rgb::from_css("rgb(10, 20, 30)"), Some(Rgb::new(10, 20, 30)));
    assert_eq!(Rgb::from_css("#ff8000"), Some(Rgb::new(255, 128, 0)));
    assert_eq!(Rgb::from_css("rgb(1,2)"), None);
    assert_eq!(Rgb::from_css("rgb(1,2,3,4)"), None);
    assert_eq!(Rgb::from_css("red"), None);
}

#[test]
fn test_apply_buffer_visits_every_cell_in_order() {
    let pool = Grid::new(3, 2, &mut |x, y| (x, y));
    let mut buffer = RenderBuffer::new(Size::new(3, 2));

    for (i, chunk) in buffer.as_mut_slice().chunks_exact_mut(CellRecord::BYTES).enumerate() {
        CellRecord::new(Rgb::new(i as u8, 0, 0), Rgb::WHITE, b'a' + i as u8).write_to(chunk);
    }

    let mut painted = Vec::new();
    apply_buffer(buffer.as_slice(), &pool, |cell, record| {
        painted.push((*cell, record.glyph()));
        Ok(())
    })
    .unwrap();

    assert_eq!(
        painted,
        vec![((0, 0), 'a'), ((1, 0), 'b'), ((2, 0), 'c'), ((0, 1), 'd'), ((1, 1), 'e'), ((2, 1), 'f')]
    );
    assert_eq!(buffer.record(2, 1).map(|r| r.background), Some(Rgb::new(5, 0, 0)));
    assert_eq!(buffer.record(3, 0), None);
}

#[test]
fn test_apply_buffer_overwrites_stale_pool() {
    let mut rng = XorShiftRng::seed_from_u64(TEST_SEED);
    let size = Size::new(17, 9);
    let stale = CellRecord::new(Rgb::new(1, 2, 3), Rgb::new(4, 5, 6), b'z');
    let pool = Grid::new(size.width, size.height, &mut |_, _| Cell::new(stale));
    let mut buffer = RenderBuffer::new(size);

    let records: Vec<CellRecord> = (0..size.area())
        .map(|_| {
            let bytes: [u8; 7] = rng.gen();
            CellRecord::from_bytes(&bytes).unwrap()
        })
        .collect();

    for (record, chunk) in records.iter().zip(buffer.as_mut_slice().chunks_exact_mut(CellRecord::BYTES)) {
        record.write_to(chunk);
    }

    apply_buffer(buffer.as_slice(), &pool, |cell, record| {
        cell.set(*record);
        Ok(())
    })
    .unwrap();

    let painted: Vec<CellRecord> = pool.values().map(Cell::get).collect();
    assert_eq!(painted, records);
}

#[test]
fn test_apply_buffer_rejects_wrong_length() {
    let pool = Grid::new(3, 2, &mut |_, _| ());
    let buffer = vec![0u8; 3 * 2 * 7 - 1];

    let result = apply_buffer(&buffer, &pool, |_, _| Ok(()));

    assert!(matches!(
        result,
        Err(BridgeError::BufferSize {
            expected: 42,
            actual: 41
        })
    ));
}

#[test]
fn test_apply_buffer_stops_on_paint_error() {
    let pool = Grid::new(2, 2, &mut |x, y| y * 2 + x);
    let buffer = RenderBuffer::new(Size::new(2, 2));
    let mut visited = 0;

    let result = apply_buffer(buffer.as_slice(), &pool, |cell, _| {
        visited += 1;
        if *cell == 1 {
            Err(BridgeError::Host("detached".to_string()))
        } else {
            Ok(())
        }
    });

    assert!(result.is_err());
    assert_eq!(visited, 2);
}

#[test]
fn test_pixel_ratio_correction() {
    assert_eq!(pixel_ratio_correction(2.0, None), 2.0);
    assert_eq!(pixel_ratio_correction(2.0, Some(2.0)), 1.0);
    assert_eq!(pixel_ratio_correction(3.0, Some(1.5)), 2.0);
    assert_eq!(pixel_ratio_correction(f64::NAN, None), 1.0);
    assert_eq!(pixel_ratio_correction(0.0, Some(0.0)), 1.0);
    assert_eq!(pixel_ratio_correction(1.0, Some(f64::INFINITY)), 1.0);
}

#[test]
fn test_canvas_geometry() {
    let geometry = CanvasGeometry::new(&Layout::default(), 1.5, None);

    assert_eq!(geometry.device_width(), 1200);
    assert_eq!(geometry.device_height(), 750);
    assert_eq!(geometry.css_width(), "800px");
    assert_eq!(geometry.css_height(), "500px");
    assert_eq!((geometry.cell_width, geometry.cell_height), (10.0, 10.0));
}

#[test]
fn test_scheduler_steps_eight_times_in_sixty_four_frames() {
    let mut scheduler = FrameScheduler::default();
    assert!(scheduler.start());

    let steps: Vec<usize> = (0..64)
        .filter(|_| scheduler.on_frame() == FrameAction::Step)
        .collect();

    assert_eq!(steps, vec![0, 8, 16, 24, 32, 40, 48, 56]);
    assert_eq!(scheduler.frame(), 64);
}

#[test]
fn test_scheduler_lifecycle() {
    let mut scheduler = FrameScheduler::new(8);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.on_frame(), FrameAction::Halt);
    assert_eq!(scheduler.frame(), 0);

    assert!(scheduler.start());
    assert!(!scheduler.start());
    assert_eq!(scheduler.on_frame(), FrameAction::Step);
    assert_eq!(scheduler.on_frame(), FrameAction::Skip);

    scheduler.stop();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(scheduler.on_frame(), FrameAction::Halt);
    assert!(!scheduler.start());
}

#[test]
fn test_scheduler_without_subsampling() {
    let mut scheduler = FrameScheduler::new(0);
    scheduler.start();

    assert!((0..5).all(|_| scheduler.on_frame() == FrameAction::Step));
}

#[test]
fn test_pointer_normalisation() {
    let bounds = BoundingBox::new(100.0, 50.0, 800.0, 500.0);

    assert_eq!(
        PointerSample::normalize(100.0, 50.0, &bounds),
        Some(PointerSample { x: 0.0, y: 0.0 })
    );
    assert_eq!(
        PointerSample::normalize(900.0, 550.0, &bounds),
        Some(PointerSample { x: 1.0, y: 1.0 })
    );
    assert_eq!(
        PointerSample::normalize(500.0, 300.0, &bounds),
        Some(PointerSample { x: 0.5, y: 0.5 })
    );
    assert_eq!(PointerSample::normalize(99.0, 300.0, &bounds), None);
    assert_eq!(PointerSample::normalize(500.0, 551.0, &bounds), None);
}

#[test]
fn test_pointer_ignored_on_degenerate_box() {
    for bounds in [
        BoundingBox::default(),
        BoundingBox::new(0.0, 0.0, 0.0, 100.0),
        BoundingBox::new(0.0, 0.0, 100.0, -1.0),
        BoundingBox::new(0.0, 0.0, f64::NAN, 100.0),
    ] {
        assert!(bounds.is_degenerate());
        assert_eq!(PointerSample::normalize(0.0, 0.0, &bounds), None);
    }
}
