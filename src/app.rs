use crate::cli::RunConfig;
use glyph_bridge::config::RenderMode;
use glyph_bridge::demo::DemoWorld;
use glyph_bridge::headless::HeadlessHost;
use glyph_bridge::input::BoundingBox;
use glyph_bridge::Bridge;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::rc::Rc;

pub struct HeadlessApp {
    config: RunConfig,
}

impl HeadlessApp {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let layout = self.config.options.layout;
        let host = Rc::new(HeadlessHost::new());
        let bridge: Bridge<HeadlessHost, DemoWorld> = Bridge::create(Rc::clone(&host), &self.config.options)?;

        let world = DemoWorld::new(bridge.seed(), layout.grid);
        bridge.attach(world);

        let surface = bridge.surface_element().ok_or("Bridge has no surface")?;

        // lay the surface out at the origin so pointer positions map onto it
        host.set_bounds(
            surface,
            BoundingBox::new(0.0, 0.0, layout.logical_width(), layout.logical_height()),
        );

        if let Some((x, y)) = self.config.pointer {
            host.dispatch_pointer_move(x * layout.logical_width(), y * layout.logical_height());
        }

        let progress = ProgressBar::new(self.config.frames as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len} frames")?
                .progress_chars("#>-"),
        );

        let mut keys = self.config.keys.iter();

        for _ in 0..self.config.frames {
            // one key per simulation step, delivered just before the step runs
            if bridge.frame() % glyph_bridge::config::SUBSAMPLE == 0 {
                if let Some(code) = keys.next() {
                    host.dispatch_key_down(*code);
                }
            }

            host.advance_frame();
            progress.inc(1);
        }

        progress.finish_and_clear();
        info!("Ran {} display frames", bridge.frame());

        match (&self.config.snapshot, bridge.mode()) {
            (Some(path), RenderMode::Canvas2d | RenderMode::Html) => self.write_snapshot(&host, surface, path)?,
            (Some(_), RenderMode::Text) => warn!("Text surfaces have no snapshot; printing instead"),
            _ => {}
        }

        if self.config.snapshot.is_none() || bridge.mode() == RenderMode::Text {
            match bridge.mode() {
                RenderMode::Canvas2d => {
                    if let Some(canvas) = host.canvas(surface) {
                        let (width, height) = canvas.dimensions();
                        println!("canvas {}x{}: {} rect fills, {} text fills", width, height, canvas.rect_fills(), canvas.text_fills());
                    }
                }
                _ => print!("{}", host.text_content(surface)),
            }
        }

        bridge.dispose();

        Ok(())
    }

    #[cfg(feature = "image")]
    fn write_snapshot(
        &self,
        host: &HeadlessHost,
        surface: glyph_bridge::headless::NodeId,
        path: &std::path::Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let layout = self.config.options.layout;
        let cell = (layout.cell_width.round() as u32, layout.cell_height.round() as u32);
        let image = host.snapshot(surface, cell).ok_or("Surface has nothing to snapshot")?;

        image.save(path).map_err(|e| format!("Failed to save image: {}", e))?;
        info!("Snapshot written to {}", path.display());

        Ok(())
    }

    #[cfg(not(feature = "image"))]
    fn write_snapshot(
        &self,
        _host: &HeadlessHost,
        _surface: glyph_bridge::headless::NodeId,
        _path: &std::path::Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Err("Snapshots need the image feature".into())
    }
}
