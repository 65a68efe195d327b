use glyph_bridge::config::{BridgeOptions, Layout, RenderMode};
use glyph_bridge::grid::Size;
use glyph_bridge::BridgeError;
use std::fs;
use std::path::PathBuf;
use structopt::clap::Shell;
use structopt::StructOpt;
use structopt_flags::QuietVerbose;

fn load_options(s: &str) -> Result<BridgeOptions, String> {
    let raw = fs::read_to_string(PathBuf::from(s)).map_err(|e| format!("Failed to open options file: {}", e))?;

    BridgeOptions::from_json(&raw).map_err(|e| format!("Failed to parse options file: {}", e))
}

fn parse_key(s: &str) -> Result<u32, String> {
    match s {
        "left" => Ok(37),
        "up" => Ok(38),
        "right" => Ok(39),
        "down" => Ok(40),
        other => other.parse::<u32>().map_err(|_| format!("invalid key: {}", other)),
    }
}

#[derive(Debug)]
pub struct RunConfig {
    pub options: BridgeOptions,
    pub frames: usize,
    pub keys: Vec<u32>,
    pub pointer: Option<(f64, f64)>,
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "glyph-bridge",
    about = "Run a simulation through the presentation bridge without a display"
)]
pub struct Opt {
    #[structopt(flatten)]
    pub verbose: QuietVerbose,

    #[structopt(
        parse(try_from_str = load_options),
        long,
        help = "JSON options file ({\"renderMode\", \"seed\", \"containerId\"})"
    )]
    options: Option<BridgeOptions>,

    #[structopt(short, long, help = "Render mode: text, canvas_2d or html")]
    mode: Option<String>,

    #[structopt(short, long, help = "Seed string")]
    seed: Option<String>,

    #[structopt(
        parse(try_from_str),
        short,
        long,
        default_value = "80x50",
        help = "Simulation grid size"
    )]
    grid: Size,

    #[structopt(long, default_value = "10", help = "Logical cell size in pixels")]
    cell_size: f64,

    #[structopt(short, long, default_value = "64", help = "Display frames to run")]
    frames: usize,

    #[structopt(
        parse(try_from_str = parse_key),
        short,
        long,
        help = "Key presses, one per simulation step (left, up, right, down or a key code)"
    )]
    keys: Vec<u32>,

    #[structopt(long, number_of_values = 2, help = "Pointer position over the surface, as x y in [0, 1]")]
    pointer: Vec<f64>,

    #[structopt(parse(from_os_str), long, help = "Write a PNG snapshot of a canvas or html surface")]
    snapshot: Option<PathBuf>,

    #[structopt(long, possible_values = &Shell::variants(), case_insensitive = true, help = "Generate shell completions and exit")]
    pub completions: Option<Shell>,
}

impl Opt {
    pub fn to_run_config(self) -> Result<RunConfig, BridgeError> {
        let mut options = self.options.unwrap_or_default();

        if let Some(mode) = self.mode {
            options = options.with_render_mode(mode.parse::<RenderMode>()?);
        }

        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }

        options = options.with_layout(Layout::new(self.grid, self.cell_size, self.cell_size));

        // surfaces always attach to the body of the headless document
        options.container_id = None;

        let pointer = match self.pointer.as_slice() {
            [x, y] => Some((*x, *y)),
            _ => None,
        };

        Ok(RunConfig {
            options,
            frames: self.frames,
            keys: self.keys,
            pointer,
            snapshot: self.snapshot,
        })
    }
}
