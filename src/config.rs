use crate::error::BridgeError;
use crate::grid::Size;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer};

/// Identity slot shared by every surface the bridge attaches to a container.
pub const SURFACE_ID: &str = "roguelike_game";

/// Display refreshes per simulation step.
pub const SUBSAMPLE: u64 = 8;

pub const CANVAS_FONT: &str = "normal 12px monospace";
pub const TEXT_FONT_FAMILY: &str = "'Courier New', Courier, monospace";

pub const DEFAULT_GRID: Size = Size::new(80, 50);
pub const DEFAULT_CELL_SIZE: (f64, f64) = (10.0, 10.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    #[default]
    Text,
    Canvas2d,
    Html,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::Text, RenderMode::Canvas2d, RenderMode::Html];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Text => "text",
            RenderMode::Canvas2d => "canvas_2d",
            RenderMode::Html => "html",
        }
    }
}

impl FromStr for RenderMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(RenderMode::Text),
            "canvas_2d" => Ok(RenderMode::Canvas2d),
            "html" => Ok(RenderMode::Html),
            other => Err(BridgeError::UnknownRenderMode(other.to_string())),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grid dimensions and the logical (CSS pixel) size of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub grid: Size,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl Layout {
    pub fn new(grid: Size, cell_width: f64, cell_height: f64) -> Self {
        Self {
            grid,
            cell_width,
            cell_height,
        }
    }

    pub fn logical_width(&self) -> f64 {
        self.grid.width as f64 * self.cell_width
    }

    pub fn logical_height(&self) -> f64 {
        self.grid.height as f64 * self.cell_height
    }

    /// Length of the packed render buffer for this grid.
    pub fn buffer_len(&self) -> usize {
        self.grid.area() * crate::cell::CellRecord::BYTES
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(DEFAULT_GRID, DEFAULT_CELL_SIZE.0, DEFAULT_CELL_SIZE.1)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeOptions {
    #[serde(default)]
    pub render_mode: Option<String>,

    #[serde(default, deserialize_with = "seed_as_string")]
    pub seed: Option<String>,

    #[serde(default)]
    pub container_id: Option<String>,

    #[serde(skip)]
    pub layout: Layout,
}

impl BridgeOptions {
    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = Some(mode.as_str().to_string());
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_container(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Missing or empty mode selects the text surface; anything unrecognised
    /// is rejected.
    pub fn render_mode(&self) -> Result<RenderMode, BridgeError> {
        match self.render_mode.as_deref().filter(|raw| !raw.is_empty()) {
            None => Ok(RenderMode::default()),
            Some(raw) => raw.parse(),
        }
    }

    /// Container to attach to; `None` (or an empty id) means the document body.
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref().filter(|id| !id.is_empty())
    }
}

fn seed_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.is_empty() => None,
        Some(serde_json::Value::Bool(false)) => None,
        Some(serde_json::Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
