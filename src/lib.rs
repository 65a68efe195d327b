//! Presentation bridge between a turn-based simulation and a display surface.
//!
//! A [`Bridge`] owns one surface (plain text, a 2D canvas, or a grid of
//! styled cells), drives the simulation at a fixed fraction of the display
//! refresh rate, and forwards normalised pointer and key input to it. The
//! display environment is abstracted behind [`Host`]; [`headless`] provides
//! an in-memory host and, with the `wasm` feature, `web` the DOM one.

pub mod bridge;
pub mod cell;
pub mod config;
pub mod decoder;
pub mod demo;
pub mod error;
pub mod grid;
pub mod headless;
pub mod host;
pub mod input;
pub mod scaler;
pub mod scheduler;
pub mod seed;
pub mod simulation;
pub mod surface;

#[cfg(feature = "wasm")]
pub mod web;

pub use bridge::Bridge;
pub use cell::{CellRecord, Rgb};
pub use config::{BridgeOptions, Layout, RenderMode};
pub use error::BridgeError;
pub use host::Host;
pub use simulation::Simulation;
pub use surface::Surface;
