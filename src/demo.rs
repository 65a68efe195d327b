//! A small seeded world implementing the full simulation contract, used by
//! the headless runner and as a reference for engine authors.

use crate::cell::{CellRecord, Rgb};
use crate::grid::{Direction, Grid, Size};
use crate::scaler::CanvasContext;
use crate::simulation::Simulation;
use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

pub const KEY_LEFT: u32 = 37;
pub const KEY_UP: u32 = 38;
pub const KEY_RIGHT: u32 = 39;
pub const KEY_DOWN: u32 = 40;

const WALL_COLOR: Rgb = Rgb::new(0, 0, 100);
const FLOOR_COLOR: Rgb = Rgb::new(50, 50, 150);
const CURSOR_COLOR: Rgb = Rgb::new(200, 180, 50);
const PLAYER_COLOR: Rgb = Rgb::WHITE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    Floor,
    Wall,
}

fn direction_for(code: u32) -> Option<Direction> {
    match code {
        KEY_LEFT | 72 => Some(Direction::Left),
        KEY_UP | 75 => Some(Direction::Up),
        KEY_RIGHT | 76 => Some(Direction::Right),
        KEY_DOWN | 74 => Some(Direction::Down),
        _ => None,
    }
}

pub struct DemoWorld {
    map: Grid<Terrain>,
    player: (usize, usize),
    cursor: Option<(usize, usize)>,
    pending_key: Option<u32>,
    turn: u64,
}

impl DemoWorld {
    /// Builds a walled map with scattered pillars; the same seed always
    /// yields the same map.
    pub fn new(seed: u32, size: Size) -> Self {
        let mut rng = XorShiftRng::seed_from_u64(u64::from(seed));
        let (width, height) = (size.width, size.height);

        let map = Grid::new(width, height, &mut |x, y| {
            let border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;

            if border || rng.gen_ratio(1, 12) {
                Terrain::Wall
            } else {
                Terrain::Floor
            }
        });

        let player = map
            .iter()
            .find(|(_, _, terrain)| **terrain == Terrain::Floor)
            .map(|(x, y, _)| (x, y))
            .unwrap_or((0, 0));

        debug!("Demo world {} seeded with {}, player at {:?}", size, seed, player);

        Self {
            map,
            player,
            cursor: None,
            pending_key: None,
            turn: 0,
        }
    }

    pub fn player(&self) -> (usize, usize) {
        self.player
    }

    pub fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn terrain(&self, x: usize, y: usize) -> Option<Terrain> {
        self.map.get(x, y).copied()
    }

    fn record(&self, x: usize, y: usize) -> CellRecord {
        let background = match (self.cursor == Some((x, y)), self.terrain(x, y)) {
            (true, _) => CURSOR_COLOR,
            (false, Some(Terrain::Wall)) => WALL_COLOR,
            _ => FLOOR_COLOR,
        };

        if self.player == (x, y) {
            CellRecord::new(background, PLAYER_COLOR, b'@')
        } else if self.terrain(x, y) == Some(Terrain::Wall) {
            CellRecord::new(background, Rgb::new(130, 110, 50), b'#')
        } else {
            CellRecord::new(background, Rgb::WHITE, 0)
        }
    }
}

impl<C: CanvasContext> Simulation<C> for DemoWorld {
    fn tick(&mut self) {
        // last key since the previous step wins
        if let Some(direction) = self.pending_key.take().and_then(direction_for) {
            let (x, y) = self.player;

            if let Some(next) = self.map.neighbor(x, y, direction) {
                if self.terrain(next.0, next.1) == Some(Terrain::Floor) {
                    self.player = next;
                }
            }
        }

        self.turn += 1;
        trace!("turn {}", self.turn);
    }

    fn render_to_string(&mut self) -> String {
        let mut output = String::with_capacity((self.map.width() + 1) * self.map.height());

        for (x, y, terrain) in &self.map {
            output.push(match (self.player == (x, y), terrain) {
                (true, _) => '@',
                (false, Terrain::Wall) => '▓',
                (false, Terrain::Floor) => '▒',
            });

            if x + 1 == self.map.width() {
                output.push('\n');
            }
        }

        output
    }

    fn render_to_canvas(&mut self, context: &C, scale_x: f64, scale_y: f64) {
        for (x, y, _) in &self.map {
            let record = self.record(x, y);

            context.set_fill_style(&record.background.to_css());
            context.fill_rect(x as f64 * scale_x, y as f64 * scale_y, scale_x, scale_y);
        }

        for (x, y, _) in &self.map {
            let record = self.record(x, y);

            if record.char_code != 0 {
                context.set_fill_style(&record.foreground.to_css());
                if let Err(e) = context.fill_text(&record.glyph().to_string(), x as f64 * scale_x, y as f64 * scale_y) {
                    trace!("glyph at {}, {} not drawn: {}", x, y, e);
                }
            }
        }
    }

    fn fill_render_buffer(&mut self, buffer: &mut [u8]) {
        for ((x, y, _), chunk) in self.map.iter().zip(buffer.chunks_exact_mut(CellRecord::BYTES)) {
            self.record(x, y).write_to(chunk);
        }
    }

    fn move_mouse(&mut self, x: f64, y: f64) {
        let column = ((x * self.map.width() as f64) as usize).min(self.map.width().saturating_sub(1));
        let row = ((y * self.map.height() as f64) as usize).min(self.map.height().saturating_sub(1));

        self.cursor = Some((column, row));
    }

    fn press_key(&mut self, code: u32) {
        self.pending_key = Some(code);
    }
}
