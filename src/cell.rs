use core::fmt;

/// Code point substituted for empty cells so a grid row never collapses.
pub const NBSP: char = '\u{a0}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS `rgb(r,g,b)` notation.
    pub fn to_css(&self) -> String {
        self.to_string()
    }

    /// Parses `rgb(r,g,b)` (spaces allowed) and `#rrggbb`.
    pub fn from_css(value: &str) -> Option<Self> {
        let value = value.trim();

        if let Some(hex) = value.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

            return Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let inner = value.strip_prefix("rgb(")?.strip_suffix(')')?;
        let mut channels = inner.split(',').map(|c| c.trim().parse::<u8>().ok());
        let rgb = Rgb::new(channels.next()??, channels.next()??, channels.next()??);

        match channels.next() {
            None => Some(rgb),
            Some(_) => None,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// One packed cell of the render buffer: `bgR bgG bgB fgR fgG fgB charCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRecord {
    pub background: Rgb,
    pub foreground: Rgb,
    pub char_code: u8,
}

impl CellRecord {
    pub const BYTES: usize = 7;

    pub const fn new(background: Rgb, foreground: Rgb, char_code: u8) -> Self {
        Self {
            background,
            foreground,
            char_code,
        }
    }

    /// Blank cell a grid surface starts out with.
    pub const fn blank() -> Self {
        Self::new(Rgb::BLACK, Rgb::WHITE, 0)
    }

    /// Reads a record from the first [`CellRecord::BYTES`] bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [br, bg, bb, fr, fg, fb, code, ..] => Some(Self::new(
                Rgb::new(*br, *bg, *bb),
                Rgb::new(*fr, *fg, *fb),
                *code,
            )),
            _ => None,
        }
    }

    pub fn write_to(&self, out: &mut [u8]) -> bool {
        match out {
            [br, bg, bb, fr, fg, fb, code, ..] => {
                *br = self.background.r;
                *bg = self.background.g;
                *bb = self.background.b;
                *fr = self.foreground.r;
                *fg = self.foreground.g;
                *fb = self.foreground.b;
                *code = self.char_code;
                true
            }
            _ => false,
        }
    }

    /// Glyph shown for this cell; 0 and space render as a non-breaking space.
    pub fn glyph(&self) -> char {
        match self.char_code {
            0 | b' ' => NBSP,
            code => char::from(code),
        }
    }
}

impl Default for CellRecord {
    fn default() -> Self {
        Self::blank()
    }
}
