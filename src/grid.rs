use core::fmt;
use core::str::FromStr;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub const fn area(&self) -> usize {
        self.width * self.height
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (raw_width, raw_height) = s.split_once('x').ok_or(format!("invalid format: {}", s))?;

        let width = raw_width
            .parse::<usize>()
            .map_err(|_| format!("invalid width: {}", raw_width))?;
        let height = raw_height
            .parse::<usize>()
            .map_err(|_| format!("invalid height: {}", raw_height))?;

        if width == 0 || height == 0 {
            return Err(format!("empty grid: {}", s));
        }

        Ok(Size { width, height })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Row-major storage; the cell at `(x, y)` lives at `y * width + x`.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

pub struct GridIter<'a, T> {
    grid: &'a Grid<T>,
    pos: usize,
}

impl<T> Grid<T> {
    pub fn new<F: FnMut(usize, usize) -> T>(width: usize, height: usize, initializer: &mut F) -> Self {
        let mut data = Vec::with_capacity(width * height);

        for y in 0..height {
            for x in 0..width {
                data.push(initializer(x, y));
            }
        }

        Self {
            data,
            width,
            height,
        }
    }

    pub fn try_new<E, F>(size: Size, initializer: &mut F) -> Result<Self, E>
    where
        F: FnMut(usize, usize) -> Result<T, E>,
    {
        let mut data = Vec::with_capacity(size.area());

        for y in 0..size.height {
            for x in 0..size.width {
                data.push(initializer(x, y)?);
            }
        }

        Ok(Self {
            data,
            width: size.width,
            height: size.height,
        })
    }

    pub fn size(&self) -> usize {
        self.width * self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            None
        } else {
            Some(x + (y * self.width))
        }
    }

    pub fn iter(&self) -> GridIter<'_, T> {
        GridIter { grid: self, pos: 0 }
    }

    pub fn values(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.data.get(self.index(x, y)?)
    }

    pub fn neighbor(&self, x: usize, y: usize, direction: Direction) -> Option<(usize, usize)> {
        let (x, y) = match direction {
            Direction::Up => {
                if y == 0 {
                    None
                } else {
                    Some((x, y - 1))
                }
            }
            Direction::Down => {
                if y + 1 >= self.height {
                    None
                } else {
                    Some((x, y + 1))
                }
            }
            Direction::Left => {
                if x == 0 {
                    None
                } else {
                    Some((x - 1, y))
                }
            }
            Direction::Right => {
                if x + 1 >= self.width {
                    None
                } else {
                    Some((x + 1, y))
                }
            }
        }?;

        self.index(x, y).map(|_| (x, y))
    }
}

impl<'a, T> IntoIterator for &'a Grid<T> {
    type Item = (usize, usize, &'a T);
    type IntoIter = GridIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> Iterator for GridIter<'a, T> {
    type Item = (usize, usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.grid.data.len() {
            None
        } else {
            let x = self.pos % self.grid.width;
            let y = self.pos / self.grid.width;
            let value = &self.grid.data[self.pos];

            self.pos += 1;

            Some((x, y, value))
        }
    }
}
