//! Rectangular tile grid addressed by `(x, y)` with `x` the column.

use crate::{Tile, MAX_GRID_DIM};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// True when the two cells share an edge (diagonals excluded).
    pub fn is_orthogonal_to(&self, other: Coord) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }

    pub fn distance(&self, other: Coord) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// The neighbouring cell in `direction`, if it stays inside a `cols` x `rows` grid.
    pub fn step(&self, direction: Direction, cols: usize, rows: usize) -> Option<Coord> {
        let (x, y) = match direction {
            Direction::Up => (Some(self.x), self.y.checked_sub(1)),
            Direction::Down => (Some(self.x), Some(self.y + 1)),
            Direction::Left => (self.x.checked_sub(1), Some(self.y)),
            Direction::Right => (Some(self.x + 1), Some(self.y)),
        };
        match (x, y) {
            (Some(x), Some(y)) if x < cols && y < rows => Some(Coord::new(x, y)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A request to push army from one tile onto an orthogonal neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Coord,
    pub to: Coord,
}

impl Move {
    pub fn new(from: Coord, to: Coord) -> Self {
        Self { from, to }
    }

    pub fn is_orthogonal(&self) -> bool {
        self.from.is_orthogonal_to(self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    cols: usize,
    rows: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn filled(cols: usize, rows: usize, tile: Tile) -> Self {
        Self {
            cols,
            rows,
            tiles: vec![tile; cols * rows],
        }
    }

    /// Builds a grid from row-major tiles. Returns `None` if the count does not match.
    pub fn from_tiles(cols: usize, rows: usize, tiles: Vec<Tile>) -> Option<Self> {
        if cols == 0 || rows == 0 || tiles.len() != cols * rows {
            return None;
        }
        Some(Self { cols, rows, tiles })
    }

    /// Rebuilds a grid from positioned tile records, as carried by a snapshot.
    ///
    /// The dimensions are inferred from the largest coordinates. Every cell must
    /// be present exactly once.
    pub fn from_records(records: &[(Coord, Tile)]) -> Option<Self> {
        let cols = records.iter().map(|(c, _)| c.x).max()? + 1;
        let rows = records.iter().map(|(c, _)| c.y).max()? + 1;
        if cols > MAX_GRID_DIM || rows > MAX_GRID_DIM || records.len() != cols * rows {
            return None;
        }

        let mut slots: Vec<Option<Tile>> = vec![None; cols * rows];
        for (coord, tile) in records {
            let slot = &mut slots[coord.y * cols + coord.x];
            if slot.is_some() {
                return None;
            }
            *slot = Some(*tile);
        }

        let tiles = slots.into_iter().collect::<Option<Vec<Tile>>>()?;
        Some(Self { cols, rows, tiles })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x < self.cols && coord.y < self.rows
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| coord.y * self.cols + coord.x)
    }

    pub fn get(&self, coord: Coord) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, coord: Coord) -> Option<&mut Tile> {
        self.index(coord).map(move |i| &mut self.tiles[i])
    }

    /// Mutable access to two distinct cells at once.
    pub fn pair_mut(&mut self, a: Coord, b: Coord) -> Option<(&mut Tile, &mut Tile)> {
        let ia = self.index(a)?;
        let ib = self.index(b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (left, right) = self.tiles.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.tiles.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    /// Row-major iteration over every cell.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &Tile)> + '_ {
        let cols = self.cols;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, tile)| (Coord::new(i % cols, i / cols), tile))
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> + '_ {
        self.tiles.iter_mut()
    }

    /// The up-to-eight in-bounds cells surrounding `coord`.
    pub fn neighbors(&self, coord: Coord) -> impl Iterator<Item = Coord> + '_ {
        const OFFSETS: [(isize, isize); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        OFFSETS.iter().filter_map(move |(dx, dy)| {
            let x = coord.x.checked_add_signed(*dx)?;
            let y = coord.y.checked_add_signed(*dy)?;
            let neighbor = Coord::new(x, y);
            self.in_bounds(neighbor).then_some(neighbor)
        })
    }
}
