//! Types and wire protocol shared by the grid-conquest server and client.

pub mod framing;
pub mod grid;
pub mod protocol;

pub use framing::{read_frame, read_message, write_message, FramingError};
pub use grid::{Coord, Direction, Move, TileGrid};
pub use protocol::{DecodeError, Message};

pub const COLS: usize = 25;
pub const ROWS: usize = 20;
/// Coordinates travel as two decimal digits, so no axis may exceed this.
pub const MAX_GRID_DIM: usize = 100;
/// Owners travel as a single decimal digit.
pub const MAX_PLAYERS: usize = 8;

pub type PlayerId = u8;
pub const NEUTRAL: PlayerId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    King,
    Army,
    Mountain,
    City,
}

impl TileKind {
    /// Single-character code used in snapshot tile records.
    pub fn code(self) -> char {
        match self {
            TileKind::King => 'K',
            TileKind::Army => 'A',
            TileKind::Mountain => 'M',
            TileKind::City => 'C',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'K' => Some(TileKind::King),
            'A' => Some(TileKind::Army),
            'M' => Some(TileKind::Mountain),
            'C' => Some(TileKind::City),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    pub owner: PlayerId,
    pub army: u32,
}

impl Tile {
    pub fn new(kind: TileKind, owner: PlayerId, army: u32) -> Self {
        Self { kind, owner, army }
    }

    pub fn king(owner: PlayerId, army: u32) -> Self {
        Self::new(TileKind::King, owner, army)
    }

    pub fn city(army: u32) -> Self {
        Self::new(TileKind::City, NEUTRAL, army)
    }

    pub fn mountain() -> Self {
        Self::new(TileKind::Mountain, NEUTRAL, 0)
    }

    /// Plain neutral land holding a single unit.
    pub fn neutral() -> Self {
        Self::new(TileKind::Army, NEUTRAL, 1)
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        player != NEUTRAL && self.owner == player
    }

    pub fn is_mountain(&self) -> bool {
        self.kind == TileKind::Mountain
    }
}
