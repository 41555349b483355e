//! Client-side mirror of the last snapshot received from the server

use log::{debug, warn};
use shared::{Coord, Direction, Move, PlayerId, Tile, TileGrid};

/// Totals shown in the status line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub owned_tiles: usize,
    pub total_army: u64,
}

/// What the client currently believes the (fogged) grid looks like
#[derive(Debug, Clone, Default)]
pub struct ClientGameState {
    player_id: Option<PlayerId>,
    grid: Option<TileGrid>,
    selected: Option<Coord>,
    snapshots_received: u64,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the mirror with a freshly received snapshot.
    ///
    /// A snapshot that does not cover a full rectangle is ignored. The
    /// selection falls back to the first owned tile when it is unset or no
    /// longer owned.
    pub fn apply_snapshot(&mut self, recipient: PlayerId, tiles: &[(Coord, Tile)]) -> bool {
        let Some(grid) = TileGrid::from_records(tiles) else {
            warn!("Ignoring snapshot with {} tiles that do not form a grid", tiles.len());
            return false;
        };

        if self.player_id != Some(recipient) {
            debug!("Assigned player id {}", recipient);
        }
        self.player_id = Some(recipient);
        self.grid = Some(grid);
        self.snapshots_received += 1;

        let still_owned = self
            .selected
            .is_some_and(|coord| self.owns(coord));
        if !still_owned {
            self.selected = self.first_owned();
        }
        true
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn grid(&self) -> Option<&TileGrid> {
        self.grid.as_ref()
    }

    pub fn selected(&self) -> Option<Coord> {
        self.selected
    }

    pub fn snapshots_received(&self) -> u64 {
        self.snapshots_received
    }

    fn owns(&self, coord: Coord) -> bool {
        match (self.player_id, self.grid.as_ref()) {
            (Some(player), Some(grid)) => grid.get(coord).is_some_and(|t| t.is_owned_by(player)),
            _ => false,
        }
    }

    fn first_owned(&self) -> Option<Coord> {
        let player = self.player_id?;
        self.grid
            .as_ref()?
            .iter()
            .find(|(_, tile)| tile.is_owned_by(player))
            .map(|(coord, _)| coord)
    }

    /// Selects `coord` if the player owns it.
    pub fn select(&mut self, coord: Coord) -> bool {
        if self.owns(coord) {
            self.selected = Some(coord);
            true
        } else {
            false
        }
    }

    /// Builds a move from the selection one step in `direction` and follows it.
    ///
    /// Returns None at the grid edge or when either end is a mountain. The
    /// server remains the judge of whether the move succeeds.
    pub fn plan_move(&mut self, direction: Direction) -> Option<Move> {
        let grid = self.grid.as_ref()?;
        let from = self.selected?;
        let to = from.step(direction, grid.cols(), grid.rows())?;

        let blocked = |coord: Coord| grid.get(coord).map_or(true, |tile| tile.is_mountain());
        if blocked(from) || blocked(to) {
            return None;
        }

        self.selected = Some(to);
        Some(Move::new(from, to))
    }

    pub fn stats(&self) -> PlayerStats {
        let (Some(player), Some(grid)) = (self.player_id, self.grid.as_ref()) else {
            return PlayerStats::default();
        };
        grid.iter()
            .filter(|(_, tile)| tile.is_owned_by(player))
            .fold(PlayerStats::default(), |mut stats, (_, tile)| {
                stats.owned_tiles += 1;
                stats.total_army += u64::from(tile.army);
                stats
            })
    }
}
