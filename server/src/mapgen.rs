//! Map generation: king placement by rejection sampling, then a weighted fill.

use crate::rules::GameRules;
use log::{debug, warn};
use rand::Rng;
use shared::{Coord, PlayerId, Tile, TileGrid, TileKind, MAX_PLAYERS};

/// Applied to the king separation each time the retry cap is hit.
const RELAX_FACTOR: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapGenError {
    #[error("at least one player is required")]
    NoPlayers,
    #[error("{0} players exceeds the player limit")]
    PlayerLimit(usize),
    #[error("{players} players do not fit on {cells} cells")]
    TooManyPlayers { players: usize, cells: usize },
}

#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub grid: TileGrid,
    /// Where each player's king stood at generation time, indexed by `player - 1`.
    pub kings: Vec<Coord>,
}

pub struct MapGenerator<'a> {
    rules: &'a GameRules,
}

impl<'a> MapGenerator<'a> {
    pub fn new(rules: &'a GameRules) -> Self {
        Self { rules }
    }

    /// Radius every king must keep from the others before any relaxation.
    pub fn min_king_distance(&self, num_players: usize) -> f64 {
        let (cols, rows) = (self.rules.cols as f64, self.rules.rows as f64);
        let diagonal = (rows * rows + cols * cols).sqrt().floor();
        let scaling = (10.0 - num_players as f64) / 8.0;
        self.rules.king_multiplier * diagonal * scaling / 2.0
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        num_players: usize,
    ) -> Result<GeneratedMap, MapGenError> {
        let cells = self.rules.cols * self.rules.rows;
        if num_players == 0 {
            return Err(MapGenError::NoPlayers);
        }
        if num_players > MAX_PLAYERS {
            return Err(MapGenError::PlayerLimit(num_players));
        }
        if num_players > cells {
            return Err(MapGenError::TooManyPlayers {
                players: num_players,
                cells,
            });
        }

        let mut grid = TileGrid::filled(self.rules.cols, self.rules.rows, Tile::neutral());
        let kings = self.place_kings(rng, &mut grid, num_players);
        self.fill(rng, &mut grid);

        Ok(GeneratedMap { grid, kings })
    }

    fn place_kings<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        grid: &mut TileGrid,
        num_players: usize,
    ) -> Vec<Coord> {
        let mut free: Vec<Coord> = grid.iter().map(|(coord, _)| coord).collect();
        let mut kings: Vec<Coord> = Vec::with_capacity(num_players);
        let mut min_distance = self.min_king_distance(num_players);
        let mut rejected = 0u32;

        while kings.len() < num_players {
            let index = rng.gen_range(0..free.len());
            let candidate = free[index];

            if kings.iter().all(|king| king.distance(candidate) > min_distance) {
                free.swap_remove(index);
                let owner = (kings.len() + 1) as PlayerId;
                if let Some(tile) = grid.get_mut(candidate) {
                    *tile = Tile::king(owner, self.rules.king_start_army);
                }
                debug!(
                    "Placed king of player {} at ({}, {})",
                    owner, candidate.x, candidate.y
                );
                kings.push(candidate);
                rejected = 0;
                continue;
            }

            rejected += 1;
            if rejected >= self.rules.max_placement_attempts {
                // Below one cell every distinct site qualifies, so this terminates.
                let relaxed = if min_distance < 1.0 {
                    0.0
                } else {
                    min_distance * RELAX_FACTOR
                };
                warn!(
                    "No king site after {} attempts, relaxing separation {:.2} -> {:.2}",
                    rejected, min_distance, relaxed
                );
                min_distance = relaxed;
                rejected = 0;
            }
        }

        kings
    }

    fn fill<R: Rng + ?Sized>(&self, rng: &mut R, grid: &mut TileGrid) {
        let rules = self.rules;
        for tile in grid.tiles_mut() {
            if tile.kind == TileKind::King {
                continue;
            }
            let roll: f64 = rng.gen();
            *tile = if roll < rules.city_chance {
                Tile::city(rng.gen_range(rules.city_army_min..=rules.city_army_max))
            } else if roll < rules.mountain_chance {
                Tile::mountain()
            } else {
                Tile::neutral()
            };
        }
    }
}
