use crate::combat::{self, Outcome};
use crate::mapgen::GeneratedMap;
use crate::rules::GameRules;
use crate::visibility;
use log::{debug, info};
use shared::{Coord, Message, Move, PlayerId, TileGrid, TileKind, NEUTRAL};

#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u64,
    grid: TileGrid,
    kings: Vec<Coord>,
    rules: GameRules,
    growth_counter: u32,
    winner: Option<PlayerId>,
}

impl GameState {
    pub fn new(map: GeneratedMap, rules: GameRules) -> Self {
        Self {
            tick: 0,
            grid: map.grid,
            kings: map.kings,
            rules,
            growth_counter: 0,
            winner: None,
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Starting king positions, indexed by `player - 1`.
    pub fn kings(&self) -> &[Coord] {
        &self.kings
    }

    pub fn num_players(&self) -> usize {
        self.kings.len()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn apply_action(&mut self, player: PlayerId, mv: Move) -> Outcome {
        let outcome = combat::apply_action(&mut self.grid, mv.from, mv.to, player);

        match outcome {
            Outcome::Rejected(reason) => {
                debug!(
                    "Rejected move {:?} -> {:?} from player {}: {:?}",
                    mv.from, mv.to, player, reason
                );
            }
            Outcome::KingCaptured { defeated } => {
                info!(
                    "Player {} captured the king of player {} at ({}, {})",
                    player, defeated, mv.to.x, mv.to.y
                );
                info!("Player {} has been eliminated", defeated);
                self.check_winner();
            }
            _ => {}
        }

        outcome
    }

    fn check_winner(&mut self) {
        if self.winner.is_some() {
            return;
        }
        if let [last] = self.alive_players().as_slice() {
            info!("Player {} wins the match", last);
            self.winner = Some(*last);
        }
    }

    /// Players still holding at least one king, ascending.
    pub fn alive_players(&self) -> Vec<PlayerId> {
        let mut alive: Vec<PlayerId> = self
            .grid
            .iter()
            .filter(|(_, tile)| tile.kind == TileKind::King && tile.owner != NEUTRAL)
            .map(|(_, tile)| tile.owner)
            .collect();
        alive.sort_unstable();
        alive.dedup();
        alive
    }

    /// Ends the tick: kings and owned cities grow every tick, owned land every
    /// `turns_to_reset` ticks.
    pub fn advance_growth(&mut self) {
        self.tick += 1;
        self.growth_counter = (self.growth_counter + 1) % self.rules.turns_to_reset;
        let land_grows = self.growth_counter == 0;

        for tile in self.grid.tiles_mut() {
            let grows = match tile.kind {
                TileKind::King => true,
                TileKind::City => tile.owner != NEUTRAL,
                TileKind::Army => land_grows && tile.owner != NEUTRAL,
                TileKind::Mountain => false,
            };
            if grows {
                tile.army = tile.army.saturating_add(1);
            }
        }
    }

    pub fn snapshot_for(&self, player: PlayerId) -> Message {
        Message::Snapshot {
            recipient: player,
            tiles: visibility::snapshot(&self.grid, player),
        }
    }

    pub fn owned_tiles(&self, player: PlayerId) -> usize {
        self.grid
            .iter()
            .filter(|(_, tile)| tile.is_owned_by(player))
            .count()
    }
}
