//! Resolution of a single move between two orthogonally adjacent tiles.
//!
//! Moving out of a tile always leaves exactly one unit behind. Against another
//! owner (or neutral land) the attacker captures only with a strictly larger
//! army; a tie favours the defender. Taking a king hands every tile of the
//! defeated player to the attacker and turns that king into a city.

use shared::{Coord, PlayerId, TileGrid, TileKind, NEUTRAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    OutOfBounds,
    NotAdjacent,
    NotOwner,
    /// Mountains can never be entered.
    Impassable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rejected(RejectReason),
    Reinforced,
    Repelled,
    Captured,
    KingCaptured { defeated: PlayerId },
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Outcome::Rejected(_))
    }
}

pub fn apply_action(grid: &mut TileGrid, from: Coord, to: Coord, player: PlayerId) -> Outcome {
    if !grid.in_bounds(from) || !grid.in_bounds(to) {
        return Outcome::Rejected(RejectReason::OutOfBounds);
    }
    if !from.is_orthogonal_to(to) {
        return Outcome::Rejected(RejectReason::NotAdjacent);
    }
    let Some((source, target)) = grid.pair_mut(from, to) else {
        return Outcome::Rejected(RejectReason::OutOfBounds);
    };
    if !source.is_owned_by(player) {
        return Outcome::Rejected(RejectReason::NotOwner);
    }
    if target.is_mountain() {
        return Outcome::Rejected(RejectReason::Impassable);
    }

    let attacking = source.army;
    let defending = target.army;

    if target.owner == source.owner {
        target.army = defending.saturating_add(attacking.saturating_sub(1));
        source.army = 1;
        return Outcome::Reinforced;
    }

    let outcome = if defending >= attacking {
        target.army = defending - attacking + 1;
        source.army = 1;
        Outcome::Repelled
    } else {
        target.army = attacking - defending;
        source.army = 1;
        if target.kind == TileKind::King && target.owner != NEUTRAL {
            Outcome::KingCaptured {
                defeated: target.owner,
            }
        } else {
            if target.kind == TileKind::King {
                target.kind = TileKind::City;
            }
            target.owner = player;
            Outcome::Captured
        }
    };

    target.army = target.army.max(1);
    source.army = source.army.max(1);

    if let Outcome::KingCaptured { defeated } = outcome {
        transfer_territory(grid, defeated, player);
    }

    outcome
}

/// Hands every tile of `defeated` to `victor`; kings among them become cities.
fn transfer_territory(grid: &mut TileGrid, defeated: PlayerId, victor: PlayerId) {
    for tile in grid.tiles_mut().filter(|tile| tile.owner == defeated) {
        tile.owner = victor;
        if tile.kind == TileKind::King {
            tile.kind = TileKind::City;
        }
    }
}
