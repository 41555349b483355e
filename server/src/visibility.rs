//! Fog of war: what each player is allowed to see of the true grid.

use shared::{Coord, PlayerId, Tile, TileGrid, TileKind, NEUTRAL};

/// A tile is visible when the player owns it or any of its eight neighbours.
pub fn is_visible(grid: &TileGrid, coord: Coord, player: PlayerId) -> bool {
    let owned = |c: Coord| grid.get(c).is_some_and(|tile| tile.is_owned_by(player));
    owned(coord) || grid.neighbors(coord).any(owned)
}

/// What an obscured tile looks like. Terrain collapses into a bare obstacle and
/// any army into a single neutral unit, so cities and kings are indistinguishable
/// from mountains and plain land respectively.
pub fn mask_tile(tile: &Tile) -> Tile {
    match tile.kind {
        TileKind::Mountain | TileKind::City => Tile::new(TileKind::Mountain, NEUTRAL, 0),
        TileKind::Army | TileKind::King => Tile::new(TileKind::Army, NEUTRAL, 1),
    }
}

/// The grid as `player` sees it, one entry per cell in row-major order.
pub fn snapshot(grid: &TileGrid, player: PlayerId) -> Vec<(Coord, Tile)> {
    grid.iter()
        .map(|(coord, tile)| {
            if is_visible(grid, coord, player) {
                (coord, *tile)
            } else {
                (coord, mask_tile(tile))
            }
        })
        .collect()
}
