//! Plain-text rendering of the client's mirrored grid

use crate::game::ClientGameState;
use shared::{Coord, PlayerId, Tile, TileGrid, TileKind, NEUTRAL};

/// Width of one rendered cell: the widest label (`999+p8`) in selection brackets.
const CELL_WIDTH: usize = 8;

/// Short cell label: kind and army, with the owner appended for other players.
fn cell_label(tile: &Tile, me: Option<PlayerId>) -> String {
    let army = if tile.army > 999 {
        "999+".to_string()
    } else {
        tile.army.to_string()
    };
    match tile.kind {
        TileKind::Mountain => "^^".to_string(),
        TileKind::King => format!("K{}", army),
        TileKind::City => format!("C{}", army),
        TileKind::Army if tile.owner == NEUTRAL => ".".to_string(),
        TileKind::Army if Some(tile.owner) == me => army,
        TileKind::Army => format!("{}p{}", army, tile.owner),
    }
}

pub fn render_grid(grid: &TileGrid, me: Option<PlayerId>, selected: Option<Coord>) -> String {
    let mut out = String::new();

    out.push_str("   ");
    for x in 0..grid.cols() {
        out.push_str(&format!("{:>width$}", x, width = CELL_WIDTH));
    }
    out.push('\n');

    for y in 0..grid.rows() {
        out.push_str(&format!("{:>2} ", y));
        for x in 0..grid.cols() {
            let coord = Coord::new(x, y);
            let Some(tile) = grid.get(coord) else {
                continue;
            };
            let mut label = cell_label(tile, me);
            if selected == Some(coord) {
                label = format!("[{}]", label);
            } else if me.is_some_and(|p| tile.is_owned_by(p)) {
                label = format!("*{}", label);
            }
            out.push_str(&format!("{:>width$}", label, width = CELL_WIDTH));
        }
        out.push('\n');
    }

    out
}

/// The full screen: grid followed by a status line.
pub fn render(state: &ClientGameState) -> String {
    let Some(grid) = state.grid() else {
        return "Waiting for the match to start...\n".to_string();
    };

    let mut out = render_grid(grid, state.player_id(), state.selected());
    let stats = state.stats();
    out.push_str(&format!(
        "player {} | tiles {} | army {} | selected {}\n",
        state
            .player_id()
            .map_or_else(|| "?".to_string(), |p| p.to_string()),
        stats.owned_tiles,
        stats.total_army,
        state
            .selected()
            .map_or_else(|| "-".to_string(), |c| format!("({}, {})", c.x, c.y)),
    ));
    out
}
