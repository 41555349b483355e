//! Text commands typed on stdin

use shared::{Coord, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Select(Coord),
    Redraw,
    Quit,
}

/// Parses one input line. Unknown input yields None.
pub fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let head = words.next()?.to_ascii_lowercase();

    let command = match head.as_str() {
        "w" | "u" | "up" => Command::Move(Direction::Up),
        "s" | "down" => Command::Move(Direction::Down),
        "a" | "l" | "left" => Command::Move(Direction::Left),
        "d" | "r" | "right" => Command::Move(Direction::Right),
        "sel" | "select" => {
            let x = words.next()?.parse().ok()?;
            let y = words.next()?.parse().ok()?;
            Command::Select(Coord::new(x, y))
        }
        "redraw" => Command::Redraw,
        "q" | "quit" | "exit" => Command::Quit,
        _ => return None,
    };

    if words.next().is_some() {
        return None;
    }
    Some(command)
}
