//! Performance benchmarks for the per-tick hot paths

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::combat::apply_action;
use server::game::GameState;
use server::mapgen::MapGenerator;
use server::rules::GameRules;
use server::visibility::snapshot;
use shared::{Coord, Message, Move, Tile, TileKind};
use std::time::Instant;

fn default_game(players: usize, seed: u64) -> GameState {
    let rules = GameRules::default();
    let map = MapGenerator::new(&rules)
        .generate(&mut StdRng::seed_from_u64(seed), players)
        .unwrap();
    GameState::new(map, rules)
}

/// Benchmarks move resolution on a full-size grid
#[test]
fn benchmark_combat_resolution() {
    let rules = GameRules::default();
    let mut grid = shared::TileGrid::filled(rules.cols, rules.rows, Tile::neutral());
    let a = Coord::new(10, 10);
    let b = Coord::new(11, 10);
    *grid.get_mut(a).unwrap() = Tile::new(TileKind::Army, 1, 1_000);
    *grid.get_mut(b).unwrap() = Tile::new(TileKind::Army, 1, 1);

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        // Shuttle the stack back and forth between two owned tiles.
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
        let _ = apply_action(&mut grid, from, to, 1);
    }

    let duration = start.elapsed();
    println!(
        "Combat resolution: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    let total: u32 = [a, b].iter().map(|c| grid.get(*c).unwrap().army).sum();
    assert_eq!(total, 1_001);
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks producing and encoding every player's snapshot, as one tick does
#[test]
fn benchmark_snapshot_broadcast() {
    let game = default_game(8, 3);

    let ticks = 50;
    let start = Instant::now();
    let mut bytes = 0usize;

    for _ in 0..ticks {
        for player in 1..=8 {
            bytes += game.snapshot_for(player).to_frame().len();
        }
    }

    let duration = start.elapsed();
    println!(
        "Snapshot broadcast: {} ticks x 8 players in {:?} ({:.2} ms/tick, {} bytes)",
        ticks,
        duration,
        duration.as_secs_f64() * 1000.0 / ticks as f64,
        bytes
    );

    // Every tick must fit comfortably inside the 200ms period.
    assert!(duration.as_millis() / ticks < 100);
}

/// Benchmarks the visibility pass alone
#[test]
fn benchmark_visibility_filter() {
    let game = default_game(4, 11);

    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let view = snapshot(game.grid(), (i % 4 + 1) as u8);
        assert_eq!(view.len(), 500);
    }

    let duration = start.elapsed();
    println!(
        "Visibility filter: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks growth advancement over many ticks
#[test]
fn benchmark_growth() {
    let mut game = default_game(2, 5);

    let ticks = 10_000;
    let start = Instant::now();

    for _ in 0..ticks {
        game.advance_growth();
    }

    let duration = start.elapsed();
    println!("Growth: {} ticks in {:?}", ticks, duration);

    let king = game.kings()[0];
    assert_eq!(game.grid().get(king).unwrap().army, 10 + ticks as u32);
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks full map generation
#[test]
fn benchmark_map_generation() {
    let rules = GameRules::default();
    let generator = MapGenerator::new(&rules);

    let maps = 200;
    let start = Instant::now();

    for seed in 0..maps {
        let mut rng = StdRng::seed_from_u64(seed);
        let players = 2 + (seed as usize % 7);
        let map = generator.generate(&mut rng, players).unwrap();
        assert_eq!(map.kings.len(), players);
    }

    let duration = start.elapsed();
    println!(
        "Map generation: {} maps in {:?} ({:.2} ms/map)",
        maps,
        duration,
        duration.as_secs_f64() * 1000.0 / maps as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks decoding of client action frames
#[test]
fn benchmark_action_decoding() {
    let frame = Message::Action(Move::new(Coord::new(12, 7), Coord::new(12, 8))).to_frame();

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let message = Message::from_frame(&frame).unwrap();
        assert!(matches!(message, Message::Action(_)));
    }

    let duration = start.elapsed();
    println!(
        "Action decoding: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}
