//! # Grid Conquest Server Library
//!
//! This library provides the authoritative server for a real-time grid-conquest
//! game. Players own tiles on a rectangular grid, tiles grow armies over time,
//! and players capture land by pushing armies between neighbouring tiles. The
//! server holds the only true copy of the grid; clients see a fog-filtered view
//! of it every tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every move is validated and resolved here. Clients only request moves and
//! render whatever the latest snapshot tells them.
//!
//! ### Client Management
//! Handles the lifecycle of TCP connections:
//! - Accepting players until the configured count is reached
//! - Binding player ids 1..=N in connection order when the match starts
//! - Queuing each player's actions and applying one per tick
//! - Dropping clients whose socket closes or stalls, without ending the match
//!
//! ### Snapshot Broadcasting
//! Every tick each player receives the whole grid with everything outside their
//! sensing radius masked out.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! One task owns the grid and the roster. Per-connection reader tasks decode
//! frames and forward actions over a channel; per-connection writer tasks drain
//! a small bounded queue of outgoing frames. No lock guards game state because
//! nothing else can reach it.
//!
//! ### Lifecycle
//! `ACCEPTING` until enough players are connected, then `PLAYING` until every
//! player has disconnected, then `TERMINATED`. The listening socket is closed
//! when play begins.
//!
//! ## Module Organization
//!
//! ### Rules (`rules`)
//! Gameplay tunables with defaults, optionally overridden from a JSON file.
//!
//! ### Map Generation (`mapgen`)
//! Separated king placement followed by a weighted city/mountain/land fill.
//!
//! ### Combat (`combat`)
//! Resolves a single move, including the transfer of a defeated player's land.
//!
//! ### Visibility (`visibility`)
//! Computes the per-player masked view of the grid.
//!
//! ### Game (`game`)
//! Owns the grid and the growth schedule, and tracks eliminations.
//!
//! ### Client Manager (`client_manager`)
//! The connection roster, player id binding and action queues.
//!
//! ### Network (`network`)
//! TCP accept loop, connection tasks and the tick loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::rules::GameRules;
//!
//! #[tokio::main]
//! async fn main() -> server::ServerResult<()> {
//!     // Two players on the default 25x20 grid, one tick every 200ms
//!     let mut server = Server::new("0.0.0.0:12345", 2, GameRules::default()).await?;
//!
//!     // Blocks until both players have joined, the match has been played,
//!     // and every player has disconnected again
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod combat;
pub mod game;
pub mod mapgen;
pub mod network;
pub mod rules;
pub mod visibility;

/// Error type for setup and top-level failures, safe to move across tasks.
pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
