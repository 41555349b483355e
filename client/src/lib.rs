//! # Grid Conquest Client Library
//!
//! A text client for the grid-conquest server. The server is authoritative and
//! sends a complete fog-filtered snapshot every tick, so the client keeps no
//! simulation of its own: it mirrors the latest snapshot, lets the player pick
//! a tile, and turns direction commands into move requests.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The mirrored grid, the player id the server assigned, and the current
//! selection:
//! - Snapshot application with rectangle validation
//! - Tile selection restricted to owned tiles
//! - Move planning that follows the selection across the grid
//!
//! ### Input Module (`input`)
//! Parsing of typed commands (`w/a/s/d`, `sel X Y`, `redraw`, `quit`).
//!
//! ### Network Module (`network`)
//! The TCP connection: a background task decodes snapshots into the mirror,
//! while the foreground sends length-prefixed move requests.
//!
//! ### Rendering Module (`rendering`)
//! Draws the mirror as a text grid with a status line.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::Coord;
//!
//! #[tokio::main]
//! async fn main() -> client::ClientResult<()> {
//!     let mut client = Client::connect("127.0.0.1:12345").await?;
//!
//!     // Wait for the first snapshot, then push the king's army right
//!     if client.wait_for_update().await {
//!         let state = client.state();
//!         let king = state.read().await.selected();
//!         if let Some(from) = king {
//!             client.send_action(from, Coord::new(from.x + 1, from.y)).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
