//! Roster of connected clients for the grid-conquest server
//!
//! This module tracks every accepted TCP connection, including:
//! - Connection bookkeeping (internal connection id, peer address)
//! - Binding of positional player ids when the match starts
//! - Per-client queues of received actions, drained one per tick
//! - The outbound frame queue feeding each client's writer task
//!
//! The roster is owned by the server task alone; reader and writer tasks only
//! communicate with it through channels.

use log::{debug, info};
use shared::{Move, PlayerId};
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identifies a connection for its whole lifetime, independent of player id.
pub type ConnectionId = u64;

/// Most actions a client may have waiting; further ones are dropped.
pub const MAX_PENDING_ACTIONS: usize = 32;

/// Result of handing a frame to a client's writer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// The writer is behind; this frame is skipped and the next tick supersedes it.
    Dropped,
    /// The writer has gone away, so the client should be removed.
    Closed,
}

/// A connected client
#[derive(Debug)]
pub struct Client {
    pub conn_id: ConnectionId,
    pub addr: SocketAddr,
    /// Set once the match starts.
    pub player_id: Option<PlayerId>,
    /// Received actions in arrival order
    pub pending_actions: VecDeque<Move>,
    outbound: mpsc::Sender<Vec<u8>>,
}

impl Client {
    pub fn new(conn_id: ConnectionId, addr: SocketAddr, outbound: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            conn_id,
            addr,
            player_id: None,
            pending_actions: VecDeque::new(),
            outbound,
        }
    }

    /// Queues a received action
    ///
    /// Returns false when the queue is already full and the action was dropped.
    pub fn queue_action(&mut self, mv: Move) -> bool {
        if self.pending_actions.len() >= MAX_PENDING_ACTIONS {
            return false;
        }
        self.pending_actions.push_back(mv);
        true
    }

    /// Hands a frame to the writer task without waiting.
    pub fn send_frame(&self, frame: Vec<u8>) -> SendStatus {
        match self.outbound.try_send(frame) {
            Ok(()) => SendStatus::Sent,
            Err(TrySendError::Full(_)) => SendStatus::Dropped,
            Err(TrySendError::Closed(_)) => SendStatus::Closed,
        }
    }
}

/// Manages all connected clients
///
/// Clients are kept in connection order. That order decides which player id
/// each client receives and the order in which queued actions are applied.
pub struct ClientManager {
    /// Connected clients keyed by connection id, which only ever increases
    clients: BTreeMap<ConnectionId, Client>,
    next_conn_id: ConnectionId,
    /// Players needed to start the match
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            next_conn_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns the new connection id, or None if the roster is already full.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Vec<u8>>,
    ) -> Option<ConnectionId> {
        if self.is_full() {
            return None;
        }

        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;

        info!("Connection {} accepted from {}", conn_id, addr);
        self.clients
            .insert(conn_id, Client::new(conn_id, addr, outbound));
        Some(conn_id)
    }

    /// Removes a client, returning it if it was still present.
    pub fn remove_client(&mut self, conn_id: ConnectionId) -> Option<Client> {
        let client = self.clients.remove(&conn_id)?;
        match client.player_id {
            Some(player) => info!("Player {} ({}) disconnected", player, client.addr),
            None => info!("Connection {} ({}) closed", conn_id, client.addr),
        }
        Some(client)
    }

    pub fn get(&self, conn_id: ConnectionId) -> Option<&Client> {
        self.clients.get(&conn_id)
    }

    /// Binds player ids 1..=N in connection order.
    pub fn assign_player_ids(&mut self) -> Vec<(ConnectionId, PlayerId)> {
        self.clients
            .values_mut()
            .zip(1..)
            .map(|(client, player)| {
                client.player_id = Some(player);
                info!("Connection {} plays as player {}", client.conn_id, player);
                (client.conn_id, player)
            })
            .collect()
    }

    /// Queues an action from a client that has a player id
    ///
    /// Returns false if the connection is unknown, unbound, or its queue is full.
    pub fn queue_action(&mut self, conn_id: ConnectionId, mv: Move) -> bool {
        let Some(client) = self.clients.get_mut(&conn_id) else {
            return false;
        };
        if client.player_id.is_none() {
            debug!("Ignoring action from unbound connection {}", conn_id);
            return false;
        }
        let queued = client.queue_action(mv);
        if !queued {
            debug!("Action queue of connection {} is full", conn_id);
        }
        queued
    }

    /// Pops at most one pending action per bound client, in roster order.
    pub fn take_next_actions(&mut self) -> Vec<(PlayerId, Move)> {
        self.clients
            .values_mut()
            .filter_map(|client| {
                let player = client.player_id?;
                let mv = client.pending_actions.pop_front()?;
                Some((player, mv))
            })
            .collect()
    }

    /// Player ids of the clients still connected, in roster order.
    pub fn live_players(&self) -> Vec<(ConnectionId, PlayerId)> {
        self.clients
            .values()
            .filter_map(|client| client.player_id.map(|p| (client.conn_id, p)))
            .collect()
    }

    pub fn send_frame(&self, conn_id: ConnectionId, frame: Vec<u8>) -> SendStatus {
        match self.clients.get(&conn_id) {
            Some(client) => client.send_frame(frame),
            None => SendStatus::Closed,
        }
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }
}
