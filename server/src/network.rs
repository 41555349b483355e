//! Server network layer: TCP connection handling and the match tick loop

use crate::client_manager::{ClientManager, ConnectionId, SendStatus};
use crate::game::GameState;
use crate::mapgen::MapGenerator;
use crate::rules::GameRules;
use crate::ServerResult;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::framing::write_frame;
use shared::{read_message, FramingError, Message, Move, MAX_PLAYERS};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

/// Frames a client may have waiting before further snapshots are skipped.
pub const OUTBOUND_QUEUE: usize = 8;
/// A write stalled for this long counts as a disconnection.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    ActionReceived { conn_id: ConnectionId, mv: Move },
    ClientDisconnected { conn_id: ConnectionId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerPhase {
    Accepting = 0,
    Playing = 1,
    Terminated = 2,
}

impl ServerPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServerPhase::Accepting,
            1 => ServerPhase::Playing,
            _ => ServerPhase::Terminated,
        }
    }
}

/// Read-only view of the server's progress, usable from other tasks while
/// [`Server::run`] is in progress.
#[derive(Debug, Clone)]
pub struct ServerStatus {
    connected: Arc<AtomicUsize>,
    expected: usize,
    phase: Arc<AtomicU8>,
}

impl ServerStatus {
    fn new(expected: usize) -> Self {
        Self {
            connected: Arc::new(AtomicUsize::new(0)),
            expected,
            phase: Arc::new(AtomicU8::new(ServerPhase::Accepting as u8)),
        }
    }

    pub fn connected_count(&self) -> usize {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn expected_count(&self) -> usize {
        self.expected
    }

    pub fn phase(&self) -> ServerPhase {
        ServerPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    fn set_connected(&self, count: usize) {
        self.connected.store(count, Ordering::Relaxed);
    }

    fn set_phase(&self, phase: ServerPhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }
}

/// Main server coordinating connections and the authoritative match
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: ClientManager,
    rules: GameRules,
    num_players: usize,
    seed: Option<u64>,
    status: ServerStatus,
    readers: HashMap<ConnectionId, JoinHandle<()>>,

    // Communication channel from connection tasks
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Binds the listening socket. Invalid rules or player counts and bind
    /// failures are reported here, before any match state exists.
    pub async fn new(addr: &str, num_players: usize, rules: GameRules) -> ServerResult<Self> {
        rules.validate()?;
        if num_players == 0 || num_players > MAX_PLAYERS {
            return Err(format!("player count must be within 1..={}", MAX_PLAYERS).into());
        }
        if num_players > rules.cols * rules.rows {
            return Err(format!(
                "{} players do not fit on a {}x{} grid",
                num_players, rules.cols, rules.rows
            )
            .into());
        }

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(num_players),
            rules,
            num_players,
            seed: None,
            status: ServerStatus::new(num_players),
            readers: HashMap::new(),
            server_tx,
            server_rx,
        })
    }

    /// Makes map generation reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The host's outward-facing address, falling back to the bound one.
    ///
    /// Connecting a UDP socket only selects a route; nothing is sent.
    pub async fn get_ip(&self) -> IpAddr {
        async fn outward() -> std::io::Result<IpAddr> {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect("8.8.8.8:80").await?;
            Ok(socket.local_addr()?.ip())
        }

        match outward().await {
            Ok(ip) if !ip.is_unspecified() => ip,
            _ => self.local_addr.ip(),
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status.clone()
    }

    pub fn connected_count(&self) -> usize {
        self.clients.len()
    }

    /// Runs the whole lifecycle: accept players, play until everyone has left.
    pub async fn run(&mut self) -> ServerResult<()> {
        let listener = self
            .listener
            .take()
            .ok_or("server has already been run")?;

        self.accept_players(&listener).await;
        drop(listener);

        let mut game = self.start_match()?;
        self.play(&mut game).await;

        self.status.set_phase(ServerPhase::Terminated);
        info!("Match over after {} ticks", game.tick);
        Ok(())
    }

    async fn accept_players(&mut self, listener: &TcpListener) {
        info!("Waiting for {} players", self.num_players);

        while !self.clients.is_full() {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        self.register_client(stream, addr);
                        info!("{}/{} players connected", self.clients.len(), self.num_players);
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                Some(message) = self.server_rx.recv() => {
                    self.handle_message(message);
                }
            }
        }
    }

    fn start_match(&mut self) -> ServerResult<GameState> {
        let bound = self.clients.assign_player_ids();

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let map = MapGenerator::new(&self.rules).generate(&mut rng, bound.len())?;

        self.status.set_phase(ServerPhase::Playing);
        info!(
            "Match started: {} players on a {}x{} grid",
            bound.len(),
            self.rules.cols,
            self.rules.rows
        );
        Ok(GameState::new(map, self.rules.clone()))
    }

    async fn play(&mut self, game: &mut GameState) {
        let mut tick_interval = interval(self.rules.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.clients.is_empty() {
            tokio::select! {
                Some(message) = self.server_rx.recv() => {
                    self.handle_message(message);
                },

                _ = tick_interval.tick() => {
                    self.run_tick(game);

                    if game.tick % 60 == 0 {
                        debug!(
                            "Tick {}: {} clients, {} players alive",
                            game.tick,
                            self.clients.len(),
                            game.alive_players().len()
                        );
                    }
                },
            }
        }

        info!("All players have disconnected");
    }

    /// One tick: broadcast, then apply at most one action per player, then grow.
    fn run_tick(&mut self, game: &mut GameState) {
        let mut closed = Vec::new();
        for (conn_id, player) in self.clients.live_players() {
            let frame = game.snapshot_for(player).to_frame();
            match self.clients.send_frame(conn_id, frame) {
                SendStatus::Sent => {}
                SendStatus::Dropped => {
                    debug!("Skipped snapshot for player {}, writer is behind", player)
                }
                SendStatus::Closed => closed.push(conn_id),
            }
        }
        for conn_id in closed {
            self.drop_client(conn_id);
        }

        for (player, mv) in self.clients.take_next_actions() {
            game.apply_action(player, mv);
        }

        game.advance_growth();
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::ActionReceived { conn_id, mv } => {
                self.clients.queue_action(conn_id, mv);
            }
            ServerMessage::ClientDisconnected { conn_id } => {
                self.drop_client(conn_id);
            }
        }
    }

    fn register_client(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", addr, e);
        }

        let (read_half, write_half) = stream.into_split();
        let (frame_tx, frame_rx) = mpsc::channel(OUTBOUND_QUEUE);

        let Some(conn_id) = self.clients.add_client(addr, frame_tx) else {
            warn!("Rejecting connection from {}: roster is full", addr);
            return;
        };
        self.status.set_connected(self.clients.len());

        self.spawn_writer(conn_id, write_half, frame_rx);
        let reader = self.spawn_reader(conn_id, read_half);
        self.readers.insert(conn_id, reader);
    }

    fn drop_client(&mut self, conn_id: ConnectionId) {
        if let Some(reader) = self.readers.remove(&conn_id) {
            reader.abort();
        }
        if self.clients.remove_client(conn_id).is_some() {
            self.status.set_connected(self.clients.len());
        }
    }

    /// Spawns the task that decodes frames from one client
    fn spawn_reader<R>(&self, conn_id: ConnectionId, read_half: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);

            loop {
                match read_message(&mut reader).await {
                    Ok(Message::Action(mv)) => {
                        if server_tx
                            .send(ServerMessage::ActionReceived { conn_id, mv })
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(Message::Snapshot { .. }) => {
                        warn!("Connection {} sent a snapshot, ignoring", conn_id);
                    }
                    Err(FramingError::ConnectionClosed) => {
                        debug!("Connection {} reached end of stream", conn_id);
                        break;
                    }
                    Err(e) if e.is_fatal() => {
                        warn!("Read from connection {} failed: {}", conn_id, e);
                        break;
                    }
                    Err(e) => {
                        warn!("Discarding frame from connection {}: {}", conn_id, e);
                    }
                }
            }

            let _ = server_tx.send(ServerMessage::ClientDisconnected { conn_id });
        })
    }

    /// Spawns the task that drains one client's outbound frame queue
    fn spawn_writer<W>(
        &self,
        conn_id: ConnectionId,
        mut writer: W,
        mut frames: mpsc::Receiver<Vec<u8>>,
    ) -> JoinHandle<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let failure = match timeout(WRITE_TIMEOUT, write_frame(&mut writer, &frame)).await
                {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => format!("no progress for {:?}", WRITE_TIMEOUT),
                };
                warn!("Write to connection {} failed: {}", conn_id, failure);
                let _ = server_tx.send(ServerMessage::ClientDisconnected { conn_id });
                break;
            }

            let _ = writer.shutdown().await;
        })
    }
}
