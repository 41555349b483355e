use crate::game::ClientGameState;
use crate::input::{parse_command, Command};
use crate::rendering::render;
use crate::ClientResult;
use log::{debug, info, warn};
use shared::{read_message, write_message, Coord, FramingError, Message, Move};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";
const HELP: &str = "commands: w/a/s/d or up/down/left/right, sel X Y, redraw, quit\n";

/// Connection to a game server with a background task mirroring snapshots
pub struct Client {
    writer: OwnedWriteHalf,
    state: Arc<RwLock<ClientGameState>>,
    /// Count of snapshots applied so far; closed when the server goes away.
    updates: watch::Receiver<u64>,
    receiver: JoinHandle<()>,
}

impl Client {
    pub async fn connect(server_addr: &str) -> ClientResult<Self> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected, waiting for the match to start");

        let (read_half, writer) = stream.into_split();
        let state = Arc::new(RwLock::new(ClientGameState::new()));
        let (updates_tx, updates) = watch::channel(0);
        let receiver = tokio::spawn(receive_loop(read_half, Arc::clone(&state), updates_tx));

        Ok(Client {
            writer,
            state,
            updates,
            receiver,
        })
    }

    pub fn state(&self) -> Arc<RwLock<ClientGameState>> {
        Arc::clone(&self.state)
    }

    /// Whether the server is still sending.
    pub fn is_connected(&self) -> bool {
        self.updates.has_changed().is_ok()
    }

    /// Waits until a snapshot newer than the last one seen here arrives.
    ///
    /// Returns false once the connection has closed.
    pub async fn wait_for_update(&mut self) -> bool {
        self.updates.changed().await.is_ok()
    }

    pub async fn send_action(&mut self, from: Coord, to: Coord) -> Result<(), FramingError> {
        self.send_move(Move::new(from, to)).await
    }

    pub async fn send_move(&mut self, mv: Move) -> Result<(), FramingError> {
        debug!("Sending move {:?} -> {:?}", mv.from, mv.to);
        write_message(&mut self.writer, &Message::Action(mv)).await
    }

    /// Interactive loop: reads commands from `input`, redraws to `output`
    /// whenever a snapshot arrives. Ends on `quit`, end of input, or when the
    /// server disconnects.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> ClientResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        output.write_all(HELP.as_bytes()).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match parse_command(&line) {
                        Some(Command::Quit) => break,
                        Some(Command::Redraw) => self.draw(output).await?,
                        Some(command) => self.handle_command(command, output).await?,
                        None => output.write_all(HELP.as_bytes()).await?,
                    }
                },

                changed = self.updates.changed() => {
                    if changed.is_err() {
                        info!("Server closed the connection");
                        break;
                    }
                    self.draw(output).await?;
                },
            }
        }

        self.writer.shutdown().await?;
        Ok(())
    }

    async fn handle_command<W: AsyncWrite + Unpin>(
        &mut self,
        command: Command,
        output: &mut W,
    ) -> ClientResult<()> {
        match command {
            Command::Move(direction) => {
                let planned = self.state.write().await.plan_move(direction);
                match planned {
                    Some(mv) => self.send_move(mv).await?,
                    None => {
                        let notice = format!("cannot move {:?} from here\n", direction);
                        output.write_all(notice.as_bytes()).await?
                    }
                }
            }
            Command::Select(coord) => {
                if !self.state.write().await.select(coord) {
                    output
                        .write_all(format!("({}, {}) is not yours\n", coord.x, coord.y).as_bytes())
                        .await?;
                }
            }
            Command::Redraw | Command::Quit => {}
        }
        Ok(())
    }

    async fn draw<W: AsyncWrite + Unpin>(&self, output: &mut W) -> ClientResult<()> {
        let screen = render(&*self.state.read().await);
        output.write_all(CLEAR_SCREEN.as_bytes()).await?;
        output.write_all(screen.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive_loop(
    read_half: OwnedReadHalf,
    state: Arc<RwLock<ClientGameState>>,
    updates: watch::Sender<u64>,
) {
    let mut reader = BufReader::new(read_half);

    loop {
        match read_message(&mut reader).await {
            Ok(Message::Snapshot { recipient, tiles }) => {
                let mut state = state.write().await;
                if state.apply_snapshot(recipient, &tiles) {
                    updates.send_replace(state.snapshots_received());
                }
            }
            Ok(Message::Action(_)) => warn!("Server sent an action message, ignoring"),
            Err(FramingError::ConnectionClosed) => {
                info!("Disconnected from server");
                break;
            }
            Err(e) if e.is_fatal() => {
                warn!("Connection to server failed: {}", e);
                break;
            }
            Err(e) => warn!("Discarding malformed frame from server: {}", e),
        }
    }
}
