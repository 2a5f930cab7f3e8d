//! Server network layer: accepting TCP clients, reading their intents and
//! writing queued frames back to them

use crate::client_manager::{ClientManager, Frame};
use crate::config::ServerConfig;
use crate::error::{ConnectionError, ServerError};
use crate::game::GameSession;
use crate::game_loop::ServerLoop;
use log::{debug, error, info, warn};
use shared::codec::{decode_client, encode_server, frame};
use shared::{read_frame, write_frame, PlayerId, ServerMessage, WireFormat, PLAYER_COUNT};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Resolves once shutdown has been requested or the signal source is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Requests a clean stop of a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// Accepts players, spawns their connection handlers and starts the game
/// loop once both player slots are filled
pub struct Server {
    listener: TcpListener,
    session: Arc<Mutex<GameSession>>,
    clients: Arc<RwLock<ClientManager>>,
    config: ServerConfig,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Binds the listening socket. This is the only fatal failure point.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.address)
            .await
            .map_err(|source| ServerError::Bind {
                address: config.address.clone(),
                source,
            })?;
        info!(
            "Server listening on {} ({} payloads)",
            listener.local_addr()?,
            config.wire_format
        );

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Server {
            listener,
            session: Arc::new(Mutex::new(GameSession::new(config.game.clone()))),
            clients: Arc::new(RwLock::new(ClientManager::new(PLAYER_COUNT))),
            config,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Serves clients until shutdown is requested.
    pub async fn run(self) -> Result<(), ServerError> {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut game_loop: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = self.accept_client(stream, addr).await {
                            warn!("Connection from {} refused: {}", addr, e);
                        }
                        if game_loop.is_none() && self.clients.read().await.is_full() {
                            info!("Both players connected, starting game");
                            game_loop = Some(self.spawn_game_loop());
                        }
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },

                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        if let Some(handle) = game_loop {
            if let Err(e) = handle.await {
                error!("Game loop task panicked: {}", e);
            }
        }
        self.clients.write().await.clear();

        Ok(())
    }

    fn spawn_game_loop(&self) -> JoinHandle<()> {
        let server_loop = ServerLoop::new(
            Arc::clone(&self.session),
            Arc::clone(&self.clients),
            self.config.wire_format,
            self.shutdown_tx.subscribe(),
        );
        tokio::spawn(server_loop.run())
    }

    /// Assigns a player slot and queues the initial snapshot before the
    /// client can receive any broadcast.
    async fn accept_client(&self, stream: TcpStream, addr: SocketAddr) -> Result<(), ConnectionError> {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", addr, e);
        }

        let (tx, rx) = mpsc::channel::<Frame>(self.config.outbound_queue);
        let format = self.config.wire_format;

        let player_id = {
            let session = self.session.lock().await;
            let mut clients = self.clients.write().await;

            match clients.free_slot() {
                Some(id) => {
                    let initial = ServerMessage::InitialSnapshot(session.initial_snapshot(id));
                    let bytes = Arc::new(frame(&encode_server(format, initial)?)?);
                    // Still under the write lock, so no broadcast can overtake it.
                    let assigned = clients.add_client(addr, tx);
                    if !clients.send_to(id, bytes) {
                        warn!("Could not queue initial snapshot for {}", addr);
                    }
                    assigned
                }
                None => None,
            }
        };

        let Some(player_id) = player_id else {
            reject(stream, format).await;
            return Err(ConnectionError::ServerFull);
        };

        let (reader, writer) = stream.into_split();
        tokio::spawn(write_frames(writer, rx, player_id));

        let handler = ConnectionHandler {
            player_id,
            format,
            session: Arc::clone(&self.session),
            clients: Arc::clone(&self.clients),
        };
        tokio::spawn(handler.run(reader, self.shutdown_tx.subscribe()));

        Ok(())
    }
}

async fn reject(mut stream: TcpStream, format: WireFormat) {
    let msg = ServerMessage::Rejected {
        reason: "Server full".to_string(),
    };
    match encode_server(format, msg) {
        Ok(payload) => {
            if let Err(e) = write_frame(&mut stream, &payload).await {
                debug!("Failed to send rejection: {}", e);
            }
        }
        Err(e) => error!("Failed to encode rejection: {}", e),
    }
    if let Err(e) = stream.shutdown().await {
        debug!("Failed to close rejected connection: {}", e);
    }
}

/// Drains a client's outbound queue into its socket. Ends when the queue is
/// dropped or the socket fails.
async fn write_frames(mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Frame>, player_id: PlayerId) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            warn!("Failed to send to player {}: {}", player_id, e);
            break;
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!("Failed to close socket of player {}: {}", player_id, e);
    }
    debug!("Writer for player {} stopped", player_id);
}

/// Reads one client's intents and applies them to the session
pub struct ConnectionHandler {
    player_id: PlayerId,
    format: WireFormat,
    session: Arc<Mutex<GameSession>>,
    clients: Arc<RwLock<ClientManager>>,
}

impl ConnectionHandler {
    /// Runs until the client disconnects, the transport fails or the server
    /// shuts down, then frees the player slot.
    pub async fn run<R>(self, mut reader: R, mut shutdown: watch::Receiver<bool>)
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let frame = tokio::select! {
                frame = read_frame(&mut reader) => frame,
                _ = wait_for_shutdown(&mut shutdown) => break,
            };

            match frame {
                Ok(Some(payload)) => self.handle_payload(&payload).await,
                Ok(None) => {
                    info!("Player {} closed the connection", self.player_id);
                    break;
                }
                Err(e) => {
                    warn!("Connection error for player {}: {}", self.player_id, e);
                    break;
                }
            }
        }

        self.clients.write().await.remove_client(&self.player_id);
    }

    async fn handle_payload(&self, payload: &[u8]) {
        let intent = match decode_client(self.format, payload) {
            Ok(intent) => intent,
            Err(e) => {
                warn!("Ignoring malformed message from player {}: {}", self.player_id, e);
                return;
            }
        };

        let mut session = self.session.lock().await;
        if let Err(reason) = session.apply_intent(self.player_id, intent) {
            debug!("Ignored {:?} from player {}: {}", intent.action, self.player_id, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use shared::codec::encode_client;
    use shared::{Direction, Intent};
    use tokio_test::io::Builder;

    fn setup() -> (ConnectionHandler, Arc<Mutex<GameSession>>, Arc<RwLock<ClientManager>>) {
        let session = Arc::new(Mutex::new(GameSession::new(GameConfig {
            seed: Some(5),
            ..GameConfig::default()
        })));
        let mut clients = ClientManager::new(PLAYER_COUNT);
        let (tx, _rx) = mpsc::channel(4);
        let player_id = clients.add_client("127.0.0.1:7100".parse().unwrap(), tx).unwrap();
        let clients = Arc::new(RwLock::new(clients));

        let handler = ConnectionHandler {
            player_id,
            format: WireFormat::Json,
            session: Arc::clone(&session),
            clients: Arc::clone(&clients),
        };
        (handler, session, clients)
    }

    fn intent_frame(intent: Intent) -> Vec<u8> {
        frame(&encode_client(WireFormat::Json, intent).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_handler_skips_garbage_and_applies_split_intent() {
        let (handler, session, clients) = setup();
        let garbage = frame(b"{not json").unwrap();
        let up = intent_frame(Intent::move_towards(Direction::Up));

        // Intent arrives split across two reads after an undecodable frame.
        let reader = Builder::new()
            .read(&garbage)
            .read(&up[..3])
            .read(&up[3..])
            .build();
        let (_shutdown_tx, shutdown) = watch::channel(false);

        handler.run(reader, shutdown).await;

        assert_eq!(session.lock().await.snake(1).unwrap().direction, Direction::Up);
        // EOF ends the handler and frees the slot.
        assert_eq!(clients.read().await.free_slot(), Some(1));
    }

    #[tokio::test]
    async fn test_handler_ignores_rejected_intents() {
        let (handler, session, _clients) = setup();
        let reader = Builder::new()
            .read(&intent_frame(Intent::move_towards(Direction::Left)))
            .read(&intent_frame(Intent::restart()))
            .build();
        let (_shutdown_tx, shutdown) = watch::channel(false);

        handler.run(reader, shutdown).await;

        let session = session.lock().await;
        assert_eq!(session.snake(1).unwrap().direction, Direction::Right);
        assert!(!session.is_game_over());
    }

    #[tokio::test]
    async fn test_handler_stops_on_transport_error() {
        let (handler, session, clients) = setup();
        let reader = Builder::new()
            .read(&intent_frame(Intent::move_towards(Direction::Down)))
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (_shutdown_tx, shutdown) = watch::channel(false);

        handler.run(reader, shutdown).await;

        assert_eq!(session.lock().await.snake(1).unwrap().direction, Direction::Down);
        assert_eq!(clients.read().await.free_slot(), Some(1));
    }
}
