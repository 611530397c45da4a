//! WebSocket Settlement Server
//!
//! Async WebSocket front end for the settlement ledger.
//! Handles authentication and routes requests to the ledger, one reply per
//! request.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::game::player::{Player, PlayerId};
use crate::ledger::{LedgerError, SettlementLedger};
use crate::network::auth::{authenticate, AuthConfig};
use crate::network::protocol::{
    AuthResult, ClientMessage, ErrorCode, ServerError, ServerMessage, StartSessionRequest,
};
use crate::proof::artifact::ProofArtifact;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Close connections silent for this long.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = match std::env::var("SETTLE_BIND_ADDR") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                warn!(value = %v, error = %e, "ignoring invalid SETTLE_BIND_ADDR");
                defaults.bind_addr
            }),
            Err(_) => defaults.bind_addr,
        };

        let max_connections = std::env::var("SETTLE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_connections);

        Self {
            bind_addr,
            max_connections,
            ..defaults
        }
    }
}

/// Settlement server errors.
#[derive(Debug, thiserror::Error)]
pub enum SettlementServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

// =============================================================================
// REQUEST HANDLING
// =============================================================================

/// Per-connection state.
#[derive(Debug, Default, Clone)]
pub struct ConnectionState {
    /// Authenticated player, if any.
    pub player_id: Option<PlayerId>,
}

/// Maps protocol requests onto ledger operations.
///
/// Transport-free, so every request path is testable without sockets.
pub struct SettlementService {
    ledger: Arc<SettlementLedger>,
    auth: AuthConfig,
    version: String,
}

impl SettlementService {
    /// Create a service over a ledger.
    pub fn new(ledger: Arc<SettlementLedger>, auth: AuthConfig, version: impl Into<String>) -> Self {
        if !auth.is_configured() {
            warn!("token auth not configured, trusting client-supplied player ids");
        }
        Self {
            ledger,
            auth,
            version: version.into(),
        }
    }

    /// Underlying ledger.
    pub fn ledger(&self) -> &Arc<SettlementLedger> {
        &self.ledger
    }

    /// Handle one request and produce its reply.
    pub async fn handle(&self, conn: &mut ConnectionState, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Auth(request) => match authenticate(&request, &self.auth) {
                Ok(player_id) => {
                    conn.player_id = Some(player_id);
                    debug!(%player_id, "client authenticated");
                    ServerMessage::AuthResult(AuthResult {
                        player_id,
                        server_version: self.version.clone(),
                    })
                }
                Err(e) => {
                    debug!(error = %e, "authentication failed");
                    ServerMessage::Error(ServerError::from(&e))
                }
            },
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
            },
            ClientMessage::GetSession { session_id } => match self.ledger.get_session(session_id).await {
                Ok(record) => ServerMessage::Session { record },
                Err(e) => ledger_error(&e),
            },
            ClientMessage::StartSession(request) => match conn.player_id {
                Some(caller) => self.start_session(caller, request).await,
                None => not_authenticated(),
            },
            ClientMessage::CommitBoard {
                session_id,
                player,
                board_hash,
            } => match conn.player_id {
                Some(caller) => self.commit_board(caller, session_id, player, board_hash).await,
                None => not_authenticated(),
            },
            ClientMessage::SubmitResult { session_id, artifact } => match conn.player_id {
                Some(caller) => self.submit_result(caller, session_id, artifact).await,
                None => not_authenticated(),
            },
            ClientMessage::AbortSession { session_id } => match conn.player_id {
                Some(caller) => self.abort_session(caller, session_id).await,
                None => not_authenticated(),
            },
        }
    }

    async fn start_session(&self, caller: PlayerId, req: StartSessionRequest) -> ServerMessage {
        if caller != req.player1 && caller != req.player2 {
            return ledger_error(&LedgerError::NotPlayer);
        }

        let started = self
            .ledger
            .start_committed(
                req.session_id,
                req.player1,
                req.player2,
                req.stake_p1,
                req.stake_p2,
                req.board_commit_p1,
                req.board_commit_p2,
            )
            .await;

        match started {
            Ok(record) => ServerMessage::SessionStarted { record },
            Err(e) => ledger_error(&e),
        }
    }

    async fn commit_board(&self, caller: PlayerId, session_id: u32, player: Player, hash: [u8; 32]) -> ServerMessage {
        let record = match self.ledger.get_session(session_id).await {
            Ok(record) => record,
            Err(e) => return ledger_error(&e),
        };
        if record.seat_of(&caller) != Some(player) {
            return ledger_error(&LedgerError::NotPlayer);
        }

        match self.ledger.commit_board(session_id, player, hash).await {
            Ok(status) => ServerMessage::BoardCommitted {
                session_id,
                player,
                status,
            },
            Err(e) => ledger_error(&e),
        }
    }

    async fn submit_result(&self, caller: PlayerId, session_id: u32, artifact: ProofArtifact) -> ServerMessage {
        let certificate = match artifact.check().and_then(|_| artifact.certificate()) {
            Ok(certificate) => certificate,
            Err(e) => return ServerMessage::Error(ServerError::from(&e)),
        };

        let result = self
            .ledger
            .submit_result(session_id, &caller, &artifact.public_output, certificate.as_ref())
            .await;

        match result {
            Ok(receipt) => ServerMessage::ResultAccepted {
                session_id: receipt.session_id,
                winner: receipt.winner,
                winner_id: receipt.winner_id,
                total_moves: receipt.total_moves,
            },
            Err(e) => ledger_error(&e),
        }
    }

    async fn abort_session(&self, caller: PlayerId, session_id: u32) -> ServerMessage {
        let record = match self.ledger.get_session(session_id).await {
            Ok(record) => record,
            Err(e) => return ledger_error(&e),
        };
        if record.seat_of(&caller).is_none() {
            return ledger_error(&LedgerError::NotPlayer);
        }

        match self.ledger.abort(session_id).await {
            Ok(_) => ServerMessage::SessionAborted { session_id },
            Err(e) => ledger_error(&e),
        }
    }
}

fn ledger_error(err: &LedgerError) -> ServerMessage {
    if err.is_idempotent_noop() {
        debug!(error = %err, "request was a no-op");
    } else {
        debug!(error = %err, "request rejected");
    }
    ServerMessage::Error(ServerError::from(err))
}

fn not_authenticated() -> ServerMessage {
    ServerMessage::error(ErrorCode::NotAuthenticated, "authenticate first")
}

// =============================================================================
// SERVER
// =============================================================================

/// Connected client state.
struct ConnectedClient {
    /// Player identifier (after auth).
    player_id: Option<PlayerId>,
    /// Connection time.
    connected_at: Instant,
}

/// The settlement server.
pub struct SettlementServer {
    /// Server configuration.
    config: ServerConfig,
    /// Request handler.
    service: Arc<SettlementService>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl SettlementServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, ledger: Arc<SettlementLedger>, auth: AuthConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let service = SettlementService::new(ledger, auth, config.version.clone());

        Self {
            config,
            service: Arc::new(service),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, SettlementServerError> {
        Ok(TcpListener::bind(&self.config.bind_addr).await?)
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> Result<(), SettlementServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), SettlementServerError> {
        info!("Settlement server listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let service = self.service.clone();
        let idle_timeout = self.config.idle_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            clients.write().await.insert(
                addr,
                ConnectedClient {
                    player_id: None,
                    connected_at: Instant::now(),
                },
            );

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            let mut conn = ConnectionState::default();

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(request) => service.handle(&mut conn, request).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::error(ErrorCode::InvalidInput, format!("invalid message: {}", e))
                                    }
                                };

                                if let Some(player_id) = conn.player_id {
                                    if let Some(client) = clients.write().await.get_mut(&addr) {
                                        client.player_id = Some(player_id);
                                    }
                                }

                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::error(
                                    ErrorCode::InvalidInput,
                                    "binary frames are not supported",
                                )).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = tokio::time::sleep(idle_timeout) => {
                        info!("Closing idle client {}", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies flush, then close
            drop(msg_tx);
            let _ = sender_task.await;

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    player = ?client.player_id.map(|p| p.to_uuid_string()),
                    connected_secs = client.connected_at.elapsed().as_secs(),
                    "Client {} cleaned up",
                    addr
                );
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Request handler.
    pub fn service(&self) -> &Arc<SettlementService> {
        &self.service
    }
}

// =============================================================================
// TESTS
// =============================================================================
