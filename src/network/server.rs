//! WebSocket Grid Server
//!
//! Async WebSocket server exposing the grid operations. Each connection
//! handles its frames in order; all connections share one [`GridService`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::engine::{GridError, GridService};
use crate::grid::{RevealOptions, DEFAULT_PAGE_LIMIT};
use crate::network::protocol::{ClientMessage, ServerMessage, ErrorCode};
use crate::store::KeyValueStore;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Close connections silent for this long.
    pub idle_timeout: Duration,
    /// Directory holding the store document.
    pub data_dir: PathBuf,
    /// Seed used when booting onto an empty store.
    pub boot_seed: Option<i32>,
    /// Reject reveals from anyone but the current player, when one is set.
    pub enforce_turn_gating: bool,
    /// Run the bot server-side at this cadence.
    pub autoplay_interval: Option<Duration>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            data_dir: PathBuf::from("data"),
            boot_seed: None,
            enforce_turn_gating: false,
            autoplay_interval: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `REVEAL_GRID_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_parse("REVEAL_GRID_BIND").unwrap_or(defaults.bind_addr),
            max_connections: env_parse("REVEAL_GRID_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            idle_timeout: env_parse("REVEAL_GRID_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            data_dir: std::env::var("REVEAL_GRID_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            boot_seed: env_parse("REVEAL_GRID_SEED"),
            enforce_turn_gating: std::env::var("REVEAL_GRID_ENFORCE_TURN")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            autoplay_interval: env_parse("REVEAL_GRID_AUTOPLAY_MS").map(Duration::from_millis),
            version: defaults.version,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

/// Grid server errors.
#[derive(Debug, thiserror::Error)]
pub enum GridServerError {
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

/// Per-connection state carried between requests.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    /// Client id used for identity assignment, once known.
    pub client_id: Option<String>,
}

fn fault(e: GridError) -> ServerMessage {
    match e {
        GridError::NotBooted => ServerMessage::error(ErrorCode::NotBooted, e.to_string()),
        other => {
            error!("request failed: {}", other);
            ServerMessage::error(ErrorCode::InternalError, other.to_string())
        }
    }
}

fn server_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Answer one client frame.
pub async fn handle_client_message<S: KeyValueStore>(
    service: &GridService<S>,
    config: &ServerConfig,
    ctx: &mut ClientContext,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::Boot { seed } => match service.boot(seed.or(config.boot_seed)).await {
            Ok(kind) => ServerMessage::Booted { kind },
            Err(e) => fault(e),
        },

        ClientMessage::Snapshot => match service.snapshot().await {
            Ok(snapshot) => ServerMessage::Snapshot(snapshot),
            Err(e) => fault(e),
        },

        ClientMessage::Reveal { id, player_id } => {
            let options = RevealOptions {
                enforce_turn: config.enforce_turn_gating,
                ..RevealOptions::default()
            };
            match service.reveal_cell(&id, player_id.as_deref(), &options).await {
                Ok(Ok(revealed)) => ServerMessage::Revealed { cell: revealed.cell, meta: revealed.meta },
                Ok(Err(e)) => ServerMessage::error(e.code(), e.to_string()),
                Err(e) => fault(e),
            }
        }

        ClientMessage::BotStep => match service.bot_step().await {
            Ok(Ok(step)) => ServerMessage::BotStepped {
                revealed: step.revealed,
                meta: step.meta,
                done: step.done,
            },
            Ok(Err(e)) => ServerMessage::error(e.code(), e.to_string()),
            Err(e) => fault(e),
        },

        ClientMessage::AdminReset { mode, seed } => match service.admin_reset(mode, seed).await {
            Ok(meta) => ServerMessage::ResetDone { meta },
            Err(e) => fault(e),
        },

        ClientMessage::AdminTargets => match service.admin_targets().await {
            Ok(targets) => ServerMessage::Targets { targets },
            Err(e) => fault(e),
        },

        ClientMessage::PickRandomPlayer => match service.pick_random_eligible_user().await {
            Ok(Ok(player_id)) => ServerMessage::PlayerPicked { player_id },
            Ok(Err(e)) => ServerMessage::error(e.code(), e.to_string()),
            Err(e) => fault(e),
        },

        ClientMessage::GetCurrentPlayer => match service.current_player().await {
            Ok(current_player_id) => ServerMessage::CurrentPlayer { current_player_id },
            Err(e) => fault(e),
        },

        ClientMessage::SetCurrentPlayer { player_id } => {
            match service.set_current_player(player_id.as_deref()).await {
                Ok(Ok(())) => ServerMessage::Ok,
                Ok(Err(e)) => ServerMessage::error(e.code(), e.to_string()),
                Err(e) => fault(e),
            }
        }

        ClientMessage::EligibleUsers { offset, limit, query } => {
            let page = service
                .list_eligible_users(
                    offset.unwrap_or(0),
                    limit.unwrap_or(DEFAULT_PAGE_LIMIT),
                    query.as_deref(),
                )
                .await;
            match page {
                Ok(page) => ServerMessage::EligibleUsers(page),
                Err(e) => fault(e),
            }
        }

        ClientMessage::AssignUser { client_id } => {
            let client_id = client_id
                .filter(|c| !c.is_empty())
                .or_else(|| ctx.client_id.clone())
                .unwrap_or_else(|| format!("cid-{}", uuid::Uuid::new_v4()));
            ctx.client_id = Some(client_id.clone());
            match service.assign_user_for_client(&client_id).await {
                Ok(user) => ServerMessage::AssignedUser { user_id: user.id, name: user.name, client_id },
                Err(e) => fault(e),
            }
        }

        ClientMessage::ResolveUsers { ids } => ServerMessage::ResolvedUsers {
            users: service.resolve_users(&ids).await,
        },

        ClientMessage::GetBotDelay => ServerMessage::BotDelay(service.bot_delay_range().await),

        ClientMessage::SetBotDelay { min_ms, max_ms } => match (min_ms, max_ms) {
            (Some(min), Some(max)) if min.is_finite() && max.is_finite() => {
                let range = service.set_bot_delay_range(min.floor() as i64, max.floor() as i64).await;
                ServerMessage::BotDelay(range)
            }
            _ => ServerMessage::error(ErrorCode::InvalidInput, "minMs and maxMs required"),
        },

        ClientMessage::Ping { timestamp } => ServerMessage::Pong {
            timestamp,
            server_time: server_time_ms(),
        },
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// Connected client state.
struct ConnectedClient {
    /// Identity assignment key, once known.
    client_id: Option<String>,
    /// Connection time.
    connected_at: Instant,
    /// Last frame received.
    last_activity: Instant,
}

/// The grid server.
pub struct GridServer<S: KeyValueStore> {
    /// Server configuration.
    config: ServerConfig,
    /// Shared grid state.
    service: Arc<GridService<S>>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl<S: KeyValueStore> GridServer<S> {
    /// Create a new server over a booted (or bootable) service.
    pub fn new(config: ServerConfig, service: Arc<GridService<S>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            service,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Receiver fired on [`GridServer::shutdown`]; also used by the bot driver.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Run the server until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GridServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Grid server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GridServerError> {
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
        let config = self.config.clone();
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

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    client_id: None,
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                });
            }

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
            });

            let mut ctx = ClientContext::default();

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = tokio::time::timeout(config.idle_timeout, ws_receiver.next()) => {
                        let msg = match msg {
                            Ok(msg) => msg,
                            Err(_) => {
                                info!("Closing idle client {}", addr);
                                break;
                            }
                        };
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                    }
                                }

                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        handle_client_message(&service, &config, &mut ctx, client_msg).await
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::error(ErrorCode::InvalidInput, "Invalid message format")
                                    }
                                };

                                if ctx.client_id.is_some() {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.client_id = ctx.client_id.clone();
                                    }
                                }

                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::error(
                                    ErrorCode::InvalidInput,
                                    "Binary frames are not supported",
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
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies drain, then stop the writer
            drop(msg_tx);
            let _ = tokio::time::timeout(Duration::from_secs(1), sender_task).await;

            // Remove client
            {
                let mut clients = clients.write().await;
                if let Some(client) = clients.remove(&addr) {
                    info!(
                        client_id = ?client.client_id,
                        connected_secs = client.connected_at.elapsed().as_secs(),
                        "Client {} cleaned up",
                        addr
                    );
                }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GridConfig;
    use crate::grid::BotDelayRange;
    use crate::network::protocol::ServerError;
    use crate::store::MemoryStore;

    fn service() -> GridService<MemoryStore> {
        let config = GridConfig {
            rows: 4,
            cols: 4,
            user_count: 8,
            default_seed: Some(2025),
            bot_delay: BotDelayRange::new(0, 0),
        };
        GridService::new(config, MemoryStore::new())
    }

    async fn send(svc: &GridService<MemoryStore>, config: &ServerConfig, ctx: &mut ClientContext, json: &str) -> ServerMessage {
        let msg = ClientMessage::from_json(json).unwrap();
        handle_client_message(svc, config, ctx, msg).await
    }

    fn error_code(msg: &ServerMessage) -> Option<ErrorCode> {
        match msg {
            ServerMessage::Error(ServerError { code, .. }) => Some(*code),
            _ => None,
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.enforce_turn_gating);
        assert!(config.autoplay_interval.is_none());
    }

    #[tokio::test]
    async fn test_not_booted_maps_to_503() {
        let svc = service();
        let config = ServerConfig::default();
        let mut ctx = ClientContext::default();
        let reply = send(&svc, &config, &mut ctx, r#"{"type":"snapshot"}"#).await;
        match reply {
            ServerMessage::Error(err) => {
                assert_eq!(err.code, ErrorCode::NotBooted);
                assert_eq!(err.status, 503);
            }
            other => panic!("unexpected reply {:?}", other),
        }
        let reply = send(&svc, &config, &mut ctx, r#"{"type":"bot_step"}"#).await;
        assert_eq!(error_code(&reply), Some(ErrorCode::NotBooted));
    }

    #[tokio::test]
    async fn test_reveal_flow() {
        let svc = service();
        let config = ServerConfig::default();
        let mut ctx = ClientContext::default();
        send(&svc, &config, &mut ctx, r#"{"type":"boot"}"#).await;

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"reveal","id":"r0-c1","playerId":"u00001"}"#).await;
        assert!(matches!(reply, ServerMessage::Revealed { .. }));

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"reveal","id":"r0-c2","playerId":"u00001"}"#).await;
        assert_eq!(error_code(&reply), Some(ErrorCode::AlreadyPlayed));

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"reveal","id":"r0-c1"}"#).await;
        assert_eq!(error_code(&reply), Some(ErrorCode::AlreadyRevealed));

        // Empty id falls through to NOT_FOUND
        let reply = send(&svc, &config, &mut ctx, r#"{"type":"reveal"}"#).await;
        assert_eq!(error_code(&reply), Some(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn test_turn_gating_is_a_server_option() {
        let svc = service();
        let config = ServerConfig { enforce_turn_gating: true, ..ServerConfig::default() };
        let mut ctx = ClientContext::default();
        send(&svc, &config, &mut ctx, r#"{"type":"boot"}"#).await;
        send(&svc, &config, &mut ctx, r#"{"type":"set_current_player","playerId":"u00002"}"#).await;

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"reveal","id":"r0-c0","playerId":"u00003"}"#).await;
        assert_eq!(error_code(&reply), Some(ErrorCode::NotYourTurn));
        let reply = send(&svc, &config, &mut ctx, r#"{"type":"reveal","id":"r0-c0","playerId":"u00002"}"#).await;
        assert!(matches!(reply, ServerMessage::Revealed { .. }));
    }

    #[tokio::test]
    async fn test_assign_user_mints_and_remembers_client_id() {
        let svc = service();
        let config = ServerConfig::default();
        let mut ctx = ClientContext::default();
        send(&svc, &config, &mut ctx, r#"{"type":"boot"}"#).await;

        let first = send(&svc, &config, &mut ctx, r#"{"type":"assign_user"}"#).await;
        let ServerMessage::AssignedUser { user_id, client_id, .. } = first else {
            panic!("expected assigned user");
        };
        assert!(client_id.starts_with("cid-"));
        assert_eq!(ctx.client_id.as_deref(), Some(client_id.as_str()));

        let again = send(&svc, &config, &mut ctx, r#"{"type":"assign_user"}"#).await;
        let ServerMessage::AssignedUser { user_id: again_id, .. } = again else {
            panic!("expected assigned user");
        };
        assert_eq!(again_id, user_id);
    }

    #[tokio::test]
    async fn test_set_bot_delay_requires_both_bounds() {
        let svc = service();
        let config = ServerConfig::default();
        let mut ctx = ClientContext::default();

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"set_bot_delay","minMs":100}"#).await;
        assert_eq!(error_code(&reply), Some(ErrorCode::InvalidInput));

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"set_bot_delay","minMs":500.9,"maxMs":-3}"#).await;
        assert_eq!(reply, ServerMessage::BotDelay(BotDelayRange { min_ms: 500, max_ms: 500 }));
    }

    #[tokio::test]
    async fn test_user_queries() {
        let svc = service();
        let config = ServerConfig::default();
        let mut ctx = ClientContext::default();
        send(&svc, &config, &mut ctx, r#"{"type":"boot"}"#).await;

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"eligible_users","limit":3}"#).await;
        let ServerMessage::EligibleUsers(page) = reply else { panic!("expected page") };
        assert_eq!(page.total, 8);
        assert_eq!(page.users.len(), 3);

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"resolve_users","ids":["u00001","nobody"]}"#).await;
        let ServerMessage::ResolvedUsers { users } = reply else { panic!("expected users") };
        assert_eq!(users.len(), 1);

        let reply = send(&svc, &config, &mut ctx, r#"{"type":"pick_random_player"}"#).await;
        let ServerMessage::PlayerPicked { player_id } = reply else { panic!("expected pick") };
        let reply = send(&svc, &config, &mut ctx, r#"{"type":"get_current_player"}"#).await;
        assert_eq!(reply, ServerMessage::CurrentPlayer { current_player_id: Some(player_id) });
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GridServer::new(ServerConfig::default(), Arc::new(service()));
        assert_eq!(server.connection_count().await, 0);
        server.shutdown();
    }
}
