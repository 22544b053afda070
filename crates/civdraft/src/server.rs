//! `CivdraftServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room → session.

use std::sync::Arc;

use civdraft_draft::{CardCatalog, Clock, SystemClock};
use civdraft_protocol::JsonCodec;
use civdraft_room::{BroadcastHub, DraftProtocol, RoomConfig, RoomManager};
use civdraft_session::{FileStore, SessionStore};
use civdraft_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{CivdraftError, Pipeline, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomManager<Pipeline>>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a civdraft server.
///
/// Anything not supplied explicitly comes from the [`ServerConfig`]: the
/// catalog is loaded from `config.catalog`, the store is a [`FileStore`]
/// under `config.data_dir`.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), civdraft::CivdraftError> {
/// use civdraft::{CivdraftServer, ServerConfig};
///
/// let mut server = CivdraftServer::builder()
///     .config(ServerConfig::default().with_bind("0.0.0.0:8080"))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CivdraftServerBuilder {
    config: ServerConfig,
    catalog: Option<CardCatalog>,
    store: Option<Arc<dyn SessionStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CivdraftServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: None,
            store: None,
            clock: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Uses `catalog` instead of loading one from disk.
    pub fn catalog(mut self, catalog: CardCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Uses `store` instead of a file store.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Loads what wasn't supplied and binds the listener.
    pub async fn build(self) -> Result<CivdraftServer, CivdraftError> {
        let config = self.config;
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => CardCatalog::load(&config.catalog)?,
        };
        let store: Arc<dyn SessionStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FileStore::open(&config.data_dir)?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let protocol = DraftProtocol::new(store, Arc::new(catalog), clock);
        let pipeline = Pipeline::new(&config.data_dir, config.build_command.clone());
        tracing::info!(pipeline = ?pipeline, "artifact pipeline configured");
        let room_config = RoomConfig {
            mailbox: config.mailbox,
            sweep_interval: config.sweep_interval,
            idle_timeout: config.room_idle,
            ..RoomConfig::default()
        };
        let rooms = RoomManager::new(
            protocol,
            Arc::new(BroadcastHub::new()),
            Arc::new(pipeline),
            room_config,
        );

        let transport = WebSocketTransport::bind(&config.bind).await?;
        let state = Arc::new(ServerState {
            rooms: Mutex::new(rooms),
            codec: JsonCodec,
        });
        Ok(CivdraftServer { transport, state })
    }
}

impl Default for CivdraftServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound civdraft server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CivdraftServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl CivdraftServer {
    pub fn builder() -> CivdraftServerBuilder {
        CivdraftServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the future is dropped.
    pub async fn run(&mut self) -> Result<(), CivdraftError> {
        tracing::info!(addr = ?self.local_addr().ok(), "civdraft server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }

    /// Stops every room actor.
    pub async fn shutdown(&self) {
        self.state.rooms.lock().await.shutdown_all().await;
    }
}
