//! `TypeclaimServer` builder and server loop.
//!
//! This is the entry point for running a typeclaim server. It ties
//! together all the layers: transport → protocol → rooms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use typeclaim_protocol::{Codec, JsonCodec};
use typeclaim_room::{MatchmakingConfig, MatchmakingQueue, RoomConfig, RoomRegistry};
use typeclaim_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ServerConfig, TypeclaimError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) matchmaking: Mutex<MatchmakingQueue>,
    pub(crate) codec: C,
    pub(crate) ping_interval: Duration,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a typeclaim server.
///
/// # Example
///
/// ```rust,no_run
/// use typeclaim::prelude::*;
///
/// # async fn start() -> Result<(), TypeclaimError> {
/// let server = TypeclaimServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TypeclaimServerBuilder {
    config: ServerConfig,
}

impl TypeclaimServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn matchmaking_config(mut self, config: MatchmakingConfig) -> Self {
        self.config.matchmaking = config;
        self
    }

    /// How often connections are pinged.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    /// Drops connections that send no frame, pongs included, for this
    /// long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Binds the listener. Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<TypeclaimServer<JsonCodec>, TypeclaimError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let mut ping_interval = self.config.ping_interval;
        if ping_interval.is_zero() {
            tracing::warn!("ping interval of zero is not allowed, using default");
            ping_interval = ServerConfig::default().ping_interval;
        }

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(self.config.room)),
            matchmaking: Mutex::new(MatchmakingQueue::new(self.config.matchmaking)),
            codec: JsonCodec,
            ping_interval,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(TypeclaimServer { transport, state })
    }
}

impl Default for TypeclaimServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound typeclaim server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TypeclaimServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl TypeclaimServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> TypeclaimServerBuilder {
        TypeclaimServerBuilder::new()
    }
}

impl<C: Codec> TypeclaimServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), TypeclaimError> {
        tracing::info!(addr = ?self.local_addr().ok(), "typeclaim server running");

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
}
