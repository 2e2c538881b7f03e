//! `NoxoServer` builder and server loop.
//!
//! The entry point for running a Noxo server. It ties the layers
//! together: transport → protocol → identity → rooms.

use std::sync::Arc;

use noxo_identity::IdentityProvider;
use noxo_protocol::{Codec, JsonCodec};
use noxo_room::{RoomConfig, RoomRegistry};
use noxo_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::NoxoError;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks; the
/// registry gets interior mutability via `Mutex`.
pub(crate) struct ServerState<I: IdentityProvider, C: Codec> {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) identity: I,
    pub(crate) codec: C,
    pub(crate) config: RoomConfig,
}

/// Builder for configuring and starting a Noxo server.
///
/// # Example
///
/// ```rust,ignore
/// let server = NoxoServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(AnonymousIdentity)
///     .await?;
/// server.run().await
/// ```
pub struct NoxoServerBuilder {
    bind_addr: String,
    config: RoomConfig,
}

impl NoxoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration (capacities, timeouts, field limits).
    pub fn config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds and binds the server with the given identity provider.
    ///
    /// Uses `JsonCodec` over WebSocket.
    pub async fn build<I: IdentityProvider>(
        self,
        identity: I,
    ) -> Result<NoxoServer<I, JsonCodec>, NoxoError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(self.config.clone())),
            identity,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(NoxoServer { transport, state })
    }
}

impl Default for NoxoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Noxo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct NoxoServer<I: IdentityProvider, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<I, C>>,
}

impl<I: IdentityProvider, C: Codec> NoxoServer<I, C> {
    /// Creates a new builder.
    pub fn builder() -> NoxoServerBuilder {
        NoxoServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server: the stale-room sweeper plus the accept loop.
    ///
    /// Each accepted connection gets its own handler task. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), NoxoError> {
        tracing::info!("noxo server running");

        // The sweep only ever touches rooms that are already empty —
        // normally redundant with the eager delete-on-empty, kept as a
        // backstop for the life of the process.
        let sweep_state = Arc::clone(&self.state);
        let interval = self.state.config.sweep_interval;
        let threshold = self.state.config.sweep_threshold;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = sweep_state
                    .registry
                    .lock()
                    .await
                    .sweep_stale(threshold)
                    .await;
                if removed > 0 {
                    tracing::info!(removed, "stale rooms swept");
                }
            }
        });

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
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
