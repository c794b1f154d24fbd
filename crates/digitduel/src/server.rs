//! `DuelServer` builder and accept loop.
//!
//! This is the entry point for running a digitduel server. It ties the
//! layers together: transport → protocol → session engine.

use std::sync::Arc;
use std::time::Duration;

use digitduel_protocol::{Codec, JsonCodec};
use digitduel_session::{SessionConfig, SessionManager};
use digitduel_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::DuelError;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The session
/// manager sits behind a `Mutex`; per-session work happens on the session
/// actors, outside the lock.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a digitduel server.
///
/// # Example
///
/// ```rust,no_run
/// use digitduel::prelude::*;
///
/// # async fn start() -> Result<(), DuelError> {
/// let server = DuelServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DuelServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    idle_timeout: Option<Duration>,
}

impl DuelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            session_config: SessionConfig::default(),
            idle_timeout: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session engine configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Closes connections that send nothing for `timeout`. Their sessions
    /// are torn down as on any disconnect.
    ///
    /// Off by default: a player may sit in the lobby indefinitely.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<DuelServer<JsonCodec>, DuelError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(DuelServer { transport, state })
    }
}

impl Default for DuelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound digitduel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuelServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl DuelServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> DuelServerBuilder {
        DuelServerBuilder::new()
    }
}

impl<C: Codec> DuelServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated; a failed accept is logged and skipped.
    pub async fn run(mut self) -> Result<(), DuelError> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "digitduel server running"),
            Err(_) => tracing::info!("digitduel server running"),
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
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
