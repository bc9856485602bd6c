//! `CaptureServer` builder and accept loop.
//!
//! Capture agents dial in over WebSocket, present a lobby's connect code,
//! and then stream game events into that lobby.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crewhush_lobby::{LobbyRegistry, Platform};
use crewhush_protocol::{Codec, JsonCodec};
use crewhush_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::CrewhushError;
use crate::handler::handle_connection;

/// Registry shared between the embedder's command layer and the server.
pub type SharedRegistry<P> = Arc<Mutex<LobbyRegistry<P>>>;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<P: Platform, C: Codec> {
    pub(crate) registry: SharedRegistry<P>,
    pub(crate) codec: C,
    pub(crate) handshake_timeout: Duration,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a capture server.
///
/// # Example
///
/// ```rust,ignore
/// use crewhush::prelude::*;
///
/// let registry = Arc::new(Mutex::new(LobbyRegistry::new(platform, LobbyConfig::default())));
/// let server = CaptureServerBuilder::new()
///     .bind("0.0.0.0:8123")
///     .build(Arc::clone(&registry))
///     .await?;
/// server.run().await
/// ```
pub struct CaptureServerBuilder {
    bind_addr: String,
    handshake_timeout: Duration,
    idle_timeout: Duration,
}

impl CaptureServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8123".to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// How long a new link may take to send its `Hello`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// How long a bound link may stay silent before it is dropped.
    /// Agents send heartbeats to stay inside this window.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener. Uses `JsonCodec` on a `WebSocketTransport`.
    pub async fn build<P: Platform>(
        self,
        registry: SharedRegistry<P>,
    ) -> Result<CaptureServer<P, JsonCodec>, CrewhushError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            handshake_timeout: self.handshake_timeout,
            idle_timeout: self.idle_timeout,
        });

        Ok(CaptureServer { transport, state })
    }
}

impl Default for CaptureServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound capture server.
///
/// Call [`run()`](Self::run) to start accepting agents.
pub struct CaptureServer<P: Platform, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<P, C>>,
}

impl<P, C> CaptureServer<P, C>
where
    P: Platform,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, CrewhushError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop until the task is dropped.
    ///
    /// Each agent link is handled on its own task; a failing link never
    /// affects the others.
    pub async fn run(mut self) -> Result<(), CrewhushError> {
        tracing::info!("capture server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "agent link ended with error");
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
