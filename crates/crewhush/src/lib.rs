//! # Crewhush
//!
//! Keeps a voice session's speaking rights in step with a social-deduction
//! game round.
//!
//! An embedder implements [`Platform`](crewhush_lobby::Platform) for its
//! chat gateway, owns a [`LobbyRegistry`](crewhush_lobby::LobbyRegistry),
//! and runs a [`CaptureServer`] so capture agents can stream game events
//! into lobbies by connect code.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crewhush::prelude::*;
//!
//! // Implement Platform for your chat gateway, then:
//! // let registry = Arc::new(Mutex::new(LobbyRegistry::new(platform, LobbyConfig::default())));
//! // let server = CaptureServerBuilder::new()
//! //     .bind("0.0.0.0:8123")
//! //     .build(Arc::clone(&registry))
//! //     .await?;
//! // tokio::spawn(server.run());
//! ```

mod error;
mod handler;
mod server;

pub use error::CrewhushError;
pub use server::{CaptureServer, CaptureServerBuilder, SharedRegistry};

pub use crewhush_lobby;
pub use crewhush_protocol;
pub use crewhush_transport;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"crewhush=info"`).
///
/// Does nothing if a global subscriber is already set, so tests may call
/// it repeatedly.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use std::sync::Arc;

    pub use tokio::sync::Mutex;

    pub use crate::{CaptureServer, CaptureServerBuilder, CrewhushError, SharedRegistry};
    pub use crewhush_lobby::{
        ChatMember, DisconnectPolicy, GameRoom, LinkState, Lobby, LobbyConfig, LobbyError,
        LobbyRegistry, LobbySnapshot, Phase, Platform, PlatformError, Player, PlayerStatus,
        VoiceState,
    };
    pub use crewhush_protocol::{
        Color, ConnectCode, GameEvent, MemberId, TextSinkId, VoiceSessionId,
    };
}
