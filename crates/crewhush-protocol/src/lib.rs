//! Wire protocol for Crewhush.
//!
//! - **Identities**: chat-platform ids ([`MemberId`], [`VoiceSessionId`],
//!   [`TextSinkId`]), the lobby [`ConnectCode`], and avatar [`Color`]s.
//! - **Agent messages**: [`AgentMessage`] / [`ServerMessage`] exchanged
//!   with capture agents, carrying [`GameEvent`]s.
//! - **Codec**: [`Codec`] trait and [`JsonCodec`].
//!
//! ```text
//! Transport (frames) → Protocol (AgentMessage) → Lobby (roster)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AgentMessage, Color, ConnectCode, GameEvent, MemberId, PROTOCOL_VERSION, ServerMessage,
    TextSinkId, VoiceSessionId,
};
