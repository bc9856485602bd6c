//! Identity types and the capture-agent wire format.
//!
//! Two identity spaces meet in Crewhush. Chat-platform identities
//! ([`MemberId`], [`VoiceSessionId`], [`TextSinkId`]) are stable numeric
//! ids handed to us by the chat gateway. Game identities are the in-round
//! avatar name plus a [`Color`], reported by the capture agent through
//! [`GameEvent`]s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Version of the agent protocol. Agents must send it in [`AgentMessage::Hello`].
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Chat-platform identities
// ---------------------------------------------------------------------------

/// A chat-platform member (user) id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// A voice session (voice channel) id. Primary key of a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceSessionId(pub u64);

impl fmt::Display for VoiceSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V-{}", self.0)
    }
}

/// A text sink (text channel) id where status announcements are posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextSinkId(pub u64);

impl fmt::Display for TextSinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ConnectCode
// ---------------------------------------------------------------------------

/// Short public token a capture agent uses to address one lobby.
///
/// Codes are upper-case ASCII letters. Parsing normalizes case so that
/// operators can type them casually.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConnectCode(String);

impl ConnectCode {
    /// Longest code accepted on the wire.
    pub const MAX_LEN: usize = 16;

    /// Parses and normalizes a code.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() || code.len() > Self::MAX_LEN {
            return Err(ProtocolError::InvalidConnectCode(raw.to_string()));
        }
        if !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ProtocolError::InvalidConnectCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ConnectCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConnectCode> for String {
    fn from(code: ConnectCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Avatar color tag reported by the capture agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Blue,
    Green,
    Pink,
    Orange,
    Yellow,
    Black,
    White,
    Purple,
    Brown,
    Cyan,
    Lime,
}

impl Color {
    pub const ALL: [Color; 12] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Pink,
        Color::Orange,
        Color::Yellow,
        Color::Black,
        Color::White,
        Color::Purple,
        Color::Brown,
        Color::Cyan,
        Color::Lime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Pink => "Pink",
            Self::Orange => "Orange",
            Self::Yellow => "Yellow",
            Self::Black => "Black",
            Self::White => "White",
            Self::Purple => "Purple",
            Self::Brown => "Brown",
            Self::Cyan => "Cyan",
            Self::Lime => "Lime",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProtocolError::UnknownColor(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// A roster change reported by a capture agent.
///
/// Each variant carries only the fields its event needs. `Kill` and
/// `Exile` keep the agent's `dead` flag because the agent is allowed to
/// send it; a `false` flag is rejected when the event is applied.
///
/// JSON shape: `{ "kind": "Kill", "name": "Red", "dead": true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GameEvent {
    /// Authoritative snapshot of one avatar.
    Join { name: String, color: Color, dead: bool },
    /// The avatar disappeared from the game.
    Leave { name: String },
    /// Soft kill: known to the agent, not yet public.
    Kill { name: String, dead: bool },
    /// Public, confirmed death.
    Exile { name: String, dead: bool },
    /// Periodic resync of one avatar.
    ForceSync {
        name: String,
        color: Color,
        dead: bool,
        #[serde(default)]
        disconnected: bool,
    },
}

impl GameEvent {
    /// The avatar name this event refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::Join { name, .. }
            | Self::Leave { name }
            | Self::Kill { name, .. }
            | Self::Exile { name, .. }
            | Self::ForceSync { name, .. } => name,
        }
    }

    /// Short event label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Kill { .. } => "kill",
            Self::Exile { .. } => "exile",
            Self::ForceSync { .. } => "force_sync",
        }
    }
}

// ---------------------------------------------------------------------------
// Agent link messages
// ---------------------------------------------------------------------------

/// Messages a capture agent sends to the ingestion server.
///
/// JSON shape: `{ "type": "Hello", "version": 1, "connect_code": "QWERTY" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentMessage {
    /// First frame on every link: binds the connection to one lobby.
    Hello { version: u32, connect_code: ConnectCode },
    /// A game roster change.
    Event { event: GameEvent },
    /// Keep-alive.
    Heartbeat { client_time: u64 },
}

/// Messages the ingestion server sends back to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Handshake accepted; the link is now bound to `voice_session`.
    HelloAck { voice_session: VoiceSessionId },
    HeartbeatAck { client_time: u64 },
    /// HTTP-style status code plus a readable message.
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&MemberId(42)).unwrap(), "42");
        assert_eq!(MemberId(42).to_string(), "M-42");
    }

    #[test]
    fn test_voice_session_id_display() {
        assert_eq!(VoiceSessionId(3).to_string(), "V-3");
        assert_eq!(TextSinkId(4).to_string(), "T-4");
    }

    #[test]
    fn test_connect_code_parse_normalizes_case() {
        let code = ConnectCode::parse(" qwErty ").unwrap();
        assert_eq!(code.as_str(), "QWERTY");
    }

    #[test]
    fn test_connect_code_parse_rejects_digits_and_empty() {
        assert!(ConnectCode::parse("").is_err());
        assert!(ConnectCode::parse("AB12").is_err());
        assert!(ConnectCode::parse(&"A".repeat(17)).is_err());
    }

    #[test]
    fn test_connect_code_deserialize_validates() {
        let ok: ConnectCode = serde_json::from_str("\"abcd\"").unwrap();
        assert_eq!(ok.to_string(), "ABCD");
        assert!(serde_json::from_str::<ConnectCode>("\"a b\"").is_err());
    }

    #[test]
    fn test_color_from_str_is_case_insensitive() {
        assert_eq!("red".parse::<Color>().unwrap(), Color::Red);
        assert_eq!("LIME".parse::<Color>().unwrap(), Color::Lime);
        assert!("mauve".parse::<Color>().is_err());
    }

    #[test]
    fn test_game_event_json_shape() {
        let event = GameEvent::Kill { name: "Red".into(), dead: true };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "Kill");
        assert_eq!(json["name"], "Red");
        assert_eq!(json["dead"], true);
    }

    #[test]
    fn test_force_sync_disconnected_defaults_to_false() {
        let event: GameEvent = serde_json::from_str(
            r#"{"kind":"ForceSync","name":"Blue","color":"Blue","dead":false}"#,
        )
        .unwrap();
        assert!(matches!(event, GameEvent::ForceSync { disconnected: false, .. }));
        assert_eq!(event.name(), "Blue");
        assert_eq!(event.kind(), "force_sync");
    }

    #[test]
    fn test_agent_message_event_nests_game_event() {
        let raw = r#"{"type":"Event","event":{"kind":"Leave","name":"Green"}}"#;
        let msg: AgentMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            AgentMessage::Event { event: GameEvent::Leave { name: "Green".into() } }
        );
    }

    #[test]
    fn test_hello_rejects_malformed_code() {
        let raw = r#"{"type":"Hello","version":1,"connect_code":"12"}"#;
        assert!(serde_json::from_str::<AgentMessage>(raw).is_err());
    }

    #[test]
    fn test_server_error_message_shape() {
        let msg = ServerMessage::Error { code: 404, message: "unknown code".into() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 404);
    }
}
