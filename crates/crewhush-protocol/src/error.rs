//! Error types for the protocol layer.

/// Errors raised while encoding, decoding, or validating wire values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, unknown
    /// `type`/`kind` tags.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid connect code {0:?}")]
    InvalidConnectCode(String),

    #[error("unknown color {0:?}")]
    UnknownColor(String),
}
