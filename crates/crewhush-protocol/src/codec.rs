//! Codec trait and implementations for agent link frames.
//!
//! The ingestion server never touches `serde_json` directly; it goes
//! through [`Codec`] so a different encoding can be swapped in without
//! touching the handler.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts wire values to and from frame bytes.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON [`Codec`], the format capture agents speak.
///
/// ```rust
/// use crewhush_protocol::{AgentMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg = AgentMessage::Heartbeat { client_time: 5000 };
/// let bytes = codec.encode(&msg).unwrap();
/// let decoded: AgentMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{AgentMessage, GameEvent};

    #[test]
    fn test_decode_unknown_kind_is_decode_error() {
        let raw = br#"{"type":"Event","event":{"kind":"Teleport","name":"Red"}}"#;
        let result: Result<AgentMessage, _> = JsonCodec.decode(raw);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_kill_without_dead_flag_fails() {
        let raw = br#"{"type":"Event","event":{"kind":"Kill","name":"Red"}}"#;
        assert!(JsonCodec.decode::<AgentMessage>(raw).is_err());
    }

    #[test]
    fn test_encode_event_is_valid_utf8() {
        let msg = AgentMessage::Event {
            event: GameEvent::Exile { name: "Ünïcode".into(), dead: true },
        };
        let bytes = JsonCodec.encode(&msg).unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
    }
}
