//! Unified error type for Crewhush.

use crewhush_lobby::LobbyError;
use crewhush_protocol::ProtocolError;
use crewhush_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CrewhushError {
    /// Connection-level failure (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed or unexpected capture-agent message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby or registry operation failed.
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewhush_protocol::VoiceSessionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ReceiveFailed(std::io::Error::other("gone"));
        let crewhush_err: CrewhushError = err.into();
        assert!(matches!(crewhush_err, CrewhushError::Transport(_)));
        assert!(crewhush_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let crewhush_err: CrewhushError = err.into();
        assert!(matches!(crewhush_err, CrewhushError::Protocol(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err = LobbyError::NotFound(VoiceSessionId(1));
        let crewhush_err: CrewhushError = err.into();
        assert!(matches!(crewhush_err, CrewhushError::Lobby(_)));
        assert_eq!(crewhush_err.to_string(), "no lobby is running in voice session V-1");
    }
}
