//! Error types for the lobby layer.
//!
//! Display strings are full sentences: command-triggered failures are
//! shown to the operator as-is.

use crewhush_protocol::{MemberId, ProtocolError, VoiceSessionId};

use crate::Phase;

/// Errors raised by lobby and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A lobby already owns this voice session.
    #[error("a lobby is already running in voice session {0}")]
    AlreadyRunning(VoiceSessionId),

    /// No lobby owns this voice session.
    #[error("no lobby is running in voice session {0}")]
    NotFound(VoiceSessionId),

    /// The lobby was stopped while the caller still held a handle to it.
    #[error("the lobby for voice session {0} has been stopped")]
    Stopped(VoiceSessionId),

    /// The bot lacks the capability needed to run a lobby.
    #[error("missing permission: {0}")]
    MissingPermission(String),

    /// No player holds this game name.
    #[error("no player named {0:?} is in this lobby")]
    UnknownPlayer(String),

    /// This chat member has no player record.
    #[error("member {0} is not part of this lobby")]
    UnknownMember(MemberId),

    /// The member must be connected to the voice session before joining.
    #[error("member {0} must be connected to the voice session first")]
    NotConnected(MemberId),

    /// The member is already linked to a game name.
    #[error("member {member} is already playing as {name:?}")]
    AlreadyPlaying { member: MemberId, name: String },

    /// The member is only spectating.
    #[error("member {0} is not playing")]
    NotPlaying(MemberId),

    /// Another member already claimed this game name.
    #[error("the name {name:?} is already taken by {holder}")]
    NameTaken { name: String, holder: String },

    #[error("{0:?} is not a valid game name")]
    InvalidName(String),

    /// A kill or exile event arrived without its death flag.
    #[error("malformed {kind} event for {name:?}: the dead flag must be set")]
    MalformedEvent { kind: &'static str, name: String },

    /// No free connect code was found.
    #[error("no free connect code of length {len} after {attempts} attempts")]
    CodesExhausted { len: usize, attempts: usize },

    /// Another transition is still running.
    #[error("already transitioning to {0}")]
    TransitionInFlight(Phase),

    /// The lobby is already in the requested phase.
    #[error("the lobby is already in the {0} phase")]
    AlreadyInPhase(Phase),

    /// Synchronizing a player's voice state failed.
    #[error("could not update voice state for {player} ({failed} failed in total)")]
    Sync {
        player: String,
        failed: usize,
        #[source]
        source: PlatformError,
    },

    /// A chat-platform call failed outside synchronization.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A generated or supplied identifier was rejected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors reported by a [`Platform`](crate::Platform) implementation.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The platform refused the call for lack of a capability.
    #[error("missing capability: {0}")]
    MissingCapability(String),

    /// The member cannot be reached (left the guild, not in voice).
    #[error("member {0} is unavailable")]
    MemberUnavailable(MemberId),

    /// The announcement to edit or delete no longer exists.
    #[error("announcement not found")]
    AnnouncementGone,

    /// Any other request failure.
    #[error("platform request failed: {0}")]
    Request(String),
}
