//! The `Platform` trait: everything the lobby needs from the chat side.
//!
//! Crewhush doesn't talk to a chat gateway itself. An embedder implements
//! [`Platform`] on top of its gateway client, and the lobby calls it at the
//! right time: capability checks at start, per-player synchronization after
//! roster changes and during phase transitions, announcements after the
//! debounce window.

use std::future::Future;

use crewhush_protocol::{TextSinkId, VoiceSessionId};

use crate::{ChatMember, LobbySnapshot, Phase, Player, PlatformError};

/// Chat-platform collaborator shared by every lobby of a registry.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one instance is shared through an
/// `Arc` by every lobby and by the debounced announcement tasks.
///
/// # Example
///
/// ```rust
/// use crewhush_lobby::{ChatMember, LobbySnapshot, Phase, Platform, PlatformError, Player, VoiceState};
/// use crewhush_protocol::{TextSinkId, VoiceSessionId};
///
/// /// Logs what it would do instead of calling a gateway.
/// struct DryRun;
///
/// impl Platform for DryRun {
///     type Handle = u64;
///
///     async fn voice_members(&self, _: VoiceSessionId) -> Result<Vec<ChatMember>, PlatformError> {
///         Ok(Vec::new())
///     }
///     async fn can_control_voice(&self, _: VoiceSessionId) -> Result<bool, PlatformError> {
///         Ok(true)
///     }
///     async fn can_post(&self, _: TextSinkId) -> Result<bool, PlatformError> {
///         Ok(true)
///     }
///     async fn sync_player(&self, _: VoiceSessionId, player: &Player, phase: Phase) -> Result<(), PlatformError> {
///         let state = VoiceState::for_player(player, phase);
///         println!("{} -> {state:?}", player.label());
///         Ok(())
///     }
///     async fn release_player(&self, _: VoiceSessionId, _: &Player) -> Result<(), PlatformError> {
///         Ok(())
///     }
///     async fn leave_voice(&self, _: VoiceSessionId) -> Result<(), PlatformError> {
///         Ok(())
///     }
///     async fn post_announcement(&self, _: TextSinkId, snapshot: &LobbySnapshot) -> Result<u64, PlatformError> {
///         Ok(snapshot.players.len() as u64)
///     }
///     async fn delete_announcement(&self, _: TextSinkId, _: u64) -> Result<(), PlatformError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Platform: Send + Sync + 'static {
    /// Identifies a posted announcement so it can be deleted later.
    type Handle: Send + Sync + 'static;

    /// Members currently present in the voice session.
    fn voice_members(
        &self,
        session: VoiceSessionId,
    ) -> impl Future<Output = Result<Vec<ChatMember>, PlatformError>> + Send;

    /// Whether the bot may mute and deafen members of the voice session.
    fn can_control_voice(
        &self,
        session: VoiceSessionId,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send;

    /// Whether the bot may post and delete messages in the text sink.
    fn can_post(
        &self,
        sink: TextSinkId,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send;

    /// Applies the communication state `player` should have during `phase`.
    ///
    /// Only called for players with a member in voice. See
    /// [`VoiceState::for_player`](crate::VoiceState::for_player) for a
    /// ready-made derivation.
    fn sync_player(
        &self,
        session: VoiceSessionId,
        player: &Player,
        phase: Phase,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Restores a member's normal voice state when they leave the lobby.
    fn release_player(
        &self,
        session: VoiceSessionId,
        player: &Player,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Disconnects the bot from the voice session.
    fn leave_voice(
        &self,
        session: VoiceSessionId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Renders and posts a status announcement.
    fn post_announcement(
        &self,
        sink: TextSinkId,
        snapshot: &LobbySnapshot,
    ) -> impl Future<Output = Result<Self::Handle, PlatformError>> + Send;

    /// Deletes a previously posted announcement.
    fn delete_announcement(
        &self,
        sink: TextSinkId,
        handle: Self::Handle,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}
