//! Lobby registry: starts, tracks, and stops lobbies.

use std::collections::HashMap;
use std::sync::Arc;

use crewhush_protocol::{ConnectCode, TextSinkId, VoiceSessionId};
use rand::Rng;
use tracing::{info, warn};

use crate::{GameRoom, Lobby, LobbyConfig, LobbyError, Platform};

/// Letters used in connect codes. `I` and `O` are left out so codes read
/// unambiguously next to digits in a chat font.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Draws before giving up on finding a free connect code.
const MAX_CODE_ATTEMPTS: usize = 64;

/// Owns every running lobby of a process.
///
/// A lobby is reachable by its voice session (one lobby per session) and
/// by its connect code (what capture agents present). Both indexes are
/// kept in step by [`start`](Self::start) and [`stop`](Self::stop).
///
/// Shared by the ingestion server as `Arc<tokio::sync::Mutex<LobbyRegistry<P>>>`.
pub struct LobbyRegistry<P: Platform> {
    platform: Arc<P>,
    config: LobbyConfig,

    /// Running lobbies, keyed by voice session.
    by_voice: HashMap<VoiceSessionId, Lobby<P>>,

    /// Connect code to voice session.
    by_code: HashMap<ConnectCode, VoiceSessionId>,
}

impl<P: Platform> LobbyRegistry<P> {
    pub fn new(platform: Arc<P>, config: LobbyConfig) -> Self {
        Self {
            platform,
            config,
            by_voice: HashMap::new(),
            by_code: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Starts a lobby in `voice`, announcing to `sink`.
    ///
    /// The roster is seeded with the members already in the voice session.
    /// Fails if a lobby already runs there, or if the platform won't let
    /// the bot control voice or post announcements.
    pub async fn start(
        &mut self,
        voice: VoiceSessionId,
        sink: TextSinkId,
        room: Option<GameRoom>,
    ) -> Result<Lobby<P>, LobbyError> {
        if self.by_voice.contains_key(&voice) {
            return Err(LobbyError::AlreadyRunning(voice));
        }
        if !self.platform.can_control_voice(voice).await? {
            return Err(LobbyError::MissingPermission(format!(
                "cannot mute or deafen members in voice session {voice}"
            )));
        }
        if !self.platform.can_post(sink).await? {
            return Err(LobbyError::MissingPermission(format!(
                "cannot post announcements to {sink}"
            )));
        }

        let code = self.unique_code()?;
        let lobby = Lobby::new(
            voice,
            sink,
            code.clone(),
            room,
            self.config.clone(),
            Arc::clone(&self.platform),
        );
        self.by_voice.insert(voice, lobby.clone());
        self.by_code.insert(code.clone(), voice);

        match self.platform.voice_members(voice).await {
            Ok(members) => {
                for member in members {
                    if let Err(e) = lobby.member_connected(&member).await {
                        warn!(voice_session = %voice, member = %member.id, error = %e, "failed to seed member");
                    }
                }
            }
            Err(e) => warn!(voice_session = %voice, error = %e, "failed to list voice members"),
        }

        lobby.post_status();
        info!(voice_session = %voice, %code, "lobby started");
        Ok(lobby)
    }

    pub fn find_by_voice_session(&self, voice: VoiceSessionId) -> Option<Lobby<P>> {
        self.by_voice.get(&voice).cloned()
    }

    pub fn find_by_connect_code(&self, code: &ConnectCode) -> Option<Lobby<P>> {
        self.by_code
            .get(code)
            .and_then(|voice| self.by_voice.get(voice))
            .cloned()
    }

    /// Stops the lobby in `voice`: unregisters it, restores every member's
    /// voice state, and leaves the session.
    pub async fn stop(&mut self, voice: VoiceSessionId) -> Result<(), LobbyError> {
        let lobby = self
            .by_voice
            .remove(&voice)
            .ok_or(LobbyError::NotFound(voice))?;
        self.by_code.remove(lobby.connect_code());
        lobby.shutdown().await;
        Ok(())
    }

    /// Stops every lobby. Used at process teardown.
    pub async fn shutdown_all(&mut self) {
        let lobbies: Vec<_> = self.by_voice.drain().map(|(_, lobby)| lobby).collect();
        self.by_code.clear();
        for lobby in lobbies {
            lobby.shutdown().await;
        }
    }

    pub fn len(&self) -> usize {
        self.by_voice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_voice.is_empty()
    }

    /// Connect codes of every running lobby.
    pub fn connect_codes(&self) -> Vec<ConnectCode> {
        self.by_code.keys().cloned().collect()
    }

    fn unique_code(&self) -> Result<ConnectCode, LobbyError> {
        draw_unique_code(self.config.connect_code_len, self.by_code.len(), |code| {
            self.by_code.contains_key(code)
        })
    }
}

/// Draws codes until one is not in use. Fails right away when all
/// `CODE_ALPHABET.len() ^ len` codes are taken, and after
/// `MAX_CODE_ATTEMPTS` draws otherwise.
fn draw_unique_code(
    len: usize,
    taken: usize,
    in_use: impl Fn(&ConnectCode) -> bool,
) -> Result<ConnectCode, LobbyError> {
    let space = u32::try_from(len)
        .ok()
        .and_then(|len| CODE_ALPHABET.len().checked_pow(len));
    if space.is_some_and(|space| taken >= space) {
        return Err(LobbyError::CodesExhausted { len, attempts: 0 });
    }
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_code(len)?;
        if !in_use(&code) {
            return Ok(code);
        }
    }
    warn!(len, attempts = MAX_CODE_ATTEMPTS, "connect code space is crowded");
    Err(LobbyError::CodesExhausted { len, attempts: MAX_CODE_ATTEMPTS })
}

fn generate_code(len: usize) -> Result<ConnectCode, LobbyError> {
    let mut rng = rand::rng();
    let raw: String = (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    Ok(ConnectCode::parse(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_uses_alphabet() {
        for _ in 0..100 {
            let code = generate_code(6).unwrap();
            assert_eq!(code.as_str().len(), 6);
            assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_draw_unique_code_full_space_fails_without_drawing() {
        let err = draw_unique_code(1, CODE_ALPHABET.len(), |_| panic!("no draw expected")).unwrap_err();
        assert!(matches!(err, LobbyError::CodesExhausted { len: 1, attempts: 0 }));
    }

    #[test]
    fn test_draw_unique_code_gives_up_after_max_attempts() {
        let draws = std::cell::Cell::new(0);
        let err = draw_unique_code(2, 0, |_| {
            draws.set(draws.get() + 1);
            true
        })
        .unwrap_err();

        assert!(matches!(err, LobbyError::CodesExhausted { len: 2, attempts: MAX_CODE_ATTEMPTS }));
        assert_eq!(draws.get(), MAX_CODE_ATTEMPTS);
    }

    #[test]
    fn test_draw_unique_code_skips_codes_in_use() {
        // A through M are taken; half the space stays free.
        for _ in 0..20 {
            let code = draw_unique_code(1, 12, |code| code.as_str() < "N").unwrap();
            assert!(code.as_str() >= "N");
        }
    }

    #[test]
    fn test_generate_code_rejects_bad_length() {
        assert!(matches!(generate_code(0), Err(LobbyError::Protocol(_))));
        assert!(generate_code(ConnectCode::MAX_LEN + 1).is_err());
    }
}
