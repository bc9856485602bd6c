//! Recording `Platform` shared by the lobby integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crewhush_lobby::{ChatMember, LobbySnapshot, Phase, Platform, PlatformError, Player, VoiceState};
use crewhush_protocol::{MemberId, TextSinkId, VoiceSessionId};

pub const VOICE: VoiceSessionId = VoiceSessionId(10);
pub const SINK: TextSinkId = TextSinkId(20);

/// Something the lobby asked the platform to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SyncStart { member: MemberId, phase: Phase },
    SyncEnd { member: MemberId, phase: Phase, state: VoiceState },
    Release(MemberId),
    LeaveVoice(VoiceSessionId),
    Post { handle: u64, players: usize },
    Delete(u64),
}

#[derive(Default)]
pub struct MockPlatform {
    members: Mutex<Vec<ChatMember>>,
    failing: Mutex<HashSet<MemberId>>,
    sync_delay: Mutex<Duration>,
    calls: Mutex<Vec<Call>>,
    next_handle: AtomicU64,
    pub deny_voice: AtomicBool,
    pub deny_post: AtomicBool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members reported as already in voice when a lobby starts.
    pub fn with_members(members: Vec<ChatMember>) -> Self {
        let platform = Self::default();
        *platform.members.lock().unwrap() = members;
        platform
    }

    /// Makes every `sync_player` call take `delay`.
    pub fn set_sync_delay(&self, delay: Duration) {
        *self.sync_delay.lock().unwrap() = delay;
    }

    pub fn fail_sync_for(&self, member: MemberId) {
        self.failing.lock().unwrap().insert(member);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Handles of posted announcements, oldest first.
    pub fn posts(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Post { handle, .. } => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    /// Members whose voice state was applied, in completion order.
    pub fn synced(&self) -> Vec<(MemberId, VoiceState)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SyncEnd { member, state, .. } => Some((member, state)),
                _ => None,
            })
            .collect()
    }

    pub fn released(&self) -> Vec<MemberId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Release(member) => Some(member),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Platform for MockPlatform {
    type Handle = u64;

    async fn voice_members(&self, _session: VoiceSessionId) -> Result<Vec<ChatMember>, PlatformError> {
        Ok(self.members.lock().unwrap().clone())
    }

    async fn can_control_voice(&self, _session: VoiceSessionId) -> Result<bool, PlatformError> {
        Ok(!self.deny_voice.load(Ordering::SeqCst))
    }

    async fn can_post(&self, _sink: TextSinkId) -> Result<bool, PlatformError> {
        Ok(!self.deny_post.load(Ordering::SeqCst))
    }

    async fn sync_player(&self, _session: VoiceSessionId, player: &Player, phase: Phase) -> Result<(), PlatformError> {
        let member = player
            .member_id()
            .ok_or_else(|| PlatformError::Request("sync without member".into()))?;
        self.record(Call::SyncStart { member, phase });

        let delay = *self.sync_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&member) {
            return Err(PlatformError::MemberUnavailable(member));
        }
        let state = VoiceState::for_player(player, phase);
        self.record(Call::SyncEnd { member, phase, state });
        Ok(())
    }

    async fn release_player(&self, _session: VoiceSessionId, player: &Player) -> Result<(), PlatformError> {
        if let Some(member) = player.member_id() {
            self.record(Call::Release(member));
        }
        Ok(())
    }

    async fn leave_voice(&self, session: VoiceSessionId) -> Result<(), PlatformError> {
        self.record(Call::LeaveVoice(session));
        Ok(())
    }

    async fn post_announcement(&self, _sink: TextSinkId, snapshot: &LobbySnapshot) -> Result<u64, PlatformError> {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Call::Post { handle, players: snapshot.players.len() });
        Ok(handle)
    }

    async fn delete_announcement(&self, _sink: TextSinkId, handle: u64) -> Result<(), PlatformError> {
        self.record(Call::Delete(handle));
        Ok(())
    }
}

pub fn member(id: u64, name: &str) -> ChatMember {
    ChatMember::new(MemberId(id), name)
}
