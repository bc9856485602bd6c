//! The lobby: one voice session bound to one game round.
//!
//! A [`Lobby`] is a cheap-clone handle. The roster lives behind a Tokio
//! mutex that is released before any platform call, so a slow gateway
//! never blocks snapshots or the announcement job. Phase transitions are
//! serialized by a separate slot that records the in-flight target.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, Weak};

use crewhush_debounce::Debouncer;
use crewhush_protocol::{Color, ConnectCode, GameEvent, MemberId, TextSinkId, VoiceSessionId};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    ChatMember, DisconnectPolicy, GameIdentity, LinkState, LobbyConfig, LobbyError, Phase,
    Platform, PlatformError, Player, PlayerStatus,
};

/// Room metadata an operator attaches to a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRoom {
    pub code: String,
    pub region: String,
}

/// Serializable view of a lobby, handed to the announcement renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub voice_session: VoiceSessionId,
    pub connect_code: ConnectCode,
    pub phase: Phase,
    pub link_state: LinkState,
    pub room: Option<GameRoom>,
    pub players: Vec<Player>,
}

/// Handle to a running lobby.
///
/// Clones share the same lobby. Lobbies are created and stopped through
/// [`LobbyRegistry`](crate::LobbyRegistry); once stopped, every operation
/// on a leftover handle fails with [`LobbyError::Stopped`].
pub struct Lobby<P: Platform> {
    inner: Arc<Inner<P>>,
}

impl<P: Platform> Clone for Lobby<P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<P: Platform> std::fmt::Debug for Lobby<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lobby")
            .field("voice_session", &self.inner.voice_session)
            .field("connect_code", &self.inner.connect_code)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

struct Inner<P: Platform> {
    voice_session: VoiceSessionId,
    text_sink: TextSinkId,
    connect_code: ConnectCode,
    config: LobbyConfig,
    platform: Arc<P>,
    state: Mutex<LobbyState>,
    /// Target of the running transition, if any.
    transition: std::sync::Mutex<Option<Phase>>,
    announcer: Debouncer,
    /// Last posted announcement. Held for the whole post/delete sequence
    /// so two announcement jobs never interleave.
    last_announcement: Mutex<Option<P::Handle>>,
    closed: AtomicBool,
}

#[derive(Debug, Default)]
struct LobbyState {
    phase: Phase,
    link_state: LinkState,
    room: Option<GameRoom>,
    players: Vec<Player>,
    /// Capture agents currently attached.
    links: usize,
}

impl LobbyState {
    /// Returns whether the state changed.
    fn replace_link_state(&mut self, link_state: LinkState) -> bool {
        if self.link_state == link_state {
            return false;
        }
        self.link_state = link_state;
        true
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.game_name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    fn position_by_member(&self, id: MemberId) -> Option<usize> {
        self.players.iter().position(|p| p.member_id() == Some(id))
    }
}

/// Releases the transition slot when dropped, including when the
/// transition future itself is dropped mid-batch.
struct TransitionGuard<'a> {
    slot: &'a std::sync::Mutex<Option<Phase>>,
}

impl<'a> TransitionGuard<'a> {
    fn claim(slot: &'a std::sync::Mutex<Option<Phase>>, target: Phase) -> Result<Self, LobbyError> {
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *current {
            return Err(LobbyError::TransitionInFlight(running));
        }
        *current = Some(target);
        Ok(Self { slot })
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn valid_name(raw: &str) -> Result<&str, LobbyError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LobbyError::InvalidName(raw.to_string()));
    }
    Ok(name)
}

impl<P: Platform> Lobby<P> {
    pub(crate) fn new(
        voice_session: VoiceSessionId,
        text_sink: TextSinkId,
        connect_code: ConnectCode,
        room: Option<GameRoom>,
        config: LobbyConfig,
        platform: Arc<P>,
    ) -> Self {
        let announcer = Debouncer::new(config.announce_debounce);
        let state = LobbyState { room, ..LobbyState::default() };
        Self {
            inner: Arc::new(Inner {
                voice_session,
                text_sink,
                connect_code,
                config,
                platform,
                state: Mutex::new(state),
                transition: std::sync::Mutex::new(None),
                announcer,
                last_announcement: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn voice_session(&self) -> VoiceSessionId {
        self.inner.voice_session
    }

    pub fn text_sink(&self) -> TextSinkId {
        self.inner.text_sink
    }

    pub fn connect_code(&self) -> &ConnectCode {
        &self.inner.connect_code
    }

    /// The committed phase. A running transition is not reflected here.
    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.phase
    }

    /// Target of the transition currently running, if any.
    pub fn transition_target(&self) -> Option<Phase> {
        *self.inner.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn link_state(&self) -> LinkState {
        self.inner.state.lock().await.link_state
    }

    pub async fn players(&self) -> Vec<Player> {
        self.inner.state.lock().await.players.clone()
    }

    /// Looks up a player by game name, ignoring ASCII case.
    pub async fn player(&self, name: &str) -> Option<Player> {
        let state = self.inner.state.lock().await;
        state.position_by_name(name).map(|i| state.players[i].clone())
    }

    pub async fn snapshot(&self) -> LobbySnapshot {
        let state = self.inner.state.lock().await;
        LobbySnapshot {
            voice_session: self.inner.voice_session,
            connect_code: self.inner.connect_code.clone(),
            phase: state.phase,
            link_state: state.link_state,
            room: state.room.clone(),
            players: state.players.clone(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Records whether a capture agent is currently attached.
    pub async fn set_link_state(&self, link_state: LinkState) -> Result<(), LobbyError> {
        self.ensure_live()?;
        let changed = self.inner.state.lock().await.replace_link_state(link_state);
        if changed {
            self.link_changed(link_state);
        }
        Ok(())
    }

    /// Counts a capture agent attaching and marks the link connected.
    /// Returns how many agents are now attached.
    pub async fn link_attached(&self) -> Result<usize, LobbyError> {
        self.ensure_live()?;
        let (links, changed) = {
            let mut state = self.inner.state.lock().await;
            state.links += 1;
            (state.links, state.replace_link_state(LinkState::Connected))
        };
        if changed {
            self.link_changed(LinkState::Connected);
        }
        Ok(links)
    }

    /// Counts a capture agent detaching. The link is marked disconnected
    /// once no agent is left.
    pub async fn link_detached(&self) -> Result<usize, LobbyError> {
        self.ensure_live()?;
        let (links, changed) = {
            let mut state = self.inner.state.lock().await;
            state.links = state.links.saturating_sub(1);
            let changed = state.links == 0 && state.replace_link_state(LinkState::Disconnected);
            (state.links, changed)
        };
        if changed {
            self.link_changed(LinkState::Disconnected);
        }
        Ok(links)
    }

    pub async fn set_room(&self, room: Option<GameRoom>) -> Result<(), LobbyError> {
        self.ensure_live()?;
        self.inner.state.lock().await.room = room;
        self.post_status();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Game events
    // -----------------------------------------------------------------------

    /// Applies one capture-agent event.
    pub async fn apply_game_event(&self, event: GameEvent) -> Result<(), LobbyError> {
        match event {
            GameEvent::Join { name, color, dead } => self.game_join(&name, color, dead).await,
            GameEvent::Leave { name } => self.game_leave(&name).await,
            GameEvent::Kill { name, dead } => self.game_kill(&name, dead).await,
            GameEvent::Exile { name, dead } => self.game_exile(&name, dead).await,
            GameEvent::ForceSync { name, color, dead, disconnected } => {
                self.game_force_sync(&name, color, dead, disconnected).await
            }
        }
    }

    /// Authoritative snapshot of one avatar. Creates a game-only player
    /// the first time a name is seen.
    pub async fn game_join(&self, name: &str, color: Color, dead: bool) -> Result<(), LobbyError> {
        let status = if dead { PlayerStatus::Dead } else { PlayerStatus::Alive };
        let synced = self.upsert_game_player(name, Some(color), status).await;
        self.post_status();
        synced
    }

    /// The avatar left the game.
    ///
    /// A linked player stays on the roster so their member keeps the right
    /// voice state; outside Intermission they are treated as dead.
    pub async fn game_leave(&self, name: &str) -> Result<(), LobbyError> {
        self.ensure_live()?;
        let (kept, phase) = {
            let mut state = self.inner.state.lock().await;
            let idx = state
                .position_by_name(name)
                .ok_or_else(|| LobbyError::UnknownPlayer(name.to_string()))?;
            let phase = state.phase;
            let player = &mut state.players[idx];
            if player.member().is_some() {
                player.set_color(None);
                if phase != Phase::Intermission {
                    player.set_status(PlayerStatus::Dead);
                }
                debug!(%name, status = %player.status(), "linked player left the game");
                (Some(player.clone()), phase)
            } else {
                state.players.remove(idx);
                debug!(%name, "game-only player removed");
                (None, phase)
            }
        };

        let synced = match kept {
            Some(player) => self.sync(&player, self.sync_phase(phase)).await,
            None => Ok(()),
        };
        self.post_status();
        synced
    }

    /// Soft kill. Only announced right away during a meeting, where the
    /// death becomes public.
    pub async fn game_kill(&self, name: &str, dead: bool) -> Result<(), LobbyError> {
        self.ensure_live()?;
        if !dead {
            return Err(LobbyError::MalformedEvent { kind: "kill", name: name.to_string() });
        }
        let (player, phase) = self.set_status_by_name(name, PlayerStatus::Dying).await?;
        let phase = self.sync_phase(phase);
        let synced = self.sync(&player, phase).await;
        if phase == Phase::Meeting {
            self.post_status_now();
        }
        synced
    }

    /// Public death.
    pub async fn game_exile(&self, name: &str, dead: bool) -> Result<(), LobbyError> {
        self.ensure_live()?;
        if !dead {
            return Err(LobbyError::MalformedEvent { kind: "exile", name: name.to_string() });
        }
        let (player, phase) = self.set_status_by_name(name, PlayerStatus::Dead).await?;
        let synced = self.sync(&player, self.sync_phase(phase)).await;
        self.post_status();
        synced
    }

    /// Periodic resync. Disconnected avatars follow
    /// [`LobbyConfig::disconnect_policy`].
    pub async fn game_force_sync(
        &self,
        name: &str,
        color: Color,
        dead: bool,
        disconnected: bool,
    ) -> Result<(), LobbyError> {
        self.ensure_live()?;
        if disconnected {
            return match self.inner.config.disconnect_policy {
                DisconnectPolicy::Ignore => {
                    debug!(%name, "ignoring disconnected avatar");
                    Ok(())
                }
                DisconnectPolicy::Leave => self.game_leave(name).await,
            };
        }
        self.game_join(name, color, dead).await
    }

    // -----------------------------------------------------------------------
    // Chat membership
    // -----------------------------------------------------------------------

    /// Links a connected spectator to a game name.
    ///
    /// If an avatar-only player already holds the name, the member is
    /// attached to it and the spectator record is dropped.
    pub async fn member_join(&self, member: &ChatMember, game_name: &str) -> Result<(), LobbyError> {
        if member.bot {
            return Ok(());
        }
        self.ensure_live()?;
        let name = valid_name(game_name)?;

        let (player, phase) = {
            let mut state = self.inner.state.lock().await;
            let spectator = state
                .position_by_member(member.id)
                .ok_or(LobbyError::NotConnected(member.id))?;
            if let Some(current) = state.players[spectator].game_name() {
                return Err(LobbyError::AlreadyPlaying {
                    member: member.id,
                    name: current.to_string(),
                });
            }

            let player = match state.position_by_name(name) {
                Some(owner) => {
                    if let Some(holder) = state.players[owner].member() {
                        return Err(LobbyError::NameTaken {
                            name: name.to_string(),
                            holder: holder.display_name.clone(),
                        });
                    }
                    let in_voice = state.players[spectator].in_voice();
                    state.players[owner].link_member(member.clone(), in_voice);
                    let linked = state.players[owner].clone();
                    state.players.remove(spectator);
                    debug!(member = %member.id, %name, "member linked to existing avatar");
                    linked
                }
                None => {
                    let player = &mut state.players[spectator];
                    player.assign_game_name(name);
                    debug!(member = %member.id, %name, "member claimed game name");
                    player.clone()
                }
            };
            (player, state.phase)
        };

        let synced = self.sync(&player, self.sync_phase(phase)).await;
        self.post_status();
        synced
    }

    /// The member stops playing but stays in voice.
    ///
    /// Their record goes back to spectating and is re-synced. A member who
    /// already left voice has nothing left to sync, so their record is
    /// dropped instead. If the capture agent was tracking the avatar (a
    /// color is set), an avatar-only player with the same name, color and
    /// status takes over the game identity.
    pub async fn member_quit(&self, member: &ChatMember) -> Result<(), LobbyError> {
        self.ensure_live()?;
        let (spectator, game, status, phase) = {
            let mut state = self.inner.state.lock().await;
            let idx = state
                .position_by_member(member.id)
                .ok_or(LobbyError::UnknownMember(member.id))?;
            if state.players[idx].is_spectating() {
                return Err(LobbyError::NotPlaying(member.id));
            }
            let status = state.players[idx].status();
            let game = state.players[idx].leave_game();
            let spectator = if state.players[idx].in_voice() {
                Some(state.players[idx].clone())
            } else {
                state.players.remove(idx);
                None
            };
            (spectator, game, status, state.phase)
        };
        debug!(member = %member.id, in_voice = spectator.is_some(), "member quit the game");

        let synced = match &spectator {
            Some(player) => self.sync(player, self.sync_phase(phase)).await,
            None => Ok(()),
        };
        let readded = match game {
            Some(GameIdentity { name, color: Some(color) }) => {
                self.upsert_game_player(&name, Some(color), status).await
            }
            _ => Ok(()),
        };
        self.post_status();
        synced.and(readded)
    }

    /// A member joined the voice session, or came back to it.
    pub async fn member_connected(&self, member: &ChatMember) -> Result<(), LobbyError> {
        if member.bot {
            return Ok(());
        }
        self.ensure_live()?;
        let (player, phase) = {
            let mut state = self.inner.state.lock().await;
            let idx = match state.position_by_member(member.id) {
                Some(idx) => {
                    let player = &mut state.players[idx];
                    player.refresh_member(member);
                    player.set_in_voice(true);
                    debug!(member = %member.id, "member reconnected");
                    idx
                }
                None => {
                    state.players.push(Player::spectator(member.clone()));
                    debug!(member = %member.id, "member connected");
                    state.players.len() - 1
                }
            };
            (state.players[idx].clone(), state.phase)
        };

        let synced = self.sync(&player, self.sync_phase(phase)).await;
        self.post_status();
        synced
    }

    /// A member left the voice session.
    ///
    /// Spectators are dropped; participants keep their record so the game
    /// side stays consistent. `skip_mute` skips restoring a dropped
    /// spectator's voice state, for members the platform can no longer
    /// reach.
    pub async fn member_disconnected(&self, member: &ChatMember, skip_mute: bool) -> Result<(), LobbyError> {
        if member.bot {
            return Ok(());
        }
        self.ensure_live()?;
        let dropped = {
            let mut state = self.inner.state.lock().await;
            let idx = state
                .position_by_member(member.id)
                .ok_or(LobbyError::UnknownMember(member.id))?;
            if state.players[idx].is_spectating() {
                Some(state.players.remove(idx))
            } else {
                state.players[idx].set_in_voice(false);
                None
            }
        };
        debug!(member = %member.id, spectator = dropped.is_some(), "member disconnected");

        if let Some(spectator) = dropped {
            if !skip_mute {
                self.release(&spectator).await;
            }
        }
        self.post_status();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase transition
    // -----------------------------------------------------------------------

    /// Moves the lobby to `target`, synchronizing every reachable player.
    ///
    /// Players are synchronized in two ordered batches so nobody can
    /// overhear the other side while states change:
    ///
    /// - into **Working**: workers first, then everyone else;
    /// - into **Meeting**: everyone else first, then workers;
    /// - into **Intermission**: one batch.
    ///
    /// A batch runs concurrently and must settle before the next starts.
    /// If any call in a batch fails the transition stops there with
    /// [`LobbyError::Sync`] and the phase is not committed. Players already
    /// synchronized are not rolled back.
    pub async fn transition(&self, target: Phase) -> Result<(), LobbyError> {
        self.ensure_live()?;
        let guard = TransitionGuard::claim(&self.inner.transition, target)?;

        let (workers, others) = {
            let state = self.inner.state.lock().await;
            if !state.phase.can_transition_to(target) {
                return Err(LobbyError::AlreadyInPhase(target));
            }
            let (workers, others): (Vec<&Player>, Vec<&Player>) =
                state.players.iter().filter(|p| p.is_reachable()).partition(|p| p.is_worker());
            (member_ids(&workers), member_ids(&others))
        };
        debug!(
            voice_session = %self.inner.voice_session,
            phase = %target,
            workers = workers.len(),
            others = others.len(),
            "transition started"
        );

        let batches = match target {
            Phase::Working => vec![workers, others],
            Phase::Meeting => vec![others, workers],
            Phase::Intermission => vec![workers.into_iter().chain(others).collect()],
        };
        for batch in &batches {
            self.sync_members(batch, target).await?;
        }

        {
            let mut state = self.inner.state.lock().await;
            state.phase = target;
            for player in state.players.iter_mut() {
                match target {
                    Phase::Meeting if player.status() == PlayerStatus::Dying => {
                        player.set_status(PlayerStatus::Dead);
                    }
                    Phase::Intermission if !player.is_spectating() => {
                        player.set_status(PlayerStatus::Waiting);
                    }
                    _ => {}
                }
            }
        }
        drop(guard);
        info!(voice_session = %self.inner.voice_session, phase = %target, "phase committed");

        self.post_status();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Announcements
    // -----------------------------------------------------------------------

    /// Schedules an announcement after the debounce window, replacing any
    /// announcement still waiting.
    pub fn post_status(&self) {
        if self.is_stopped() {
            return;
        }
        let job = announce(Arc::downgrade(&self.inner));
        self.inner.announcer.schedule(job);
    }

    /// Announces right away, dropping any announcement still waiting.
    pub fn post_status_now(&self) {
        if self.is_stopped() {
            return;
        }
        let job = announce(Arc::downgrade(&self.inner));
        drop(self.inner.announcer.fire_now(job));
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Releases every member, removes the last announcement and leaves the
    /// voice session. Failures are logged; teardown always completes.
    pub(crate) async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.announcer.cancel();

        let players = std::mem::take(&mut self.inner.state.lock().await.players);
        let voice = self.inner.voice_session;
        let platform = &self.inner.platform;
        let results = join_all(
            players
                .iter()
                .filter(|p| p.is_reachable())
                .map(|p| async move { (p, platform.release_player(voice, p).await) }),
        )
        .await;
        for (player, result) in results {
            if let Err(e) = result {
                warn!(voice_session = %voice, player = %player.label(), error = %e, "failed to release player");
            }
        }

        if let Some(handle) = self.inner.last_announcement.lock().await.take() {
            if let Err(e) = platform.delete_announcement(self.inner.text_sink, handle).await {
                warn!(voice_session = %voice, error = %e, "failed to delete announcement");
            }
        }
        if let Err(e) = platform.leave_voice(voice).await {
            warn!(voice_session = %voice, error = %e, "failed to leave voice session");
        }
        info!(voice_session = %voice, code = %self.inner.connect_code, "lobby stopped");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn link_changed(&self, link_state: LinkState) {
        info!(voice_session = %self.inner.voice_session, %link_state, "capture link changed");
        self.post_status();
    }

    fn ensure_live(&self) -> Result<(), LobbyError> {
        if self.is_stopped() {
            return Err(LobbyError::Stopped(self.inner.voice_session));
        }
        Ok(())
    }

    /// Phase players should be synchronized for: the running transition's
    /// target if there is one, so a roster change mid-transition is not
    /// synchronized back to the phase being left.
    fn sync_phase(&self, committed: Phase) -> Phase {
        self.transition_target().unwrap_or(committed)
    }

    async fn set_status_by_name(&self, name: &str, status: PlayerStatus) -> Result<(Player, Phase), LobbyError> {
        let mut state = self.inner.state.lock().await;
        let idx = state
            .position_by_name(name)
            .ok_or_else(|| LobbyError::UnknownPlayer(name.to_string()))?;
        let player = &mut state.players[idx];
        player.set_status(status);
        debug!(%name, %status, "status changed");
        Ok((player.clone(), state.phase))
    }

    /// Find-or-create by game name, then apply color and exact status.
    async fn upsert_game_player(
        &self,
        name: &str,
        color: Option<Color>,
        status: PlayerStatus,
    ) -> Result<(), LobbyError> {
        self.ensure_live()?;
        let name = valid_name(name)?;
        let (player, phase) = {
            let mut state = self.inner.state.lock().await;
            let idx = match state.position_by_name(name) {
                Some(idx) => idx,
                None => {
                    state.players.push(Player::game_only(name));
                    debug!(%name, "avatar registered");
                    state.players.len() - 1
                }
            };
            let player = &mut state.players[idx];
            player.set_color(color);
            player.set_status(status);
            (player.clone(), state.phase)
        };
        self.sync(&player, self.sync_phase(phase)).await
    }

    async fn sync(&self, player: &Player, phase: Phase) -> Result<(), LobbyError> {
        if !player.is_reachable() {
            return Ok(());
        }
        self.inner
            .platform
            .sync_player(self.inner.voice_session, player, phase)
            .await
            .map_err(|source| LobbyError::Sync { player: player.label(), failed: 1, source })
    }

    /// Current reachable records for `ids`, in order.
    async fn reachable_players(&self, ids: &[MemberId]) -> Vec<Player> {
        let state = self.inner.state.lock().await;
        ids.iter()
            .filter_map(|id| state.position_by_member(*id).map(|idx| &state.players[idx]))
            .filter(|p| p.is_reachable())
            .cloned()
            .collect()
    }

    /// Syncs one transition batch from the live roster.
    ///
    /// Records are read when the batch starts. A roster change that lands
    /// while the batch is running may have its own sync overtaken by the
    /// batch's stale one, so every record that changed is synced again
    /// until the batch matches the roster.
    async fn sync_members(&self, ids: &[MemberId], phase: Phase) -> Result<(), LobbyError> {
        let mut batch = self.reachable_players(ids).await;
        while !batch.is_empty() {
            self.sync_batch(&batch, phase).await?;
            let synced_ids: Vec<MemberId> = batch.iter().filter_map(Player::member_id).collect();
            let current = self.reachable_players(&synced_ids).await;
            batch = current.into_iter().filter(|p| !batch.contains(p)).collect();
            if !batch.is_empty() {
                debug!(%phase, changed = batch.len(), "roster changed mid-batch, syncing again");
            }
        }
        Ok(())
    }

    async fn sync_batch(&self, batch: &[Player], phase: Phase) -> Result<(), LobbyError> {
        if batch.is_empty() {
            return Ok(());
        }
        let voice = self.inner.voice_session;
        let platform = &self.inner.platform;
        let results = join_all(batch.iter().map(|p| platform.sync_player(voice, p, phase))).await;

        let mut failures: Vec<(&Player, PlatformError)> = batch
            .iter()
            .zip(results)
            .filter_map(|(p, r)| r.err().map(|e| (p, e)))
            .collect();
        if failures.is_empty() {
            return Ok(());
        }
        let failed = failures.len();
        let (player, source) = failures.swap_remove(0);
        warn!(voice_session = %voice, %phase, failed, "batch synchronization failed");
        Err(LobbyError::Sync { player: player.label(), failed, source })
    }

    async fn release(&self, player: &Player) {
        if player.member().is_none() {
            return;
        }
        if let Err(e) = self.inner.platform.release_player(self.inner.voice_session, player).await {
            warn!(
                voice_session = %self.inner.voice_session,
                player = %player.label(),
                error = %e,
                "failed to release player"
            );
        }
    }
}

fn member_ids(players: &[&Player]) -> Vec<MemberId> {
    players.iter().filter_map(|p| p.member_id()).collect()
}

/// Posts a fresh snapshot, then deletes the one it replaces.
async fn announce<P: Platform>(inner: Weak<Inner<P>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let lobby = Lobby { inner };
    let mut last = lobby.inner.last_announcement.lock().await;
    if lobby.is_stopped() {
        return;
    }

    let snapshot = lobby.snapshot().await;
    let sink = lobby.inner.text_sink;
    let posted = match lobby.inner.platform.post_announcement(sink, &snapshot).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!(voice_session = %snapshot.voice_session, error = %e, "failed to post announcement");
            return;
        }
    };
    if let Some(previous) = last.replace(posted) {
        if let Err(e) = lobby.inner.platform.delete_announcement(sink, previous).await {
            warn!(voice_session = %snapshot.voice_session, error = %e, "failed to delete previous announcement");
        }
    }
}
