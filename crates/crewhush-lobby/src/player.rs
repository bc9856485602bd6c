//! Roster entries.
//!
//! A [`Player`] joins the two identity spaces: the chat member who sits in
//! the voice session and the avatar the capture agent sees in the game.
//! Either facet may be missing (a spectator has no avatar, an unlinked
//! avatar has no member), but never both.

use crewhush_protocol::{Color, MemberId};
use serde::{Deserialize, Serialize};

use crate::Phase;

/// Chat-platform side of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub id: MemberId,
    pub display_name: String,
    /// Bots and other automated members never take part in a round.
    #[serde(default)]
    pub bot: bool,
}

impl ChatMember {
    pub fn new(id: MemberId, display_name: impl Into<String>) -> Self {
        Self { id, display_name: display_name.into(), bot: false }
    }

    pub fn bot(id: MemberId, display_name: impl Into<String>) -> Self {
        Self { id, display_name: display_name.into(), bot: true }
    }
}

/// Game side of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameIdentity {
    pub name: String,
    /// `None` until the capture agent reports the avatar.
    pub color: Option<Color>,
}

/// Life and role of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// In the voice session, not in the game.
    Spectating,
    /// Has a game name, but the round is not tracking them yet.
    Waiting,
    Alive,
    /// Killed, but other players don't know yet.
    Dying,
    /// Death is public (exiled, or revealed at a meeting).
    Dead,
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Spectating => "Spectating",
            Self::Waiting => "Waiting",
            Self::Alive => "Alive",
            Self::Dying => "Dying",
            Self::Dead => "Dead",
        };
        f.write_str(label)
    }
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    member: Option<ChatMember>,
    /// Whether `member` is currently in the voice session.
    in_voice: bool,
    game: Option<GameIdentity>,
    status: PlayerStatus,
}

impl Player {
    /// A member who just connected to the voice session.
    pub fn spectator(member: ChatMember) -> Self {
        Self {
            member: Some(member),
            in_voice: true,
            game: None,
            status: PlayerStatus::Spectating,
        }
    }

    /// An avatar the capture agent reported with no linked member.
    pub fn game_only(name: impl Into<String>) -> Self {
        Self {
            member: None,
            in_voice: false,
            game: Some(GameIdentity { name: name.into(), color: None }),
            status: PlayerStatus::Waiting,
        }
    }

    // -- accessors ---------------------------------------------------------

    pub fn member(&self) -> Option<&ChatMember> {
        self.member.as_ref()
    }

    pub fn member_id(&self) -> Option<MemberId> {
        self.member.as_ref().map(|m| m.id)
    }

    pub fn game(&self) -> Option<&GameIdentity> {
        self.game.as_ref()
    }

    pub fn game_name(&self) -> Option<&str> {
        self.game.as_ref().map(|g| g.name.as_str())
    }

    pub fn color(&self) -> Option<Color> {
        self.game.as_ref().and_then(|g| g.color)
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn in_voice(&self) -> bool {
        self.in_voice
    }

    /// Name for logs and error messages: the game name when known.
    pub fn label(&self) -> String {
        match (&self.game, &self.member) {
            (Some(game), _) => game.name.clone(),
            (None, Some(member)) => member.display_name.clone(),
            (None, None) => String::from("<unnamed>"),
        }
    }

    // -- predicates --------------------------------------------------------

    pub fn is_spectating(&self) -> bool {
        self.game.is_none()
    }

    pub fn is_waiting(&self) -> bool {
        self.status == PlayerStatus::Waiting
    }

    pub fn is_dead_or_dying(&self) -> bool {
        matches!(self.status, PlayerStatus::Dead | PlayerStatus::Dying)
    }

    /// Whether everyone in the session knows this player is dead.
    /// A soft kill becomes public knowledge once a meeting starts.
    pub fn is_known_dead(&self, phase: Phase) -> bool {
        match self.status {
            PlayerStatus::Dead => true,
            PlayerStatus::Dying => phase == Phase::Meeting,
            _ => false,
        }
    }

    /// A living participant: the role silenced while working.
    pub fn is_worker(&self) -> bool {
        !self.is_spectating() && !self.is_dead_or_dying()
    }

    /// Whether both identities are present.
    pub fn is_linked(&self) -> bool {
        self.member.is_some() && self.game.is_some()
    }

    /// Whether there is a member in voice whose state can be changed.
    pub fn is_reachable(&self) -> bool {
        self.member.is_some() && self.in_voice
    }

    // -- mutation (lobby only) ----------------------------------------------

    pub(crate) fn set_status(&mut self, status: PlayerStatus) {
        self.status = status;
    }

    pub(crate) fn set_in_voice(&mut self, in_voice: bool) {
        self.in_voice = in_voice;
    }

    pub(crate) fn refresh_member(&mut self, member: &ChatMember) {
        self.member = Some(member.clone());
    }

    pub(crate) fn set_color(&mut self, color: Option<Color>) {
        if let Some(game) = self.game.as_mut() {
            game.color = color;
        }
    }

    /// Gives a spectator a game name; they wait for the round to track them.
    pub(crate) fn assign_game_name(&mut self, name: &str) {
        self.game = Some(GameIdentity { name: name.to_string(), color: None });
        self.status = PlayerStatus::Waiting;
    }

    /// Drops the game identity, turning the player back into a spectator.
    /// Returns the identity that was held.
    pub(crate) fn leave_game(&mut self) -> Option<GameIdentity> {
        self.status = PlayerStatus::Spectating;
        self.game.take()
    }

    /// Attaches a member to an avatar-only player.
    pub(crate) fn link_member(&mut self, member: ChatMember, in_voice: bool) {
        self.member = Some(member);
        self.in_voice = in_voice;
    }
}
