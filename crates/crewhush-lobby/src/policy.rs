//! Default mute/deafen derivation.
//!
//! The lobby decides *when* and *in what order* players are synchronized;
//! what a synchronization does is up to the [`Platform`](crate::Platform).
//! Platforms that only need server-side mute and deafen can derive the
//! target state with [`VoiceState::for_player`].

use serde::{Deserialize, Serialize};

use crate::{Phase, Player};

/// Server-side voice flags for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceState {
    pub mute: bool,
    pub deaf: bool,
}

impl VoiceState {
    /// Can talk and hear.
    pub const OPEN: Self = Self { mute: false, deaf: false };
    /// Can hear, cannot talk.
    pub const LISTENING: Self = Self { mute: true, deaf: false };
    /// Neither talks nor hears.
    pub const SILENCED: Self = Self { mute: true, deaf: true };

    /// Target state of `player` during `phase`.
    ///
    /// | phase        | worker   | known dead | spectator / soft-killed |
    /// |--------------|----------|------------|-------------------------|
    /// | Intermission | open     | open       | open                    |
    /// | Working      | silenced | open       | listening               |
    /// | Meeting      | open     | listening  | listening               |
    ///
    /// During Working the dead talk among themselves while the living
    /// hear nothing. A soft-killed player is not yet known dead, so they
    /// may listen but not join either side.
    pub fn for_player(player: &Player, phase: Phase) -> Self {
        match phase {
            Phase::Intermission => Self::OPEN,
            Phase::Working => {
                if player.is_worker() {
                    Self::SILENCED
                } else if player.is_known_dead(phase) {
                    Self::OPEN
                } else {
                    Self::LISTENING
                }
            }
            Phase::Meeting => {
                if player.is_worker() {
                    Self::OPEN
                } else {
                    Self::LISTENING
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMember, PlayerStatus};
    use crewhush_protocol::MemberId;

    fn linked(status: PlayerStatus) -> Player {
        let mut p = Player::spectator(ChatMember::new(MemberId(1), "alice"));
        p.assign_game_name("Red");
        p.set_status(status);
        p
    }

    #[test]
    fn test_intermission_opens_everyone() {
        for status in [PlayerStatus::Alive, PlayerStatus::Dead, PlayerStatus::Dying] {
            assert_eq!(VoiceState::for_player(&linked(status), Phase::Intermission), VoiceState::OPEN);
        }
        let spectator = Player::spectator(ChatMember::new(MemberId(2), "sam"));
        assert_eq!(VoiceState::for_player(&spectator, Phase::Intermission), VoiceState::OPEN);
    }

    #[test]
    fn test_working_silences_workers_and_frees_the_dead() {
        assert_eq!(VoiceState::for_player(&linked(PlayerStatus::Alive), Phase::Working), VoiceState::SILENCED);
        assert_eq!(VoiceState::for_player(&linked(PlayerStatus::Waiting), Phase::Working), VoiceState::SILENCED);
        assert_eq!(VoiceState::for_player(&linked(PlayerStatus::Dead), Phase::Working), VoiceState::OPEN);
        assert_eq!(VoiceState::for_player(&linked(PlayerStatus::Dying), Phase::Working), VoiceState::LISTENING);
    }

    #[test]
    fn test_meeting_lets_the_living_speak() {
        assert_eq!(VoiceState::for_player(&linked(PlayerStatus::Alive), Phase::Meeting), VoiceState::OPEN);
        assert_eq!(VoiceState::for_player(&linked(PlayerStatus::Dying), Phase::Meeting), VoiceState::LISTENING);
        assert_eq!(VoiceState::for_player(&linked(PlayerStatus::Dead), Phase::Meeting), VoiceState::LISTENING);
    }
}
