//! Lobby configuration, phase state machine, and agent link state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Settings shared by every lobby a registry starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Debounce window for status announcements. Bursts of roster
    /// changes inside this window produce a single announcement.
    pub announce_debounce: Duration,

    /// Length of generated connect codes.
    pub connect_code_len: usize,

    /// What a `ForceSync` event flagged `disconnected` does.
    pub disconnect_policy: DisconnectPolicy,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            announce_debounce: Duration::from_millis(300),
            connect_code_len: 6,
            disconnect_policy: DisconnectPolicy::default(),
        }
    }
}

/// Handling of avatars the capture agent reports as disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisconnectPolicy {
    /// Keep the player as-is; the agent will report a leave if they are gone.
    #[default]
    Ignore,
    /// Handle it exactly like a `Leave` event.
    Leave,
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The social-permission regime of a round.
///
/// ```text
///            ┌──────────────┐
///            │ Intermission │
///            └──────────────┘
///             ↗↙          ↘↖
///   ┌─────────┐          ┌─────────┐
///   │ Working │ ←──────→ │ Meeting │
///   └─────────┘          └─────────┘
/// ```
///
/// - **Intermission**: between rounds, everyone talks.
/// - **Working**: a round is running; living players are silenced.
/// - **Meeting**: discussion; the living speak, the dead listen.
///
/// Every edge is allowed. Only a move to the current phase is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Intermission,
    Working,
    Meeting,
}

impl Phase {
    /// Returns `true` if moving to `target` is a real transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self != target
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intermission => write!(f, "Intermission"),
            Self::Working => write!(f, "Working"),
            Self::Meeting => write!(f, "Meeting"),
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intermission" | "lobby" => Ok(Self::Intermission),
            "working" | "tasks" => Ok(Self::Working),
            "meeting" | "discussion" => Ok(Self::Meeting),
            other => Err(format!("unknown phase {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// LinkState
// ---------------------------------------------------------------------------

/// Whether a capture agent is currently reporting for the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkState {
    /// No agent has connected yet.
    #[default]
    Waiting,
    Connected,
    /// An agent was connected and went away.
    Disconnected,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_any_edge_but_self_is_valid() {
        let all = [Phase::Intermission, Phase::Working, Phase::Meeting];
        for from in all {
            for to in all {
                assert_eq!(from.can_transition_to(to), from != to, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_phase_parse_accepts_aliases() {
        assert_eq!("tasks".parse::<Phase>().unwrap(), Phase::Working);
        assert_eq!(" Meeting ".parse::<Phase>().unwrap(), Phase::Meeting);
        assert_eq!("lobby".parse::<Phase>().unwrap(), Phase::Intermission);
        assert!("vote".parse::<Phase>().is_err());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Working.to_string(), "Working");
        assert_eq!(LinkState::Disconnected.to_string(), "Disconnected");
    }

    #[test]
    fn test_lobby_config_default() {
        let config = LobbyConfig::default();
        assert_eq!(config.announce_debounce, Duration::from_millis(300));
        assert_eq!(config.connect_code_len, 6);
        assert_eq!(config.disconnect_policy, DisconnectPolicy::Ignore);
        assert_eq!(Phase::default(), Phase::Intermission);
        assert_eq!(LinkState::default(), LinkState::Waiting);
    }
}
