//! Lobby state machine and roster reconciliation for Crewhush.
//!
//! A lobby ties one voice session to one game round. It merges the chat
//! roster (members joining and leaving voice) with the game roster
//! (avatars reported by a capture agent) and keeps every member's speaking
//! rights in line with the round's phase.
//!
//! # Key types
//!
//! - [`Platform`]: the chat-side collaborator embedders implement
//! - [`LobbyRegistry`]: starts, finds, and stops lobbies
//! - [`Lobby`]: roster operations and phase transitions
//! - [`Player`]: one roster entry with its chat and game facets
//! - [`Phase`]: Intermission / Working / Meeting
//! - [`VoiceState`]: default mute/deafen policy

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod lobby;
mod platform;
mod player;
mod policy;
mod registry;

pub use config::{DisconnectPolicy, LinkState, LobbyConfig, Phase};
pub use error::{LobbyError, PlatformError};
pub use lobby::{GameRoom, Lobby, LobbySnapshot};
pub use platform::Platform;
pub use player::{ChatMember, GameIdentity, Player, PlayerStatus};
pub use policy::VoiceState;
pub use registry::LobbyRegistry;
