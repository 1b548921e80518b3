//! Host state producers.
//!
//! Each producer wraps one external tool or service and returns a plain
//! snapshot or a typed error. The bridge core only sees the traits below.
//!
//! ```text
//! MediaController ── osascript ──► Music.app
//! BatteryReader   ── pmset -g batt
//! PresenceClient  ── HTTP ──► mutesync local API
//! ```

pub mod battery;
pub mod hostname;
pub mod music;
pub mod presence;
pub mod record;

use async_trait::async_trait;
use std::fmt;

pub use battery::{BatteryError, Pmset};
pub use music::{AppleScriptMusic, MediaError};
pub use presence::{MuteSync, PresenceError};

/// Playback state as reported by the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
    FastForwarding,
    Rewinding,
    Other(String),
}

impl PlayerState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "stopped" => PlayerState::Stopped,
            "playing" => PlayerState::Playing,
            "paused" => PlayerState::Paused,
            "fast forwarding" => PlayerState::FastForwarding,
            "rewinding" => PlayerState::Rewinding,
            other => PlayerState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Stopped => f.write_str("stopped"),
            PlayerState::Playing => f.write_str("playing"),
            PlayerState::Paused => f.write_str("paused"),
            PlayerState::FastForwarding => f.write_str("fast forwarding"),
            PlayerState::Rewinding => f.write_str("rewinding"),
            PlayerState::Other(raw) => f.write_str(raw),
        }
    }
}

/// One reading of the media player. Track fields are always `None` while the
/// player is stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicSnapshot {
    pub player_state: PlayerState,
    pub volume: u8,
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    pub track_artist: Option<String>,
}

impl MusicSnapshot {
    pub fn new(
        player_state: PlayerState,
        volume: u8,
        track_id: Option<String>,
        track_name: Option<String>,
        track_artist: Option<String>,
    ) -> Self {
        if player_state == PlayerState::Stopped {
            return Self::stopped(volume);
        }
        Self {
            player_state,
            volume,
            track_id,
            track_name,
            track_artist,
        }
    }

    pub fn stopped(volume: u8) -> Self {
        Self {
            player_state: PlayerState::Stopped,
            volume,
            track_id: None,
            track_name: None,
            track_artist: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub in_meeting: bool,
    pub muted: bool,
}

#[async_trait]
pub trait MediaController: Send + Sync {
    async fn query(&self) -> Result<MusicSnapshot, MediaError>;

    /// `level` is already validated to 0..=100.
    async fn set_volume(&self, level: u8) -> Result<(), MediaError>;

    async fn set_playing(&self, play: bool) -> Result<(), MediaError>;
}

#[async_trait]
pub trait BatteryReader: Send + Sync {
    /// Charge in percent.
    async fn read(&self) -> Result<u8, BatteryError>;
}

#[async_trait]
pub trait PresenceClient: Send + Sync {
    async fn query(&self) -> Result<PresenceSnapshot, PresenceError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_snapshot_drops_track_fields() {
        let snapshot = MusicSnapshot::new(
            PlayerState::Stopped,
            30,
            Some("1".to_string()),
            Some("name".to_string()),
            Some("artist".to_string()),
        );
        assert_eq!(snapshot, MusicSnapshot::stopped(30));
    }

    #[test]
    fn player_state_round_trips_through_display() {
        for raw in ["stopped", "playing", "paused", "fast forwarding", "rewinding", "kPSu"] {
            assert_eq!(PlayerState::parse(raw).to_string(), raw);
        }
    }
}
