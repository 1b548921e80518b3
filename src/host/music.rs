//! Media player control through `osascript`.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use super::record::{parse_record, Record, RecordError};
use super::{MediaController, MusicSnapshot, PlayerState};

const OSASCRIPT: &str = "osascript";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to run osascript: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("script error: {0}")]
    Script(String),

    #[error("unexpected player output: {0}")]
    Parse(#[from] RecordError),

    #[error("player output is missing {0}")]
    MissingField(&'static str),

    #[error("player reported volume {0:?}")]
    InvalidVolume(String),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Talks to a scriptable player (Music.app by default).
#[derive(Debug, Clone)]
pub struct AppleScriptMusic {
    player: String,
}

impl AppleScriptMusic {
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
        }
    }

    fn tell(&self, body: &str) -> String {
        format!(
            "tell application \"{}\"\n{}\nend tell",
            escape_applescript(&self.player),
            body
        )
    }

    fn query_script(&self) -> String {
        self.tell(
            "set playerState to player state as string
set currentVolume to sound volume
if player state is stopped then
return {state:playerState, volume:currentVolume}
end if
set currentTrack to current track
return {state:playerState, volume:currentVolume, trackID:(id of currentTrack) as string, trackName:name of currentTrack, trackArtist:artist of currentTrack}",
        )
    }

    /// Runs a script and returns stdout in source form (`-s s`), so strings
    /// come back quoted.
    async fn run(&self, script: &str) -> Result<String, MediaError> {
        let output = Command::new(OSASCRIPT)
            .args(["-s", "s", "-e", script])
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::Script(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

#[async_trait]
impl MediaController for AppleScriptMusic {
    async fn query(&self) -> Result<MusicSnapshot, MediaError> {
        let output = self.run(&self.query_script()).await?;
        snapshot_from_record(&parse_record(&output)?)
    }

    async fn set_volume(&self, level: u8) -> Result<(), MediaError> {
        debug!("Telling {} to set volume level to {}", self.player, level);
        self.run(&self.tell(&format!("set sound volume to {}", level)))
            .await
            .map(|_| ())
    }

    async fn set_playing(&self, play: bool) -> Result<(), MediaError> {
        let op = if play { "play" } else { "pause" };
        debug!("Telling {} to {}", self.player, op);
        self.run(&self.tell(op)).await.map(|_| ())
    }
}

pub fn snapshot_from_record(record: &Record) -> Result<MusicSnapshot, MediaError> {
    let state = record
        .text("state")
        .ok_or(MediaError::MissingField("state"))?;
    let raw_volume = record
        .text("volume")
        .ok_or(MediaError::MissingField("volume"))?;
    let volume = raw_volume
        .parse::<u8>()
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| MediaError::InvalidVolume(raw_volume.to_string()))?;

    let field = |key: &str| record.text(key).map(str::to_string);
    Ok(MusicSnapshot::new(
        PlayerState::parse(state),
        volume,
        field("trackID"),
        field("trackName"),
        field("trackArtist"),
    ))
}

fn escape_applescript(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
