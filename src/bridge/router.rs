//! Command Router - inbound command topics to player actions
//!
//! Two stages, split across tasks:
//!
//! ```text
//! event loop task                        command worker task
//! ───────────────                        ───────────────────
//! payload ─► COMMANDS[suffix].parse ─►  mpsc ─► MediaController action
//!            (invalid: log + drop)              └─► StatePublisher::publish_music
//! ```
//!
//! The first stage runs inside the gateway's event loop, so it only parses
//! and enqueues. The worker runs the action under the music query timeout and
//! then republishes the music state, even if the action failed, so the bus
//! shows what the player actually did.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::host::{MediaController, MediaError};
use crate::mqtt::{CommandHandler, Suffix};

use super::state::StatePublisher;

const COMMAND_QUEUE_CAPACITY: usize = 16;

/// A validated command, ready to run against the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetVolume(u8),
    SetPlaying(bool),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error("volume {0:?} is not an integer")]
    InvalidVolume(String),

    /// Parsed fine but outside 0..=100
    #[error("volume {0} is out of range 0..=100")]
    VolumeOutOfRange(i64),

    #[error("{0:?} is not a boolean")]
    InvalidBool(String),

    #[error("command queue is full")]
    QueueFull,

    #[error("command worker has stopped")]
    Closed,
}

/// One row of the dispatch table
pub struct CommandEntry {
    pub suffix: Suffix,
    pub parse: fn(&str) -> Result<Command, CommandError>,
}

pub const COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        suffix: Suffix::CommandMusicVolume,
        parse: volume_command,
    },
    CommandEntry {
        suffix: Suffix::CommandMusicPlayPause,
        parse: play_pause_command,
    },
];

fn volume_command(payload: &str) -> Result<Command, CommandError> {
    parse_volume(payload).map(Command::SetVolume)
}

fn play_pause_command(payload: &str) -> Result<Command, CommandError> {
    parse_play_pause(payload).map(Command::SetPlaying)
}

/// Decimal integer with optional sign, no surrounding whitespace, 0..=100.
pub fn parse_volume(payload: &str) -> Result<u8, CommandError> {
    let value: i64 = payload
        .parse()
        .map_err(|_| CommandError::InvalidVolume(payload.to_string()))?;
    u8::try_from(value)
        .ok()
        .filter(|level| *level <= 100)
        .ok_or(CommandError::VolumeOutOfRange(value))
}

pub fn parse_play_pause(payload: &str) -> Result<bool, CommandError> {
    match payload {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(CommandError::InvalidBool(other.to_string())),
    }
}

/// Parses a payload for `suffix`. `None` if no command lives on that suffix.
pub fn parse_command(suffix: Suffix, payload: &[u8]) -> Option<Result<Command, CommandError>> {
    let entry = COMMANDS.iter().find(|entry| entry.suffix == suffix)?;
    Some(
        std::str::from_utf8(payload)
            .map_err(|_| CommandError::NotUtf8)
            .and_then(entry.parse),
    )
}

/// Front half of the router: turns payloads into queued commands.
#[derive(Clone)]
pub struct CommandRouter {
    tx: mpsc::Sender<Command>,
}

/// Back half of the router, consumed when the worker is spawned.
pub struct CommandQueue {
    rx: mpsc::Receiver<Command>,
}

impl CommandRouter {
    pub fn channel() -> (CommandRouter, CommandQueue) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        (CommandRouter { tx }, CommandQueue { rx })
    }

    /// One gateway handler per command suffix.
    pub fn handlers(&self) -> Vec<(Suffix, CommandHandler)> {
        COMMANDS
            .iter()
            .map(|entry| {
                let router = self.clone();
                let handler: CommandHandler =
                    Arc::new(move |payload: &[u8]| router.accept(entry.suffix, payload));
                (entry.suffix, handler)
            })
            .collect()
    }

    /// Parses and enqueues without blocking. Invalid payloads are logged and
    /// dropped.
    pub fn accept(&self, suffix: Suffix, payload: &[u8]) {
        let command = match parse_command(suffix, payload) {
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                warn!("Ignoring command on {}: {}", suffix, e);
                return;
            }
            None => return,
        };
        if let Err(e) = self.enqueue(command) {
            warn!("Dropping {:?}: {}", command, e);
        }
    }

    fn enqueue(&self, command: Command) -> Result<(), CommandError> {
        self.tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CommandError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => CommandError::Closed,
        })
    }
}

impl CommandQueue {
    pub fn spawn(self, state: StatePublisher) -> JoinHandle<()> {
        tokio::spawn(self.run(state))
    }

    async fn run(mut self, state: StatePublisher) {
        debug!("Command worker started");
        let limit = state.timeouts().music;
        while let Some(command) = self.rx.recv().await {
            if let Err(e) = execute(state.media(), command, limit).await {
                warn!("Command {:?} failed: {}", command, e);
            }
            let _ = state.publish_music().await;
        }
        debug!("Command channel closed, worker stopped");
    }
}

async fn execute(
    media: &dyn MediaController,
    command: Command,
    limit: Duration,
) -> Result<(), MediaError> {
    let action = async {
        match command {
            Command::SetVolume(level) => {
                info!("Setting volume to {}", level);
                media.set_volume(level).await
            }
            Command::SetPlaying(true) => {
                info!("Play");
                media.set_playing(true).await
            }
            Command::SetPlaying(false) => {
                info!("Pause");
                media.set_playing(false).await
            }
        }
    };
    tokio::time::timeout(limit, action)
        .await
        .unwrap_or(Err(MediaError::Timeout(limit)))
}
