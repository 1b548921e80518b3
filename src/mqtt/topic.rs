//! Topic namespace for everything the bridge publishes or subscribes to.
//!
//! All topics live under `<app-id>/<host>`, where `<host>` is the first label
//! of the local hostname stripped down to `[A-Za-z0-9_-]`. The set of logical
//! paths below that prefix is closed: adding a topic means adding a [`Suffix`]
//! variant.

use std::fmt;
use thiserror::Error;

/// Characters allowed in a namespace token.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

const FALLBACK_HOST: &str = "localhost";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("app id must be a non-empty [A-Za-z0-9_-] token, got {0:?}")]
    InvalidAppId(String),
}

/// Logical sub-topic below the host namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suffix {
    Alive,
    Battery,
    MusicVolume,
    MusicState,
    MusicTrackId,
    MusicTrackName,
    MusicTrackArtist,
    MuteSyncInMeeting,
    MuteSyncMuted,
    CommandMusicVolume,
    CommandMusicPlayPause,
}

impl Suffix {
    pub const ALL: [Suffix; 11] = [
        Suffix::Alive,
        Suffix::Battery,
        Suffix::MusicVolume,
        Suffix::MusicState,
        Suffix::MusicTrackId,
        Suffix::MusicTrackName,
        Suffix::MusicTrackArtist,
        Suffix::MuteSyncInMeeting,
        Suffix::MuteSyncMuted,
        Suffix::CommandMusicVolume,
        Suffix::CommandMusicPlayPause,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Suffix::Alive => "/status/alive",
            Suffix::Battery => "/status/battery",
            Suffix::MusicVolume => "/status/music/volume",
            Suffix::MusicState => "/status/music/state",
            Suffix::MusicTrackId => "/status/music/trackID",
            Suffix::MusicTrackName => "/status/music/trackName",
            Suffix::MusicTrackArtist => "/status/music/trackArtist",
            Suffix::MuteSyncInMeeting => "/status/mutesync/inMeeting",
            Suffix::MuteSyncMuted => "/status/mutesync/muted",
            Suffix::CommandMusicVolume => "/command/music/volume",
            Suffix::CommandMusicPlayPause => "/command/music/playpause",
        }
    }

    pub fn from_path(path: &str) -> Option<Suffix> {
        Suffix::ALL.into_iter().find(|suffix| suffix.as_str() == path)
    }

    pub fn is_command(self) -> bool {
        self.as_str().starts_with(COMMAND_ROOT)
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const COMMAND_ROOT: &str = "/command/";

/// Immutable `<app-id>/<host>` prefix, built once at startup and handed to
/// every component that needs to name a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    pub fn new(app_id: &str, hostname: &str) -> Result<Self, NamespaceError> {
        if app_id.is_empty() || !app_id.chars().all(is_token_char) {
            return Err(NamespaceError::InvalidAppId(app_id.to_string()));
        }
        Ok(Self {
            prefix: format!("{}/{}", app_id, sanitize_hostname(hostname)),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    pub fn full_topic(&self, suffix: Suffix) -> String {
        format!("{}{}", self.prefix, suffix.as_str())
    }

    /// Wildcard filter covering every command topic of this host.
    pub fn command_filter(&self) -> String {
        format!("{}{}#", self.prefix, COMMAND_ROOT)
    }

    /// Resolves a fully qualified topic back to its suffix. Topics outside
    /// this namespace or unknown paths yield `None`.
    pub fn suffix_of(&self, topic: &str) -> Option<Suffix> {
        topic
            .strip_prefix(self.prefix.as_str())
            .and_then(Suffix::from_path)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// `"name.local"` becomes `"name"`, with everything outside `[A-Za-z0-9_-]`
/// removed. Never returns an empty string.
pub fn sanitize_hostname(raw: &str) -> String {
    let strip = |s: &str| s.chars().filter(|c| is_token_char(*c)).collect::<String>();

    let first_label = raw.trim().split('.').next().unwrap_or_default();
    let token = strip(first_label);
    if !token.is_empty() {
        return token;
    }
    let token = strip(raw);
    if !token.is_empty() {
        return token;
    }
    FALLBACK_HOST.to_string()
}
