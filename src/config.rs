//! Bridge configuration, read once at startup from `mac2mqtt.toml`.
//!
//! The file is looked up in this order:
//!
//! 1. the path in `MAC2MQTT_CONFIG`
//! 2. `./mac2mqtt.toml`
//! 3. `<config dir>/mac2mqtt/mac2mqtt.toml` (e.g. `~/Library/Application Support` on macOS)
//!
//! Only the `[mqtt]` connection keys are required, everything else has a
//! default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn, Level};

use crate::mqtt::GatewaySettings;

pub const CONFIG_ENV: &str = "MAC2MQTT_CONFIG";
pub const CONFIG_FILE: &str = "mac2mqtt.toml";
const CONFIG_DIR: &str = "mac2mqtt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file found, looked in {0:?}")]
    NotFound(Vec<PathBuf>),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("must specify {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Deserialize, Debug, Clone)]
pub struct BridgeConfig {
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Skips the hostname lookup when set
    #[serde(default)]
    pub hostname: Option<String>,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub mutesync: MuteSyncConfig,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub battery: BatteryConfig,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[serde(alias = "mqtt")]
    Tcp,
    #[serde(alias = "ssl", alias = "mqtts")]
    Tls,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub ip: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MuteSyncConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_mutesync_ip")]
    pub ip: String,
    #[serde(default = "default_mutesync_port")]
    pub port: u16,
    /// Runs on the music tick, after the music query
    #[serde(default = "default_mutesync_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for MuteSyncConfig {
    fn default() -> Self {
        Self {
            token: None,
            ip: default_mutesync_ip(),
            port: default_mutesync_port(),
            query_timeout_ms: default_mutesync_timeout_ms(),
        }
    }
}

impl MuteSyncConfig {
    /// The token, if presence reporting is enabled.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct MusicConfig {
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default = "default_music_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_music_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            refresh_interval_ms: default_music_interval_ms(),
            query_timeout_ms: default_music_timeout_ms(),
        }
    }
}

impl MusicConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// What a failed battery reading does to the bridge
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatteryFailurePolicy {
    /// Stop the bridge with an error
    #[default]
    Fatal,
    /// Log and try again on the next tick
    Log,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BatteryConfig {
    #[serde(default = "default_battery_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_battery_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default)]
    pub on_failure: BatteryFailurePolicy,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_battery_interval_secs(),
            query_timeout_ms: default_battery_timeout_ms(),
            on_failure: BatteryFailurePolicy::default(),
        }
    }
}

impl BatteryConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

fn default_app_id() -> String {
    "mac2mqtt".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_keep_alive_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_reconnect_delay_secs() -> u64 {
    2
}
fn default_mutesync_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_mutesync_port() -> u16 {
    8249
}
fn default_mutesync_timeout_ms() -> u64 {
    500
}
fn default_player() -> String {
    "Music".to_string()
}
fn default_music_interval_ms() -> u64 {
    2000
}
fn default_music_timeout_ms() -> u64 {
    1500
}
fn default_battery_interval_secs() -> u64 {
    60
}
fn default_battery_timeout_ms() -> u64 {
    10_000
}

impl BridgeConfig {
    /// Finds the config file, see the module docs for the lookup order.
    pub fn locate() -> Result<PathBuf, ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(CONFIG_DIR).join(CONFIG_FILE));
        }
        locate_in(explicit, candidates)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading config from {}", path.display());
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mqtt = &self.mqtt;
        for (key, value) in [
            ("mqtt.ip", &mqtt.ip),
            ("mqtt.user", &mqtt.user),
            ("mqtt.password", &mqtt.password),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingKey(key));
            }
        }
        if mqtt.port == 0 {
            return Err(ConfigError::MissingKey("mqtt.port"));
        }
        if mqtt.keep_alive_secs < 5 {
            return Err(invalid("mqtt.keep_alive_secs", "must be at least 5 seconds"));
        }
        if self.music.refresh_interval_ms == 0 {
            return Err(invalid("music.refresh_interval_ms", "must not be zero"));
        }
        if self.mutesync.token().is_some()
            && self
                .music
                .query_timeout_ms
                .saturating_add(self.mutesync.query_timeout_ms)
                > self.music.refresh_interval_ms
        {
            return Err(invalid(
                "mutesync.query_timeout_ms",
                "music and presence timeouts together must fit in music.refresh_interval_ms",
            ));
        }
        if self.battery.refresh_interval_secs == 0 {
            return Err(invalid("battery.refresh_interval_secs", "must not be zero"));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse::<Level>()
            .map_err(|e| invalid("log_level", e.to_string()))
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        let mqtt = &self.mqtt;
        let protocol = mqtt.protocol.unwrap_or_else(|| {
            warn!("mqtt.protocol is not set, defaulting to tcp");
            Protocol::Tcp
        });
        GatewaySettings {
            host: mqtt.ip.clone(),
            port: mqtt.port,
            user: mqtt.user.clone(),
            password: mqtt.password.clone(),
            tls: protocol == Protocol::Tls,
            keep_alive: Duration::from_secs(mqtt.keep_alive_secs),
            connect_timeout: Duration::from_secs(mqtt.connect_timeout_secs),
            reconnect_delay: Duration::from_secs(mqtt.reconnect_delay_secs),
        }
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.into(),
    }
}

/// An explicit path wins even if it does not exist, so a typo in the
/// environment variable fails loudly instead of falling back.
fn locate_in(explicit: Option<PathBuf>, candidates: Vec<PathBuf>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    match candidates.iter().find(|path| path.is_file()) {
        Some(path) => Ok(path.clone()),
        None => Err(ConfigError::NotFound(candidates)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[mqtt]
ip = "192.168.1.10"
port = 1883
user = "bridge"
password = "secret"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = BridgeConfig::parse(MINIMAL).unwrap();

        assert_eq!(config.app_id, "mac2mqtt");
        assert_eq!(config.log_level().unwrap(), Level::INFO);
        assert_eq!(config.hostname, None);
        assert_eq!(config.mutesync.token(), None);
        assert_eq!(config.mutesync.port, 8249);
        assert_eq!(config.music.player, "Music");
        assert_eq!(config.music.refresh_interval(), Duration::from_secs(2));
        assert_eq!(config.battery.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.battery.on_failure, BatteryFailurePolicy::Fatal);

        let settings = config.gateway_settings();
        assert_eq!(settings.host, "192.168.1.10");
        assert_eq!(settings.port, 1883);
        assert!(!settings.tls);
    }

    #[test]
    fn full_config_is_read() {
        let config = BridgeConfig::parse(
            r#"
app_id = "office"
log_level = "debug"
hostname = "Desk-Mac"

[mqtt]
ip = "broker.lan"
port = 8883
user = "bridge"
password = "secret"
protocol = "ssl"
keep_alive_secs = 10

[mutesync]
token = "abc123"

[music]
player = "Spotify"
query_timeout_ms = 800

[battery]
refresh_interval_secs = 120
on_failure = "log"
"#,
        )
        .unwrap();

        assert_eq!(config.app_id, "office");
        assert_eq!(config.log_level().unwrap(), Level::DEBUG);
        assert_eq!(config.hostname.as_deref(), Some("Desk-Mac"));
        assert_eq!(config.mutesync.token(), Some("abc123"));
        assert_eq!(config.mutesync.ip, "127.0.0.1");
        assert_eq!(config.mutesync.query_timeout(), Duration::from_millis(500));
        assert_eq!(config.music.player, "Spotify");
        assert_eq!(config.music.query_timeout(), Duration::from_millis(800));
        assert_eq!(config.music.refresh_interval(), Duration::from_millis(2000));
        assert_eq!(config.battery.on_failure, BatteryFailurePolicy::Log);

        let settings = config.gateway_settings();
        assert!(settings.tls);
        assert_eq!(settings.keep_alive, Duration::from_secs(10));
    }

    #[test]
    fn protocol_spellings() {
        for (raw, expected) in [
            ("tcp", Protocol::Tcp),
            ("mqtt", Protocol::Tcp),
            ("tls", Protocol::Tls),
            ("ssl", Protocol::Tls),
            ("mqtts", Protocol::Tls),
        ] {
            let config = BridgeConfig::parse(&format!("{}protocol = \"{}\"\n", MINIMAL, raw))
                .unwrap();
            assert_eq!(config.mqtt.protocol, Some(expected), "{}", raw);
        }
        assert!(matches!(
            BridgeConfig::parse(&format!("{}protocol = \"ws\"\n", MINIMAL)),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_required_keys_are_fatal() {
        assert!(matches!(
            BridgeConfig::parse("[mqtt]\nip = \"x\"\nport = 1883\nuser = \"u\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            BridgeConfig::parse(&MINIMAL.replace("192.168.1.10", "")),
            Err(ConfigError::MissingKey("mqtt.ip"))
        ));
        assert!(matches!(
            BridgeConfig::parse(&MINIMAL.replace("1883", "0")),
            Err(ConfigError::MissingKey("mqtt.port"))
        ));
        assert!(matches!(BridgeConfig::parse(""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            BridgeConfig::parse(&format!("log_level = \"chatty\"\n{}", MINIMAL)),
            Err(ConfigError::InvalidValue { key: "log_level", .. })
        ));
        assert!(matches!(
            BridgeConfig::parse(&format!("{}\n[music]\nrefresh_interval_ms = 0\n", MINIMAL)),
            Err(ConfigError::InvalidValue {
                key: "music.refresh_interval_ms",
                ..
            })
        ));
        assert!(matches!(
            BridgeConfig::parse(&format!("{}\n[battery]\non_failure = \"ignore\"\n", MINIMAL)),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn presence_and_music_timeouts_must_fit_the_music_tick() {
        let slow_presence = format!(
            "{}\n[mutesync]\ntoken = \"abc\"\nquery_timeout_ms = 1500\n",
            MINIMAL
        );
        assert!(matches!(
            BridgeConfig::parse(&slow_presence),
            Err(ConfigError::InvalidValue {
                key: "mutesync.query_timeout_ms",
                ..
            })
        ));

        // Without a token presence never runs, so its timeout is irrelevant.
        let disabled = format!("{}\n[mutesync]\nquery_timeout_ms = 1500\n", MINIMAL);
        assert!(BridgeConfig::parse(&disabled).is_ok());

        let slower_tick = format!(
            "{}\n[mutesync]\ntoken = \"abc\"\nquery_timeout_ms = 1500\n\n[music]\nrefresh_interval_ms = 3000\n",
            MINIMAL
        );
        let config = BridgeConfig::parse(&slower_tick).unwrap();
        assert_eq!(config.mutesync.query_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn blank_mutesync_token_disables_presence() {
        let config =
            BridgeConfig::parse(&format!("{}\n[mutesync]\ntoken = \"  \"\n", MINIMAL)).unwrap();
        assert_eq!(config.mutesync.token(), None);
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = BridgeConfig::load(file.path()).await.unwrap();
        assert_eq!(config.mqtt.user, "bridge");
    }

    #[tokio::test]
    async fn unreadable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        match BridgeConfig::load(&path).await {
            Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn lookup_prefers_explicit_path_then_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join(CONFIG_FILE);
        std::fs::write(&present, MINIMAL).unwrap();

        let explicit = dir.path().join("explicit.toml");
        assert_eq!(
            locate_in(Some(explicit.clone()), vec![present.clone()]).unwrap(),
            explicit
        );
        assert_eq!(
            locate_in(None, vec![missing.clone(), present.clone()]).unwrap(),
            present
        );
        assert!(matches!(
            locate_in(None, vec![missing]),
            Err(ConfigError::NotFound(paths)) if paths.len() == 1
        ));
    }
}
