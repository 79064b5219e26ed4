use serde::Deserialize;
use std::path::Path;

use limbogate_filter::attack::AttackSettings;
use limbogate_filter::checks::CheckSettings;
use limbogate_proto::dimension::{DimensionBackend, DimensionType};

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub limbo: LimboSection,
    #[serde(default)]
    pub attack: AttackSettings,
    #[serde(default)]
    pub checks: CheckSettings,
    #[serde(default)]
    pub messages: MessagesSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    pub address: String,
    pub port: u16,
    pub motd: String,
    pub max_players: u32,
    /// Brand string announced over the brand plugin channel.
    #[serde(default = "default_brand")]
    pub brand: String,
    /// Accept HAProxy protocol-v2 preambles from a fronting proxy.
    #[serde(default)]
    pub proxy_protocol: bool,
}

fn default_brand() -> String {
    "vanilla".into()
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct LimboSection {
    #[serde(default = "default_dimension")]
    pub dimension: DimensionType,
    #[serde(default = "default_backend")]
    pub backend: DimensionBackend,
    /// Send the abilities packet that suppresses fall damage.
    #[serde(default = "default_true")]
    pub disable_fall: bool,
    /// Serve the status response from the prebuilt cache while under
    /// attack.
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default = "default_keep_alive_interval")]
    pub keep_alive_interval_secs: u64,
    /// Seconds a connection may spend before reaching PLAY.
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,
    /// Y coordinate the session spawns (and falls) from.
    #[serde(default = "default_spawn_y")]
    pub spawn_y: f64,
}

fn default_dimension() -> DimensionType {
    DimensionType::Overworld
}

fn default_backend() -> DimensionBackend {
    DimensionBackend::Registry
}

fn default_true() -> bool {
    true
}

fn default_keep_alive_interval() -> u64 {
    5
}

fn default_login_timeout() -> u64 {
    10
}

fn default_spawn_y() -> f64 {
    400.0
}

impl Default for LimboSection {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            backend: default_backend(),
            disable_fall: true,
            use_cache: true,
            keep_alive_interval_secs: default_keep_alive_interval(),
            login_timeout_secs: default_login_timeout(),
            spawn_y: default_spawn_y(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesSection {
    /// Prepended to every kick message.
    #[serde(default = "default_kick_prefix")]
    pub kick_prefix: String,
}

fn default_kick_prefix() -> String {
    "§cConnection refused: ".into()
}

impl Default for MessagesSection {
    fn default() -> Self {
        Self {
            kick_prefix: default_kick_prefix(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
