use crate::shipper::writer::{TimeZoneError, TimeZoneSetting};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    /// "system" (or "local") or an IANA zone name
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Static origin for every record; the CLI falls back to the hostname
    #[serde(default)]
    pub origin: Option<String>,
    /// Static context for every record; otherwise taken from each event
    #[serde(default)]
    pub context: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination: DestinationConfig::default(),
            credentials: CredentialsConfig::default(),
            batching: BatchingConfig::default(),
            time_zone: default_time_zone(),
            origin: None,
            context: None,
        }
    }
}

impl Config {
    pub fn time_zone_setting(&self) -> Result<TimeZoneSetting, TimeZoneError> {
        self.time_zone.parse()
    }
}

fn default_time_zone() -> String {
    "system".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            endpoint: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10000
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub access_id: String,
    #[serde(default)]
    pub secret_key: String,
}

// Keep the secret out of logs and panics
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_id", &self.access_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    #[serde(default = "default_granularity_ms")]
    pub granularity_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            granularity_ms: default_granularity_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

fn default_granularity_ms() -> u64 {
    10000
}

fn default_shutdown_timeout_ms() -> u64 {
    30000
}
