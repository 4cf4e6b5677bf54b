// Runtime configuration
// Loaded from an optional TOML file. Every section has defaults so an empty
// file (or no file) yields a working setup; validate() runs before anything
// touches the network.

use crate::error::ConfigError;
use crate::mutator::builtin_technique;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_CACHE_DIR: &str = "training_data_cache";

/// Candidate names probed when no discovery logic is plugged in
pub const DEFAULT_PARAMETERS: &[&str] = &["id", "page", "file", "cmd", "search", "query"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub discovery: DiscoveryConfig,
    pub evasion: EvasionConfig,
    pub training: TrainingConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept: String,
    /// Method used for probes
    pub method: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            method: "GET".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub parameters: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            parameters: DEFAULT_PARAMETERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvasionConfig {
    /// Extra built-in techniques appended after the base three
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub cache_dir: PathBuf,
    /// Remote feed; empty means the bundled sample corpus
    pub api_url: String,
    pub api_key: String,
    /// Optional directory of `<category>.txt` files; an empty string means none
    #[serde(deserialize_with = "empty_path_as_none")]
    pub local_dir: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            api_url: String::new(),
            api_key: String::new(),
            local_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Detector kinds to run; empty runs every registered detector
    pub kinds: Vec<String>,
}

impl Config {
    /// Load and validate configuration. `None` gives validated defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => {
                let contents = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.display().to_string(),
                    source,
                })?;
                let config = Self::from_toml(&contents)?;
                tracing::info!("Loaded configuration from {:?}", p);
                config
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.timeout_secs == 0 {
            return Err(invalid("transport.timeout_secs", "must be greater than zero"));
        }
        if self.transport.user_agent.trim().is_empty() {
            return Err(invalid("transport.user_agent", "must not be empty"));
        }
        if reqwest::Method::from_bytes(self.transport.method.as_bytes()).is_err() {
            return Err(invalid(
                "transport.method",
                &format!("'{}' is not an HTTP method", self.transport.method),
            ));
        }
        if self.discovery.parameters.iter().all(|p| p.trim().is_empty()) {
            return Err(invalid("discovery.parameters", "needs at least one name"));
        }
        for name in &self.evasion.extra {
            if builtin_technique(name).is_none() {
                return Err(invalid(
                    "evasion.extra",
                    &format!("unknown technique '{}'", name),
                ));
            }
        }
        if !self.training.api_url.is_empty() && url::Url::parse(&self.training.api_url).is_err() {
            return Err(invalid("training.api_url", "is not a valid URL"));
        }
        Ok(())
    }
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let path = Option::<PathBuf>::deserialize(deserializer)?;
    Ok(path.filter(|p| !p.as_os_str().is_empty()))
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
