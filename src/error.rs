// Error taxonomy for scanforge
// Every failure a plugin can report is a named variant, so callers can tell
// "nothing found" apart from "the probe never ran". None of these are fatal to
// a scan; only `ConfigError` and `TargetError` stop the binary.

use thiserror::Error;

/// Outbound request failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Other(String),
}

/// Failures inside a single detector's scan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("Probe transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Detector fault: {0}")]
    Internal(String),
}

/// Model provider failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Model backend unavailable: {0}")]
    Unavailable(String),
}

/// Training data source failures
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Remote feed failed: {0}")]
    Remote(#[from] TransportError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode training data: {0}")]
    Decode(String),

    #[error("'{0}' is not a valid training category name")]
    InvalidCategory(String),
}

/// Reasons a plugin is refused by a registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Plugin name must not be empty")]
    EmptyName,

    #[error("Plugin '{name}' does not implement the {expected} contract (got {actual})")]
    ContractMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Configuration problems, reported before any scan starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

/// A target locator that cannot be scanned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("'{0}' is not a valid URL: {1}")]
    Malformed(String, String),

    #[error("'{0}' has no host")]
    MissingHost(String),
}
