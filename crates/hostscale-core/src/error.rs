//! Error types for configuration and resource reconciliation.

use thiserror::Error;

/// Errors raised while loading or resolving `hostscale.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for `{field}`: {value:?}")]
    InvalidDuration { field: &'static str, value: String },
}

/// Errors surfaced by a provisioning backend.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("fetch {kind} {name}: {message}")]
    Fetch {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("create {kind} {name}: {message}")]
    Create {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("update {kind} {name}: {message}")]
    Update {
        kind: &'static str,
        name: String,
        message: String,
    },
}
