//! hostscale.toml configuration parser.
//!
//! Every field is optional; an empty file yields the defaults. Durations
//! are strings like `"30s"`, `"5m"`, `"3h"` or `"500ms"`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default JSON-RPC port of the management plane.
pub const DEFAULT_RPC_PORT: u16 = 14000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostscaleConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub scale: ScaleConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub port: u16,
    /// Per-call timeout, including connection setup.
    pub timeout: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_RPC_PORT,
            timeout: "30s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Management node down for longer than this marks the host unhealthy.
    pub unhealthy_timeout: String,
    /// Inactive hosts outside the group are removed after this long.
    pub cleanup_delay: String,
    /// Backend hosts down for longer than this are deactivated regardless
    /// of group membership.
    pub down_kickout_timeout: String,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            unhealthy_timeout: "120m".to_string(),
            cleanup_delay: "5m".to_string(),
            down_kickout_timeout: "3h".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Resolved timing thresholds used by the host classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub unhealthy_timeout: Duration,
    pub cleanup_delay: Duration,
    pub down_kickout_timeout: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            unhealthy_timeout: Duration::from_secs(120 * 60),
            cleanup_delay: Duration::from_secs(5 * 60),
            down_kickout_timeout: Duration::from_secs(3 * 60 * 60),
        }
    }
}

impl HostscaleConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: HostscaleConfig = toml::from_str(content)?;
        config.thresholds()?;
        config.rpc_timeout()?;
        Ok(config)
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Ok(Thresholds {
            unhealthy_timeout: duration_field("scale.unhealthy_timeout", &self.scale.unhealthy_timeout)?,
            cleanup_delay: duration_field("scale.cleanup_delay", &self.scale.cleanup_delay)?,
            down_kickout_timeout: duration_field(
                "scale.down_kickout_timeout",
                &self.scale.down_kickout_timeout,
            )?,
        })
    }

    pub fn rpc_timeout(&self) -> Result<Duration, ConfigError> {
        duration_field("rpc.timeout", &self.rpc.timeout)
    }
}

fn duration_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

/// Parse a duration string like "500ms", "5s", "2m", "3h".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok()?.checked_mul(60).map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>().ok()?.checked_mul(3600).map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
