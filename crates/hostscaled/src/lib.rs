//! hostscaled: scheduler-facing surface of hostscale.
//!
//! The binary runs a single tick from a JSON document (`tick`), prints
//! what a tick would do (`plan`), or serves both over HTTP (`serve`).
//! Each tick opens its own connections to the management plane with
//! the credentials carried in its `HostGroupInfo`.

pub mod api;

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use hostscale_core::{HostGroupInfo, HostscaleConfig};
use hostscale_rpc::{Connector, HttpConnector};

/// Config file picked up from the working directory when `--config` is
/// not given.
pub const DEFAULT_CONFIG_FILE: &str = "hostscale.toml";

/// Builds a tick's connector from the group it is scaling.
pub trait ConnectorFactory: Send + Sync + 'static {
    type Connector: Connector;

    fn connector_for(&self, group: &HostGroupInfo) -> Self::Connector;
}

/// JSON-RPC over HTTP to the management plane.
#[derive(Debug, Clone)]
pub struct HttpConnectorFactory {
    pub port: u16,
    pub timeout: Duration,
}

impl HttpConnectorFactory {
    pub fn from_config(config: &HostscaleConfig) -> anyhow::Result<Self> {
        Ok(Self {
            port: config.rpc.port,
            timeout: config.rpc_timeout()?,
        })
    }
}

impl ConnectorFactory for HttpConnectorFactory {
    type Connector = HttpConnector;

    fn connector_for(&self, group: &HostGroupInfo) -> HttpConnector {
        HttpConnector::new(self.port, &group.username, &group.password).with_timeout(self.timeout)
    }
}

/// Load `path`, or `hostscale.toml` if present, or the built-in defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HostscaleConfig> {
    match path {
        Some(path) => HostscaleConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            HostscaleConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("failed to load {DEFAULT_CONFIG_FILE}"))
        }
        None => Ok(HostscaleConfig::default()),
    }
}

/// Read a `HostGroupInfo` document from a file, or stdin for `-`.
pub fn read_group(input: &str) -> anyhow::Result<HostGroupInfo> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read host group from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };
    parse_group(&raw)
}

pub fn parse_group(raw: &str) -> anyhow::Result<HostGroupInfo> {
    let group: HostGroupInfo = serde_json::from_str(raw).context("invalid host group document")?;
    validate_group(&group).map_err(anyhow::Error::msg)?;
    Ok(group)
}

/// Reject documents a tick cannot possibly act on.
pub fn validate_group(group: &HostGroupInfo) -> Result<(), String> {
    if !group.backend_ips.iter().any(|ip| !ip.is_empty()) {
        return Err("backend_ips must name at least one management endpoint".to_string());
    }
    Ok(())
}
