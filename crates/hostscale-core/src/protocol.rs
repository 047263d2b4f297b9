//! Scheduler protocol: what a tick receives and what it returns.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{HostId, HostState};

/// One member of the cloud host group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HgInstance {
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    #[serde(rename = "PrivateIp", alias = "private_ip")]
    pub private_ip: String,
}

/// Role a host group fulfils for the storage cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostGroupRole {
    Backend,
    Client,
}

impl HostGroupRole {
    pub fn is_backend(self) -> bool {
        self == HostGroupRole::Backend
    }
}

/// Input of a single tick.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct HostGroupInfo {
    pub username: String,
    pub password: String,
    pub desired_capacity: usize,
    pub role: HostGroupRole,
    #[serde(default)]
    pub instances: Vec<HgInstance>,
    /// Candidate management endpoints.
    #[serde(default)]
    pub backend_ips: Vec<String>,
}

impl HostGroupInfo {
    pub fn has_instance_id(&self, instance_id: &str) -> bool {
        !instance_id.is_empty() && self.instances.iter().any(|i| i.id == instance_id)
    }

    pub fn instance_by_ip(&self, ip: &str) -> Option<&HgInstance> {
        self.instances.iter().find(|i| i.private_ip == ip)
    }
}

impl fmt::Debug for HostGroupInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostGroupInfo")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("desired_capacity", &self.desired_capacity)
            .field("role", &self.role)
            .field("instances", &self.instances)
            .field("backend_ips", &self.backend_ips)
            .finish()
    }
}

/// Mutating operations whose failures end up in `TransientErrors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientOp {
    DeactivateDrive,
    DeactivateHost,
    RemoveInactive,
    RemoveDrive,
}

impl fmt::Display for TransientOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransientOp::DeactivateDrive => "deactivateDrive",
            TransientOp::DeactivateHost => "deactivateHost",
            TransientOp::RemoveInactive => "removeInactive",
            TransientOp::RemoveDrive => "removeDrive",
        })
    }
}

/// A host in the tick's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleResponseHost {
    pub instance_id: String,
    #[serde(rename = "status")]
    pub state: HostState,
    pub added_time: DateTime<Utc>,
    pub host_id: HostId,
}

/// Output of a single tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleResponse {
    pub hosts: Vec<ScaleResponseHost>,
    pub to_terminate: Vec<HgInstance>,
    #[serde(rename = "TransientErrors", default)]
    pub transient_errors: Vec<String>,
}

impl ScaleResponse {
    pub fn add_transient_error(&mut self, op: TransientOp, err: &dyn fmt::Display) {
        self.transient_errors.push(format!("{op}:{err}"));
    }
}
