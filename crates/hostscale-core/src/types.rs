//! Management-plane wire types.
//!
//! These mirror the JSON the storage cluster's management API returns
//! for `status`, `hosts_list`, `disks_list` and `nodes_list`. Listings are
//! objects keyed by tagged ids (`"HostId<3>"`, `"DiskId<17>"`,
//! `"NodeId<300>"`), decoded here into ordered maps so that every pass
//! over a snapshot visits entries in the same order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A tagged id string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {tag}<N>, got {value:?}")]
pub struct ParseIdError {
    pub tag: &'static str,
    pub value: String,
}

/// Parse `Tag<N>`, falling back to a bare integer.
fn parse_tagged(s: &str, tag: &str) -> Option<i64> {
    s.strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix('<'))
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(|n| n.parse().ok())
        .or_else(|| s.trim().parse().ok())
}

macro_rules! tagged_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}<{}>", $tag, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_tagged(s, $tag).map($name).ok_or_else(|| ParseIdError {
                    tag: $tag,
                    value: s.to_string(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct IdVisitor;

                impl<'de> Visitor<'de> for IdVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "a {}<N> string or an integer", $tag)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<$name, E> {
                        v.parse().map_err(E::custom)
                    }

                    fn visit_i64<E: de::Error>(self, v: i64) -> Result<$name, E> {
                        Ok($name(v))
                    }

                    fn visit_u64<E: de::Error>(self, v: u64) -> Result<$name, E> {
                        i64::try_from(v).map($name).map_err(E::custom)
                    }
                }

                deserializer.deserialize_any(IdVisitor)
            }
        }
    };
}

tagged_id!(
    /// Cluster-internal host id, `HostId<N>` on the wire.
    HostId,
    "HostId"
);

tagged_id!(
    /// Drive id, `DiskId<N>` on the wire.
    DriveId,
    "DiskId"
);

tagged_id!(
    /// Process node id, `NodeId<N>` on the wire.
    NodeId,
    "NodeId"
);

impl HostId {
    /// Owner recorded on drives that no longer belong to any host.
    pub const ORPHAN: HostId = HostId(-1);

    pub fn is_orphan(self) -> bool {
        self == Self::ORPHAN
    }
}

impl NodeId {
    /// The management process occupies slot 0 of every host's node range.
    pub fn is_management(self) -> bool {
        self.0 % 100 == 0
    }
}

// ── Enums ─────────────────────────────────────────────────────────

/// Management-plane lifecycle state of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostState {
    Active,
    Inactive,
    Deactivating,
    Removing,
    #[serde(other)]
    Unknown,
}

impl HostState {
    pub fn as_str(self) -> &'static str {
        match self {
            HostState::Active => "ACTIVE",
            HostState::Inactive => "INACTIVE",
            HostState::Deactivating => "DEACTIVATING",
            HostState::Removing => "REMOVING",
            HostState::Unknown => "UNKNOWN",
        }
    }

    /// Whether the host is already on its way out of the cluster.
    pub fn is_leaving(self) -> bool {
        matches!(
            self,
            HostState::Deactivating | HostState::Removing | HostState::Inactive
        )
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status of a host or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Up,
    Down,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Up => "UP",
            Status::Down => "DOWN",
            Status::Unknown => "UNKNOWN",
        })
    }
}

/// Drive status. Only `INACTIVE` drives factor into scaling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriveStatus {
    Active,
    Inactive,
    #[serde(other)]
    Other,
}

// ── Records ───────────────────────────────────────────────────────

/// Cloud metadata attached to a host. Absent on hosts that went down
/// before the management plane learned their instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudInfo {
    #[serde(default)]
    pub instance_id: String,
}

/// A host as reported by `hosts_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    #[serde(default)]
    pub aws: Option<CloudInfo>,
    pub host_ip: String,
    pub state: HostState,
    pub status: Status,
    pub added_time: DateTime<Utc>,
    pub state_changed_time: DateTime<Utc>,
}

impl Host {
    /// Cloud instance id, empty when unknown.
    pub fn instance_id(&self) -> &str {
        self.aws
            .as_ref()
            .map(|aws| aws.instance_id.as_str())
            .unwrap_or_default()
    }
}

/// A drive as reported by `disks_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub uuid: Uuid,
    pub host_id: HostId,
    pub status: DriveStatus,
    pub should_be_active: bool,
}

impl Drive {
    pub fn is_inactive(&self) -> bool {
        self.status == DriveStatus::Inactive
    }
}

/// A process node as reported by `nodes_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub host_id: HostId,
    pub status: Status,
    #[serde(default)]
    pub last_fencing_time: Option<DateTime<Utc>>,
}

/// Subset of the `status` response consulted before scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub io_status: String,
    #[serde(default)]
    pub upgrade: Option<String>,
}

impl SystemStatus {
    pub fn io_started(&self) -> bool {
        self.io_status == "STARTED"
    }

    pub fn upgrade_in_progress(&self) -> bool {
        self.upgrade.as_deref().is_some_and(|u| !u.is_empty())
    }
}

pub type HostList = BTreeMap<HostId, Host>;
pub type DriveList = BTreeMap<DriveId, Drive>;
pub type NodeList = BTreeMap<NodeId, Node>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_ids_roundtrip_through_display() {
        assert_eq!(HostId(7).to_string(), "HostId<7>");
        assert_eq!("HostId<7>".parse::<HostId>().unwrap(), HostId(7));
        assert_eq!("DiskId<-1>".parse::<DriveId>().unwrap(), DriveId(-1));
        assert_eq!("42".parse::<NodeId>().unwrap(), NodeId(42));
        assert!("NodeId<x>".parse::<NodeId>().is_err());
    }

    #[test]
    fn management_node_is_slot_zero() {
        assert!(NodeId(300).is_management());
        assert!(NodeId(0).is_management());
        assert!(!NodeId(301).is_management());
    }

    #[test]
    fn host_list_decodes_tagged_keys() {
        let json = r#"{
            "HostId<1>": {
                "aws": {"instance_id": "i-aaa"},
                "host_ip": "10.0.0.1",
                "state": "ACTIVE",
                "status": "UP",
                "added_time": "2024-01-01T00:00:00Z",
                "state_changed_time": "2024-01-01T00:00:00Z"
            },
            "HostId<0>": {
                "aws": null,
                "host_ip": "10.0.0.2",
                "state": "SOMETHING_NEW",
                "status": "DOWN",
                "added_time": "2024-01-01T00:00:00Z",
                "state_changed_time": "2024-01-01T00:00:00Z"
            }
        }"#;
        let hosts: HostList = serde_json::from_str(json).unwrap();
        let ids: Vec<_> = hosts.keys().copied().collect();
        assert_eq!(ids, vec![HostId(0), HostId(1)]);
        assert_eq!(hosts[&HostId(1)].instance_id(), "i-aaa");
        assert_eq!(hosts[&HostId(0)].instance_id(), "");
        assert_eq!(hosts[&HostId(0)].state, HostState::Unknown);
    }

    #[test]
    fn orphan_drive_decodes() {
        let json = r#"{
            "DiskId<5>": {
                "uuid": "6a1b8c4e-2f3d-4e5f-8a9b-0c1d2e3f4a5b",
                "host_id": "HostId<-1>",
                "status": "INACTIVE",
                "should_be_active": false
            }
        }"#;
        let drives: DriveList = serde_json::from_str(json).unwrap();
        let drive = &drives[&DriveId(5)];
        assert!(drive.host_id.is_orphan());
        assert!(drive.is_inactive());
    }

    #[test]
    fn system_status_upgrade_flag() {
        let idle: SystemStatus =
            serde_json::from_str(r#"{"io_status": "STARTED", "upgrade": ""}"#).unwrap();
        assert!(idle.io_started());
        assert!(!idle.upgrade_in_progress());

        let upgrading: SystemStatus =
            serde_json::from_str(r#"{"io_status": "STARTED", "upgrade": "4.2.1"}"#).unwrap();
        assert!(upgrading.upgrade_in_progress());

        let missing: SystemStatus = serde_json::from_str(r#"{"io_status": "STOPPED"}"#).unwrap();
        assert!(!missing.io_started());
        assert!(!missing.upgrade_in_progress());
    }
}
