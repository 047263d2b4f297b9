//! Cluster snapshot: the tick's relational view of hosts, drives and nodes.
//!
//! Built from a fixed, fail-fast RPC sequence:
//!
//! ```text
//! status → gate check → hosts_list → disks_list (backend only) → nodes_list
//! ```
//!
//! Drives and nodes are attached to their owning host when that host is
//! in the listing and left out of per-host accounting otherwise. Every
//! drive is also kept in a global map for orphan cleanup.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use hostscale_core::*;
use hostscale_rpc::{Connector, Pool};

use crate::error::{ScaleError, ScaleResult};

/// A host joined with its drives and nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct HostInfo {
    pub id: HostId,
    pub host: Host,
    pub drives: DriveList,
    pub nodes: NodeList,
}

impl HostInfo {
    pub fn new(id: HostId, host: Host) -> Self {
        Self {
            id,
            host,
            drives: DriveList::new(),
            nodes: NodeList::new(),
        }
    }

    /// Drives reporting `INACTIVE`.
    pub fn unhealthy_drive_count(&self) -> usize {
        self.drives.values().filter(|d| d.is_inactive()).count()
    }

    /// At least one drive, and every drive is marked for removal.
    pub fn all_drives_being_removed(&self) -> bool {
        !self.drives.is_empty() && self.drives.values().all(|d| !d.should_be_active)
    }

    pub fn any_drive_being_removed(&self) -> bool {
        self.drives.values().any(|d| !d.should_be_active)
    }

    /// Every drive reports `INACTIVE`. True for a host without drives.
    pub fn all_drives_inactive(&self) -> bool {
        self.drives.values().all(|d| d.is_inactive())
    }

    /// Some management node of this host is down and was fenced more than
    /// `timeout` before `now`.
    pub fn management_down_longer_than(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        self.nodes.iter().any(|(node_id, node)| {
            node_id.is_management()
                && node.status == Status::Down
                && node
                    .last_fencing_time
                    .is_some_and(|fenced| elapsed_exceeds(fenced, now, timeout))
        })
    }
}

/// `now - since > limit`. A `since` in the future never exceeds.
pub fn elapsed_exceeds(since: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> bool {
    (now - since).to_std().is_ok_and(|elapsed| elapsed > limit)
}

/// Everything one tick knows about the cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterSnapshot {
    pub hosts: BTreeMap<HostId, HostInfo>,
    /// All drives, including those whose owner is missing or orphaned.
    pub drives: DriveList,
}

impl ClusterSnapshot {
    /// Query the management plane and assemble a snapshot.
    pub async fn fetch<C: Connector>(
        pool: &mut Pool<C>,
        role: HostGroupRole,
    ) -> ScaleResult<Self> {
        let status = pool.status().await?;
        check_allowed(&status)?;

        let hosts = pool.hosts_list().await?;
        let drives = if role.is_backend() {
            pool.drives_list().await?
        } else {
            DriveList::new()
        };
        let nodes = pool.nodes_list().await?;

        debug!(
            hosts = hosts.len(),
            drives = drives.len(),
            nodes = nodes.len(),
            "cluster listings fetched"
        );
        Ok(Self::assemble(hosts, drives, nodes))
    }

    /// Join the three listings by owning host id.
    pub fn assemble(hosts: HostList, drives: DriveList, nodes: NodeList) -> Self {
        let mut joined: BTreeMap<HostId, HostInfo> = hosts
            .into_iter()
            .map(|(id, host)| (id, HostInfo::new(id, host)))
            .collect();

        for (drive_id, drive) in &drives {
            if let Some(host) = joined.get_mut(&drive.host_id) {
                host.drives.insert(*drive_id, drive.clone());
            }
        }

        for (node_id, node) in nodes {
            if let Some(host) = joined.get_mut(&node.host_id) {
                host.nodes.insert(node_id, node);
            }
        }

        Self {
            hosts: joined,
            drives,
        }
    }

    /// Inactive drives no host owns any more.
    pub fn orphan_drives(&self) -> impl Iterator<Item = &Drive> {
        self.drives
            .values()
            .filter(|d| d.host_id.is_orphan() && d.is_inactive())
    }
}

/// Refuse to scale while IO is not started or an upgrade is running.
pub fn check_allowed(status: &SystemStatus) -> ScaleResult<()> {
    if !status.io_started() {
        return Err(ScaleError::NotAllowed(format!(
            "io status: {}, aborting scale",
            status.io_status
        )));
    }
    if status.upgrade_in_progress() {
        return Err(ScaleError::NotAllowed(
            "upgrade is running, aborting scale".to_string(),
        ));
    }
    Ok(())
}
