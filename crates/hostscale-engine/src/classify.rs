//! Host classification: group membership, scale-state, removal priority.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use hostscale_core::*;

use crate::snapshot::{HostInfo, elapsed_exceeds};

/// Scale-state of an in-scope host. Declaration order is removal
/// priority: deactivating hosts go first, healthy hosts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleState {
    Deactivating,
    Unhealthy,
    Healthy,
}

impl fmt::Display for ScaleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleState::Deactivating => "DEACTIVATING",
            ScaleState::Unhealthy => "UNHEALTHY",
            ScaleState::Healthy => "HEALTHY",
        })
    }
}

/// An in-scope host with its derived scale-state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHost {
    pub info: HostInfo,
    pub state: ScaleState,
}

/// Hosts sorted into the queues the executor works through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Members of the host group, in removal-priority order.
    pub in_scope: Vec<ScoredHost>,
    /// Inactive hosts to remove from the cluster.
    pub cleanup: Vec<HostInfo>,
    /// Backend hosts down for too long, deactivated regardless of membership.
    pub forced_down: Vec<HostInfo>,
}

fn belongs_by_instance(host: &HostInfo, group: &HostGroupInfo) -> bool {
    group.has_instance_id(host.host.instance_id())
}

fn belongs_by_ip(host: &HostInfo, group: &HostGroupInfo) -> bool {
    group.instance_by_ip(&host.host.host_ip).is_some()
}

/// Split the snapshot's hosts into in-scope, cleanup and forced-down sets.
pub fn classify(
    hosts: BTreeMap<HostId, HostInfo>,
    group: &HostGroupInfo,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Classification {
    let backend = group.role.is_backend();
    let mut in_scope = Vec::new();
    let mut cleanup = Vec::new();
    let mut forced_down = Vec::new();

    for host in hosts.into_values() {
        let state = host.host.state;
        let down = host.host.status == Status::Down;

        if backend
            && state != HostState::Inactive
            && down
            && host.management_down_longer_than(thresholds.down_kickout_timeout, now)
        {
            info!(host_id = %host.id, ip = %host.host.host_ip, "host down for too long, kicking out");
            forced_down.push(host.clone());
        }

        if state == HostState::Inactive {
            if belongs_by_ip(&host, group) {
                cleanup.push(host);
            } else if backend
                && elapsed_exceeds(host.host.state_changed_time, now, thresholds.cleanup_delay)
            {
                // Leftover from an earlier removal that never finished.
                debug!(host_id = %host.id, ip = %host.host.host_ip, "stale inactive host queued for cleanup");
                cleanup.push(host);
            }
        } else if belongs_by_instance(&host, group) {
            in_scope.push(host);
        } else if down && belongs_by_ip(&host, group) {
            // Down hosts can lose their instance id.
            info!(host_id = %host.id, ip = %host.host.host_ip, "including down host by ip");
            in_scope.push(host);
        }
    }

    let mut in_scope: Vec<ScoredHost> = in_scope
        .into_iter()
        .map(|info| {
            let state = derive_scale_state(&info, thresholds, now);
            ScoredHost { info, state }
        })
        .collect();
    sort_by_priority(&mut in_scope);

    Classification {
        in_scope,
        cleanup,
        forced_down,
    }
}

/// Derive the scale-state of a host. First matching rule wins.
pub fn derive_scale_state(host: &HostInfo, thresholds: &Thresholds, now: DateTime<Utc>) -> ScaleState {
    if host.all_drives_being_removed() {
        info!(host_id = %host.id, "marking deactivating, all drives being removed");
        return ScaleState::Deactivating;
    }
    if host.host.state.is_leaving() {
        return ScaleState::Deactivating;
    }
    if host.host.status == Status::Down
        && host.management_down_longer_than(thresholds.unhealthy_timeout, now)
    {
        info!(host_id = %host.id, "marking unhealthy, host down");
        return ScaleState::Unhealthy;
    }
    if host.unhealthy_drive_count() > 0 || host.any_drive_being_removed() {
        info!(host_id = %host.id, "marking unhealthy, unhealthy drives");
        return ScaleState::Unhealthy;
    }
    ScaleState::Healthy
}

/// Removal priority: scale-state, then more unhealthy drives first, then
/// oldest first, then host id.
pub fn priority_cmp(a: &ScoredHost, b: &ScoredHost) -> Ordering {
    a.state
        .cmp(&b.state)
        .then_with(|| {
            b.info
                .unhealthy_drive_count()
                .cmp(&a.info.unhealthy_drive_count())
        })
        .then_with(|| a.info.host.added_time.cmp(&b.info.host.added_time))
        .then_with(|| a.info.id.cmp(&b.info.id))
}

pub fn sort_by_priority(hosts: &mut [ScoredHost]) {
    hosts.sort_by(priority_cmp);
}
