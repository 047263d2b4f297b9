//! Deactivation planner.
//!
//! ```text
//! H - healthy hosts        U - unhealthy hosts
//! D - deactivating hosts   T - desired capacity
//!
//! target = max(D, max(H + U + D - T, min(2 - D, U)))
//! ```
//!
//! `H + U + D - T` sheds capacity above the desired size. `min(2 - D, U)`
//! lets at most two hosts be deactivating at once for health reasons.
//! The outer `max(D, ..)` keeps hosts already in progress selected. The
//! first `target` hosts in priority order are deactivated this tick.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use hostscale_core::{HostId, HostState};

use crate::classify::{Classification, ScaleState, ScoredHost};
use crate::snapshot::ClusterSnapshot;

/// Host counts per scale-state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub healthy: usize,
    pub unhealthy: usize,
    pub deactivating: usize,
}

impl StateCounts {
    pub fn of(hosts: &[ScoredHost]) -> Self {
        let mut counts = Self::default();
        for host in hosts {
            match host.state {
                ScaleState::Healthy => counts.healthy += 1,
                ScaleState::Unhealthy => counts.unhealthy += 1,
                ScaleState::Deactivating => counts.deactivating += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.healthy + self.unhealthy + self.deactivating
    }
}

/// Number of hosts that should be deactivating after this tick.
///
/// Never below `deactivating` and never above the number of hosts.
pub fn deactivate_target(healthy: usize, unhealthy: usize, deactivating: usize, desired: usize) -> usize {
    let (h, u, d, t) = (
        healthy as i64,
        unhealthy as i64,
        deactivating as i64,
        desired as i64,
    );
    let surplus = h + u + d - t;
    let health_budget = (2 - d).min(u);
    d.max(surplus.max(health_budget)) as usize
}

/// The tick's decision: classified hosts plus how many of them to act on.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub counts: StateCounts,
    pub desired: usize,
    pub target: usize,
    pub classification: Classification,
}

impl Plan {
    pub fn new(classification: Classification, desired: usize) -> Self {
        let counts = StateCounts::of(&classification.in_scope);
        let target = deactivate_target(
            counts.healthy,
            counts.unhealthy,
            counts.deactivating,
            desired,
        )
        .min(classification.in_scope.len());

        info!(
            target,
            healthy = counts.healthy,
            unhealthy = counts.unhealthy,
            deactivating = counts.deactivating,
            desired,
            "hosts set to deactivate"
        );

        Self {
            counts,
            desired,
            target,
            classification,
        }
    }

    /// Hosts selected for deactivation, highest priority first.
    pub fn selected(&self) -> &[ScoredHost] {
        &self.classification.in_scope[..self.target]
    }

    /// Serializable summary, used for dry runs.
    pub fn report(&self, snapshot: &ClusterSnapshot) -> PlanReport {
        let hosts = self
            .classification
            .in_scope
            .iter()
            .enumerate()
            .map(|(rank, scored)| PlannedHost {
                host_id: scored.info.id,
                instance_id: scored.info.host.instance_id().to_string(),
                host_ip: scored.info.host.host_ip.clone(),
                reported_state: scored.info.host.state,
                scale_state: scored.state,
                unhealthy_drives: scored.info.unhealthy_drive_count(),
                selected: rank < self.target,
            })
            .collect();

        PlanReport {
            counts: self.counts,
            desired: self.desired,
            target: self.target,
            hosts,
            cleanup: self.classification.cleanup.iter().map(|h| h.id).collect(),
            forced_down: self.classification.forced_down.iter().map(|h| h.id).collect(),
            orphan_drives: snapshot.orphan_drives().map(|d| d.uuid).collect(),
        }
    }
}

/// One in-scope host in a `PlanReport`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedHost {
    pub host_id: HostId,
    pub instance_id: String,
    pub host_ip: String,
    pub reported_state: HostState,
    pub scale_state: ScaleState,
    pub unhealthy_drives: usize,
    pub selected: bool,
}

/// What a tick would do, without doing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub counts: StateCounts,
    pub desired: usize,
    pub target: usize,
    pub hosts: Vec<PlannedHost>,
    pub cleanup: Vec<HostId>,
    pub forced_down: Vec<HostId>,
    pub orphan_drives: Vec<Uuid>,
}
