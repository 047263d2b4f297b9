//! Scaler: drives one tick end to end.
//!
//! A tick owns its `Pool` and snapshot; nothing is shared between ticks,
//! so concurrent ticks need no coordination here. Everything up to and
//! including the snapshot is fatal to the tick. Everything after it is
//! best-effort and reported through `TransientErrors`.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;

use hostscale_core::*;
use hostscale_rpc::{Connector, Pool};

use crate::classify::classify;
use crate::error::ScaleResult;
use crate::executor::Executor;
use crate::planner::{Plan, PlanReport};
use crate::response;
use crate::snapshot::ClusterSnapshot;

/// Runs scale ticks against the management plane.
#[derive(Debug, Clone, Default)]
pub struct Scaler {
    thresholds: Thresholds,
}

impl Scaler {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Run one tick: snapshot, classify, plan, then deactivate and clean up.
    pub async fn tick<C, R>(
        &self,
        group: &HostGroupInfo,
        connector: C,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> ScaleResult<ScaleResponse>
    where
        C: Connector,
        R: Rng + ?Sized,
    {
        let mut pool = Pool::new(group.backend_ips.clone(), connector, rng);
        let (snapshot, plan) = self.prepare(&mut pool, group, now).await?;

        let classification = &plan.classification;
        let mut executor = Executor::new(&mut pool);

        for host in &classification.cleanup {
            executor.remove_inactive(host, group).await;
        }
        executor.remove_orphan_drives(&snapshot).await;
        for scored in plan.selected() {
            executor.deactivate(&scored.info).await;
        }
        for host in &classification.forced_down {
            executor.deactivate(host).await;
        }

        let response = response::assemble(&classification.in_scope, executor.finish());
        info!(
            hosts = response.hosts.len(),
            to_terminate = response.to_terminate.len(),
            transient_errors = response.transient_errors.len(),
            "scale tick complete"
        );
        Ok(response)
    }

    /// Everything `tick` would decide, without issuing mutating calls.
    pub async fn plan<C, R>(
        &self,
        group: &HostGroupInfo,
        connector: C,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> ScaleResult<PlanReport>
    where
        C: Connector,
        R: Rng + ?Sized,
    {
        let mut pool = Pool::new(group.backend_ips.clone(), connector, rng);
        let (snapshot, plan) = self.prepare(&mut pool, group, now).await?;
        Ok(plan.report(&snapshot))
    }

    async fn prepare<C: Connector>(
        &self,
        pool: &mut Pool<C>,
        group: &HostGroupInfo,
        now: DateTime<Utc>,
    ) -> ScaleResult<(ClusterSnapshot, Plan)> {
        let mut snapshot = ClusterSnapshot::fetch(pool, group.role).await?;
        let hosts = std::mem::take(&mut snapshot.hosts);
        let classification = classify(hosts, group, &self.thresholds, now);

        info!(
            in_scope = classification.in_scope.len(),
            cleanup = classification.cleanup.len(),
            forced_down = classification.forced_down.len(),
            "hosts classified"
        );

        Ok((snapshot, Plan::new(classification, group.desired_capacity)))
    }
}
