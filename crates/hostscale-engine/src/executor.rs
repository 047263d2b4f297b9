//! Lifecycle executor: the only part of a tick that mutates the cluster.
//!
//! Every failure here is recorded as a tagged transient error on the
//! response and processing moves on to the next host or drive. The next
//! tick retries whatever did not go through.

use std::collections::HashSet;

use tracing::{error, info};

use hostscale_core::*;
use hostscale_rpc::{Connector, Pool};

use crate::snapshot::{ClusterSnapshot, HostInfo};

/// Issues deactivate/remove calls over a tick's pool.
pub struct Executor<'a, C: Connector> {
    pool: &'a mut Pool<C>,
    response: ScaleResponse,
    deactivated: HashSet<HostId>,
}

impl<'a, C: Connector> Executor<'a, C> {
    pub fn new(pool: &'a mut Pool<C>) -> Self {
        Self {
            pool,
            response: ScaleResponse::default(),
            deactivated: HashSet::new(),
        }
    }

    /// Remove an inactive host from the cluster and nominate its instance
    /// for termination.
    pub async fn remove_inactive(&mut self, host: &HostInfo, group: &HostGroupInfo) {
        info!(host_id = %host.id, ip = %host.host.host_ip, "removing inactive host");
        self.pool.drop_endpoint(&host.host.host_ip);

        if let Err(e) = self.pool.remove_host(host.id, true).await {
            error!(host_id = %host.id, error = %e, "failed to remove inactive host");
            self.response
                .add_transient_error(TransientOp::RemoveInactive, &e);
            return;
        }

        if let Some(instance) = group.instance_by_ip(&host.host.host_ip)
            && !self.response.to_terminate.contains(instance)
        {
            self.response.to_terminate.push(instance.clone());
        }

        for drive in host.drives.values() {
            self.remove_drive(drive).await;
        }
    }

    /// Remove inactive drives that no host owns.
    pub async fn remove_orphan_drives(&mut self, snapshot: &ClusterSnapshot) {
        for drive in snapshot.orphan_drives() {
            info!(drive = %drive.uuid, "removing orphan drive");
            self.remove_drive(drive).await;
        }
    }

    /// Deactivate a host's remaining drives, then the host itself once all
    /// of its drives are inactive. Repeated calls for the same host are
    /// ignored.
    pub async fn deactivate(&mut self, host: &HostInfo) {
        if !self.deactivated.insert(host.id) {
            return;
        }
        info!(host_id = %host.id, ip = %host.host.host_ip, "deactivating host");

        for drive in host.drives.values().filter(|d| d.should_be_active) {
            if let Err(e) = self.pool.deactivate_drives(&[drive.uuid]).await {
                error!(host_id = %host.id, drive = %drive.uuid, error = %e, "failed to deactivate drive");
                self.response
                    .add_transient_error(TransientOp::DeactivateDrive, &e);
            }
        }

        if host.all_drives_inactive() {
            self.pool.drop_endpoint(&host.host.host_ip);
            if let Err(e) = self.pool.deactivate_hosts(&[host.id], false).await {
                error!(host_id = %host.id, error = %e, "failed to deactivate host");
                self.response
                    .add_transient_error(TransientOp::DeactivateHost, &e);
            }
        }
    }

    async fn remove_drive(&mut self, drive: &Drive) {
        if let Err(e) = self.pool.remove_drives(&[drive.uuid]).await {
            error!(drive = %drive.uuid, error = %e, "failed to remove drive");
            self.response.add_transient_error(TransientOp::RemoveDrive, &e);
        }
    }

    /// Terminate candidates and transient errors gathered so far.
    pub fn finish(self) -> ScaleResponse {
        self.response
    }
}
