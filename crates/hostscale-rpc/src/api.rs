//! Typed management-plane calls on top of `Pool`.

use serde::Serialize;
use uuid::Uuid;

use hostscale_core::{DriveList, HostId, HostList, NodeList, SystemStatus};

use crate::client::Connector;
use crate::error::RpcResult;
use crate::pool::Pool;

/// JSON-RPC method names.
pub mod method {
    pub const STATUS: &str = "status";
    pub const HOSTS_LIST: &str = "hosts_list";
    pub const DRIVES_LIST: &str = "disks_list";
    pub const NODES_LIST: &str = "nodes_list";
    pub const DEACTIVATE_DRIVES: &str = "cluster_deactivate_drives";
    pub const DEACTIVATE_HOSTS: &str = "cluster_deactivate_hosts";
    pub const REMOVE_HOST: &str = "cluster_remove_host";
    pub const REMOVE_DRIVES: &str = "cluster_remove_drives";
}

#[derive(Serialize)]
struct NoParams {}

#[derive(Serialize)]
struct DriveUuids<'a> {
    drive_uuids: &'a [Uuid],
}

#[derive(Serialize)]
struct DeactivateHosts<'a> {
    host_ids: &'a [HostId],
    skip_resource_validation: bool,
}

#[derive(Serialize)]
struct RemoveHost {
    host_id: i64,
    no_wait: bool,
}

impl<C: Connector> Pool<C> {
    pub async fn status(&mut self) -> RpcResult<SystemStatus> {
        self.call(method::STATUS, &NoParams {}).await
    }

    pub async fn hosts_list(&mut self) -> RpcResult<HostList> {
        self.call(method::HOSTS_LIST, &NoParams {}).await
    }

    pub async fn drives_list(&mut self) -> RpcResult<DriveList> {
        self.call(method::DRIVES_LIST, &NoParams {}).await
    }

    pub async fn nodes_list(&mut self) -> RpcResult<NodeList> {
        self.call(method::NODES_LIST, &NoParams {}).await
    }

    pub async fn deactivate_drives(&mut self, drive_uuids: &[Uuid]) -> RpcResult<()> {
        self.call_ack(method::DEACTIVATE_DRIVES, &DriveUuids { drive_uuids })
            .await
    }

    pub async fn deactivate_hosts(
        &mut self,
        host_ids: &[HostId],
        skip_resource_validation: bool,
    ) -> RpcResult<()> {
        let params = DeactivateHosts {
            host_ids,
            skip_resource_validation,
        };
        self.call_ack(method::DEACTIVATE_HOSTS, &params).await
    }

    /// Remove a host. With `no_wait` the call returns before the removal
    /// completes.
    pub async fn remove_host(&mut self, host_id: HostId, no_wait: bool) -> RpcResult<()> {
        let params = RemoveHost {
            host_id: host_id.get(),
            no_wait,
        };
        self.call_ack(method::REMOVE_HOST, &params).await
    }

    pub async fn remove_drives(&mut self, drive_uuids: &[Uuid]) -> RpcResult<()> {
        self.call_ack(method::REMOVE_DRIVES, &DriveUuids { drive_uuids })
            .await
    }
}
