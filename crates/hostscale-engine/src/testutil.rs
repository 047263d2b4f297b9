//! Fixtures shared by the engine's unit tests.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use hostscale_core::*;

use crate::snapshot::HostInfo;

/// Fixed tick time.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn uuid_n(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn raw_host(instance_id: &str, ip: &str) -> Host {
    Host {
        aws: Some(CloudInfo {
            instance_id: instance_id.to_string(),
        }),
        host_ip: ip.to_string(),
        state: HostState::Active,
        status: Status::Up,
        added_time: now() - chrono::Duration::days(1),
        state_changed_time: now() - chrono::Duration::days(1),
    }
}

/// An active, up host without drives or nodes. Later ids were added later.
pub fn host(id: i64, instance_id: &str, ip: &str) -> HostInfo {
    let mut raw = raw_host(instance_id, ip);
    raw.added_time += chrono::Duration::minutes(id);
    HostInfo::new(HostId(id), raw)
}

pub fn drive_of(host_id: HostId, n: u128, status: DriveStatus, should_be_active: bool) -> Drive {
    Drive {
        uuid: uuid_n(n),
        host_id,
        status,
        should_be_active,
    }
}

pub fn node_of(host_id: HostId, status: Status, last_fencing_time: Option<DateTime<Utc>>) -> Node {
    Node {
        host_id,
        status,
        last_fencing_time,
    }
}

pub fn group(instances: &[(&str, &str)]) -> HostGroupInfo {
    HostGroupInfo {
        username: "admin".to_string(),
        password: "admin".to_string(),
        desired_capacity: instances.len(),
        role: HostGroupRole::Backend,
        instances: instances
            .iter()
            .map(|(id, ip)| HgInstance {
                id: id.to_string(),
                private_ip: ip.to_string(),
            })
            .collect(),
        backend_ips: vec!["10.0.0.1".to_string()],
    }
}

/// Builder-style tweaks for `HostInfo` fixtures.
pub trait HostFixture: Sized {
    fn with_drive(self, status: DriveStatus, should_be_active: bool) -> Self;
    fn with_state(self, state: HostState) -> Self;
    fn down_for(self, fenced: Duration) -> Self;
    fn without_instance(self) -> Self;
}

impl HostFixture for HostInfo {
    fn with_drive(mut self, status: DriveStatus, should_be_active: bool) -> Self {
        let n = (self.id.get() as u128) * 1000 + self.drives.len() as u128;
        self.drives.insert(
            DriveId(n as i64),
            drive_of(self.id, n, status, should_be_active),
        );
        self
    }

    fn with_state(mut self, state: HostState) -> Self {
        self.host.state = state;
        self.host.state_changed_time = now() - chrono::Duration::hours(1);
        self
    }

    /// Mark the host down with its management node fenced `fenced` ago.
    fn down_for(mut self, fenced: Duration) -> Self {
        let fenced_at = now() - chrono::Duration::from_std(fenced).unwrap();
        self.host.status = Status::Down;
        self.nodes.insert(
            NodeId(self.id.get() * 100),
            node_of(self.id, Status::Down, Some(fenced_at)),
        );
        self
    }

    fn without_instance(mut self) -> Self {
        self.host.aws = None;
        self
    }
}
