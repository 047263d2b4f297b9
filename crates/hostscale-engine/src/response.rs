//! Response assembly.

use hostscale_core::{ScaleResponse, ScaleResponseHost};

use crate::classify::ScoredHost;

/// Output entries for in-scope hosts, keeping their priority order.
pub fn host_entries(in_scope: &[ScoredHost]) -> Vec<ScaleResponseHost> {
    in_scope
        .iter()
        .map(|scored| ScaleResponseHost {
            instance_id: scored.info.host.instance_id().to_string(),
            state: scored.info.host.state,
            added_time: scored.info.host.added_time,
            host_id: scored.info.id,
        })
        .collect()
}

/// Attach host entries to the executor's output.
pub fn assemble(in_scope: &[ScoredHost], mut response: ScaleResponse) -> ScaleResponse {
    response.hosts = host_entries(in_scope);
    response
}
