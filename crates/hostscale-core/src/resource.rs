//! Resource reconciliation: fetch, create if absent, update on version drift.
//!
//! Every cloud resource that hosts and invokes the engine is described by
//! one `ResourceKind` variant. A single `ResourceBackend` knows how to
//! fetch, create and update any kind; `ensure_resource` drives the
//! three-state machine.

use std::future::Future;

use tracing::{debug, info};

use crate::error::ResourceError;

/// A provisioned resource, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Function { name: String },
    Role { name: String },
    ApiGateway { name: String },
    LoadBalancer { name: String },
    StateMachine { name: String },
    CredentialStore { name: String },
    ScheduleRule { name: String, schedule: String },
}

impl ResourceKind {
    pub fn name(&self) -> &str {
        match self {
            ResourceKind::Function { name }
            | ResourceKind::Role { name }
            | ResourceKind::ApiGateway { name }
            | ResourceKind::LoadBalancer { name }
            | ResourceKind::StateMachine { name }
            | ResourceKind::CredentialStore { name }
            | ResourceKind::ScheduleRule { name, .. } => name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Function { .. } => "function",
            ResourceKind::Role { .. } => "role",
            ResourceKind::ApiGateway { .. } => "api-gateway",
            ResourceKind::LoadBalancer { .. } => "load-balancer",
            ResourceKind::StateMachine { .. } => "state-machine",
            ResourceKind::CredentialStore { .. } => "credential-store",
            ResourceKind::ScheduleRule { .. } => "schedule-rule",
        }
    }
}

/// Provider capability behind every resource kind.
pub trait ResourceBackend {
    /// Version currently deployed, `None` when the resource does not exist.
    fn fetch_version(
        &mut self,
        kind: &ResourceKind,
    ) -> impl Future<Output = Result<Option<String>, ResourceError>> + Send;

    fn create(
        &mut self,
        kind: &ResourceKind,
        version: &str,
    ) -> impl Future<Output = Result<(), ResourceError>> + Send;

    fn update(
        &mut self,
        kind: &ResourceKind,
        version: &str,
    ) -> impl Future<Output = Result<(), ResourceError>> + Send;
}

/// What `ensure_resource` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Updated,
    UpToDate,
}

/// Bring `kind` to `target_version`.
pub async fn ensure_resource<B: ResourceBackend>(
    backend: &mut B,
    kind: &ResourceKind,
    target_version: &str,
) -> Result<EnsureOutcome, ResourceError> {
    let deployed = backend
        .fetch_version(kind)
        .await?
        .filter(|version| !version.is_empty());

    match deployed {
        None => {
            backend.create(kind, target_version).await?;
            info!(kind = kind.label(), name = kind.name(), version = target_version, "resource created");
            Ok(EnsureOutcome::Created)
        }
        Some(deployed) if deployed != target_version => {
            backend.update(kind, target_version).await?;
            info!(
                kind = kind.label(),
                name = kind.name(),
                from = %deployed,
                to = target_version,
                "resource updated"
            );
            Ok(EnsureOutcome::Updated)
        }
        Some(_) => {
            debug!(kind = kind.label(), name = kind.name(), "resource up to date");
            Ok(EnsureOutcome::UpToDate)
        }
    }
}
