//! hostscale-engine: decides which storage hosts leave the cluster and
//! drives them out.
//!
//! # Architecture
//!
//! ```text
//! Scaler::tick(group, connector, rng, now)
//!   ├── Pool::new(backend_ips)              shuffled, tick-scoped
//!   ├── ClusterSnapshot::fetch              status → gate → hosts → drives → nodes
//!   ├── classify                            in-scope / cleanup / forced-down
//!   ├── Plan::new                           deactivate target, priority selection
//!   ├── Executor                            cleanup → orphans → selected → forced
//!   └── response::assemble                  hosts + to_terminate + TransientErrors
//! ```
//!
//! `Scaler::plan` stops after planning and returns a `PlanReport`.

pub mod classify;
pub mod error;
pub mod executor;
pub mod planner;
pub mod response;
pub mod scaler;
pub mod snapshot;

#[cfg(test)]
mod testutil;

pub use classify::{Classification, ScaleState, ScoredHost, classify};
pub use error::{ScaleError, ScaleResult};
pub use executor::Executor;
pub use planner::{Plan, PlanReport, PlannedHost, StateCounts, deactivate_target};
pub use scaler::Scaler;
pub use snapshot::{ClusterSnapshot, HostInfo, check_allowed};
