//! hostscale-core: shared types for the hostscale control loop.
//!
//! Three families of types live here:
//!
//! - **Management-plane wire types** (`types`): hosts, drives, nodes and
//!   the system status exactly as the storage cluster's JSON-RPC API
//!   reports them.
//! - **Scheduler protocol** (`protocol`): the `HostGroupInfo` a tick is
//!   invoked with and the `ScaleResponse` it returns.
//! - **Configuration** (`config`): `hostscale.toml` parsing and the
//!   resolved timing thresholds used by the classifier.
//!
//! `resource` holds the create/update reconciliation pattern used by the
//! provisioning layer that deploys the engine.

pub mod config;
pub mod error;
pub mod protocol;
pub mod resource;
pub mod types;

pub use config::{HostscaleConfig, Thresholds};
pub use error::{ConfigError, ResourceError};
pub use protocol::*;
pub use types::*;
