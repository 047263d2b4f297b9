//! hostscale-rpc: access layer for the storage cluster's management plane.
//!
//! # Architecture
//!
//! ```text
//! Pool (one per tick)
//!   ├── endpoints   shuffled once, shrinks on drop_endpoint()
//!   ├── active      endpoint that served the last call
//!   └── clients     one lazily opened connection per endpoint
//!         └── Connector → RpcClient
//!               ├── HttpConnector / HttpClient   JSON-RPC 2.0 over HTTP/1.1
//!               └── FakeConnector / FakeClient   scripted, tests only
//! ```
//!
//! Any failure on one endpoint, including a JSON-RPC error object, fails
//! over to the next; `Exhausted` carries the last error once every
//! endpoint has been tried.

pub mod api;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod pool;

pub use api::method;
pub use client::{Connector, HttpClient, HttpConnector, RpcClient};
pub use error::{RpcError, RpcResult};
pub use pool::Pool;
