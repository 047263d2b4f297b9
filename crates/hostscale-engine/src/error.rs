//! Engine error types.

use hostscale_rpc::RpcError;
use thiserror::Error;

/// Result type alias for tick operations.
pub type ScaleResult<T> = Result<T, ScaleError>;

/// Errors that abort a tick before any mutating call is issued.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("management plane error: {0}")]
    Rpc(#[from] RpcError),

    #[error("scaling not allowed: {0}")]
    NotAllowed(String),
}
