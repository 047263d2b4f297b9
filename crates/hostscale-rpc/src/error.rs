//! RPC error types.

use thiserror::Error;

/// Result type alias for management-plane calls.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while talking to the management plane.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to encode params for {method}: {message}")]
    Encode { method: String, message: String },

    #[error("transport error on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("{endpoint} answered with HTTP {status}")]
    Http { endpoint: String, status: u16 },

    #[error("malformed {method} response: {message}")]
    Decode { method: String, message: String },

    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("{method}: all {attempts} endpoints failed, last error: {last}")]
    Exhausted {
        method: String,
        attempts: usize,
        last: Box<RpcError>,
    },

    #[error("{method}: no management endpoints available")]
    NoEndpoints { method: String },
}
