//! JSON-RPC over HTTP/1.1.
//!
//! `Connector` opens one connection per management endpoint; the
//! resulting `RpcClient` issues calls over that connection until it
//! breaks. `HttpConnector` is the production implementation: a plain TCP
//! connection driven by hyper, POSTing JSON-RPC 2.0 envelopes to
//! `/api/v1` with basic credentials.

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HOST, USER_AGENT};
use http::{HeaderValue, Request};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::SendRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{RpcError, RpcResult};

/// A live connection to one management endpoint.
pub trait RpcClient: Send {
    /// Issue `method` and return the raw `result` member.
    fn call(
        &mut self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = RpcResult<Value>> + Send;
}

/// Opens connections to management endpoints.
pub trait Connector: Send + Sync {
    type Client: RpcClient;

    fn connect(&self, endpoint: &str) -> impl Future<Output = RpcResult<Self::Client>> + Send;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// Connects to management endpoints over HTTP/1.1.
#[derive(Clone)]
pub struct HttpConnector {
    port: u16,
    authorization: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(port: u16, username: &str, password: &str) -> Self {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        Self {
            port,
            authorization: format!("Basic {credentials}"),
            timeout: Duration::from_secs(30),
        }
    }

    /// Bound on connection setup and on every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Connector for HttpConnector {
    type Client = HttpClient;

    async fn connect(&self, endpoint: &str) -> RpcResult<HttpClient> {
        let authority = format!("{endpoint}:{}", self.port);
        let transport = |e: &dyn std::fmt::Display| RpcError::Transport {
            endpoint: authority.clone(),
            message: e.to_string(),
        };

        let stream = tokio::time::timeout(
            self.timeout,
            tokio::net::TcpStream::connect((endpoint, self.port)),
        )
        .await
        .map_err(|_| RpcError::Timeout {
            endpoint: authority.clone(),
        })?
        .map_err(|e| transport(&e))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| transport(&e))?;

        // Drive the connection in the background.
        let conn_endpoint = authority.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(endpoint = %conn_endpoint, error = %e, "rpc connection closed");
            }
        });

        let mut authorization =
            HeaderValue::from_str(&self.authorization).map_err(|e| transport(&e))?;
        authorization.set_sensitive(true);

        debug!(endpoint = %authority, "rpc connection established");
        Ok(HttpClient {
            authority,
            authorization,
            sender,
            timeout: self.timeout,
            next_id: 0,
        })
    }
}

/// One persistent HTTP/1.1 connection to a management endpoint.
pub struct HttpClient {
    authority: String,
    authorization: HeaderValue,
    sender: SendRequest<Full<Bytes>>,
    timeout: Duration,
    next_id: u64,
}

impl HttpClient {
    fn transport_error(&self, e: impl std::fmt::Display) -> RpcError {
        RpcError::Transport {
            endpoint: self.authority.clone(),
            message: e.to_string(),
        }
    }
}

impl RpcClient for HttpClient {
    async fn call(&mut self, method: &str, params: Value) -> RpcResult<Value> {
        self.next_id += 1;
        let envelope = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id,
            method,
            params,
        };
        let body = serde_json::to_vec(&envelope).map_err(|e| RpcError::Encode {
            method: method.to_string(),
            message: e.to_string(),
        })?;

        let req = Request::builder()
            .method("POST")
            .uri(format!("http://{}/api/v1", self.authority))
            .header(HOST, self.authority.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, "hostscale/0.1")
            .header(AUTHORIZATION, self.authorization.clone())
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| self.transport_error(e))?;

        let exchange = async {
            self.sender.ready().await?;
            let resp = self.sender.send_request(req).await?;
            let status = resp.status();
            let bytes = resp.into_body().collect().await?.to_bytes();
            Ok::<_, hyper::Error>((status, bytes))
        };

        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| RpcError::Timeout {
                endpoint: self.authority.clone(),
            })?
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(RpcError::Http {
                endpoint: self.authority.clone(),
                status: status.as_u16(),
            });
        }

        let response: JsonRpcResponse =
            serde_json::from_slice(&bytes).map_err(|e| RpcError::Decode {
                method: method.to_string(),
                message: e.to_string(),
            })?;

        if let Some(error) = response.error {
            return Err(RpcError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}
