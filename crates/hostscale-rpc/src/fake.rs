//! Scripted in-memory management plane.
//!
//! `FakeCluster` answers JSON-RPC methods with canned results, records
//! every connection and call, and can make endpoints unreachable or
//! methods fail. Enabled for this crate's tests and, through the `fake`
//! feature, for downstream crates' tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::client::{Connector, RpcClient};
use crate::error::{RpcError, RpcResult};

type Matcher = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// A call observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: String,
    pub method: String,
    pub params: Value,
}

impl RecordedCall {
    /// Mutating management calls all live under `cluster_`.
    pub fn is_mutating(&self) -> bool {
        self.method.starts_with("cluster_")
    }
}

struct Failure {
    endpoint: Option<String>,
    matches: Matcher,
    code: i64,
    message: String,
}

#[derive(Default)]
struct FakeState {
    results: HashMap<String, Value>,
    failures: HashMap<String, Vec<Failure>>,
    unreachable: HashSet<String>,
    calls: Vec<RecordedCall>,
    connects: Vec<String>,
}

/// Handle to a scripted management plane. Clones share state.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panic inside a test while holding the lock poisons it; the
        // state is still usable for reporting.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer every `method` call with `result`.
    pub fn respond(&self, method: &str, result: Value) -> &Self {
        self.lock().results.insert(method.to_string(), result);
        self
    }

    /// Reject every `method` call with a remote error.
    pub fn fail_method(&self, method: &str, code: i64, message: &str) -> &Self {
        self.fail_when(method, code, message, |_| true)
    }

    /// Reject `method` calls whose params satisfy `matches`.
    pub fn fail_when<F>(&self, method: &str, code: i64, message: &str, matches: F) -> &Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.lock()
            .failures
            .entry(method.to_string())
            .or_default()
            .push(Failure {
                endpoint: None,
                matches: Box::new(matches),
                code,
                message: message.to_string(),
            });
        self
    }

    /// Reject every `method` call served by `endpoint` with a remote error.
    pub fn fail_method_on(&self, endpoint: &str, method: &str, code: i64, message: &str) -> &Self {
        self.lock()
            .failures
            .entry(method.to_string())
            .or_default()
            .push(Failure {
                endpoint: Some(endpoint.to_string()),
                matches: Box::new(|_| true),
                code,
                message: message.to_string(),
            });
        self
    }

    /// Refuse connections to `endpoint` and break existing ones.
    pub fn set_unreachable(&self, endpoint: &str) -> &Self {
        self.lock().unreachable.insert(endpoint.to_string());
        self
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            cluster: self.clone(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .cloned()
            .collect()
    }

    /// Endpoints connected to, in order, one entry per connection.
    pub fn connects(&self) -> Vec<String> {
        self.lock().connects.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.lock();
        state.calls.clear();
        state.connects.clear();
    }
}

#[derive(Clone)]
pub struct FakeConnector {
    cluster: FakeCluster,
}

impl Connector for FakeConnector {
    type Client = FakeClient;

    async fn connect(&self, endpoint: &str) -> RpcResult<FakeClient> {
        let mut state = self.cluster.lock();
        if state.unreachable.contains(endpoint) {
            return Err(RpcError::Transport {
                endpoint: endpoint.to_string(),
                message: "connection refused".to_string(),
            });
        }
        state.connects.push(endpoint.to_string());
        Ok(FakeClient {
            endpoint: endpoint.to_string(),
            cluster: self.cluster.clone(),
        })
    }
}

pub struct FakeClient {
    endpoint: String,
    cluster: FakeCluster,
}

impl RpcClient for FakeClient {
    async fn call(&mut self, method: &str, params: Value) -> RpcResult<Value> {
        let mut state = self.cluster.lock();
        if state.unreachable.contains(&self.endpoint) {
            return Err(RpcError::Transport {
                endpoint: self.endpoint.clone(),
                message: "connection reset".to_string(),
            });
        }

        state.calls.push(RecordedCall {
            endpoint: self.endpoint.clone(),
            method: method.to_string(),
            params: params.clone(),
        });

        if let Some(failure) = state
            .failures
            .get(method)
            .and_then(|failures| {
                failures.iter().find(|f| {
                    f.endpoint.as_ref().is_none_or(|e| *e == self.endpoint) && (f.matches)(&params)
                })
            })
        {
            return Err(RpcError::Remote {
                code: failure.code,
                message: failure.message.clone(),
            });
        }

        Ok(state
            .results
            .get(method)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }
}
