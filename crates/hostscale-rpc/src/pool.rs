//! Failover pool over redundant management endpoints.
//!
//! A `Pool` lives for exactly one tick. The candidate endpoints are
//! shuffled once on construction with the caller's random source, so a
//! fixed seed gives a fixed order. Calls go to the active endpoint; when
//! it fails for any reason (unreachable, timed out, malformed answer or a
//! JSON-RPC error object), its connection is evicted and the next untried
//! candidate takes over. Only when every candidate has failed does a call
//! surface an error.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{Connector, RpcClient};
use crate::error::{RpcError, RpcResult};

/// Tick-scoped set of management endpoints with one lazily opened
/// connection per endpoint.
pub struct Pool<C: Connector> {
    endpoints: Vec<String>,
    clients: HashMap<String, C::Client>,
    active: Option<String>,
    connector: C,
}

impl<C: Connector> Pool<C> {
    /// Build a pool over `endpoints`, deduplicated and shuffled with `rng`.
    pub fn new<R: Rng + ?Sized>(endpoints: Vec<String>, connector: C, rng: &mut R) -> Self {
        let mut seen = HashSet::new();
        let mut endpoints: Vec<String> = endpoints
            .into_iter()
            .filter(|ip| !ip.is_empty() && seen.insert(ip.clone()))
            .collect();
        endpoints.shuffle(rng);
        debug!(endpoints = ?endpoints, "rpc pool created");

        Self {
            endpoints,
            clients: HashMap::new(),
            active: None,
            connector,
        }
    }

    /// Remaining candidates in the order they will be tried.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Endpoint that served the last successful call.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Remove an endpoint for the rest of the tick.
    ///
    /// Used once a host has been told to leave the cluster: its
    /// management process may disappear at any moment.
    pub fn drop_endpoint(&mut self, endpoint: &str) {
        self.endpoints.retain(|ip| ip != endpoint);
        self.clients.remove(endpoint);
        if self.active.as_deref() == Some(endpoint) {
            self.active = None;
        }
        debug!(%endpoint, remaining = self.endpoints.len(), "endpoint dropped from pool");
    }

    /// Issue `method` and decode its result into `T`, failing over across
    /// endpoints.
    pub async fn call<P, T>(&mut self, method: &str, params: &P) -> RpcResult<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let params = serde_json::to_value(params).map_err(|e| RpcError::Encode {
            method: method.to_string(),
            message: e.to_string(),
        })?;

        let mut tried: Vec<String> = Vec::new();
        let mut last_err = None;

        while let Some(endpoint) = self.next_candidate(&tried) {
            tried.push(endpoint.clone());
            match self.attempt(&endpoint, method, params.clone()).await {
                Ok(value) => {
                    self.active = Some(endpoint);
                    return Ok(value);
                }
                Err(err) => {
                    warn!(%endpoint, method, error = %err, "rpc call failed, trying next endpoint");
                    self.clients.remove(&endpoint);
                    self.active = None;
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(last) => Err(RpcError::Exhausted {
                method: method.to_string(),
                attempts: tried.len(),
                last: Box::new(last),
            }),
            None => Err(RpcError::NoEndpoints {
                method: method.to_string(),
            }),
        }
    }

    /// Issue a mutating `method`, discarding whatever it returns.
    pub async fn call_ack<P>(&mut self, method: &str, params: &P) -> RpcResult<()>
    where
        P: Serialize + ?Sized,
    {
        self.call::<P, IgnoredAny>(method, params).await.map(|_| ())
    }

    fn next_candidate(&self, tried: &[String]) -> Option<String> {
        let untried = |ip: &&String| !tried.contains(ip);
        self.active
            .as_ref()
            .filter(untried)
            .or_else(|| self.endpoints.iter().find(untried))
            .cloned()
    }

    async fn attempt<T: DeserializeOwned>(
        &mut self,
        endpoint: &str,
        method: &str,
        params: Value,
    ) -> RpcResult<T> {
        let client = match self.clients.entry(endpoint.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.connector.connect(endpoint).await?),
        };

        let value = client.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeCluster;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn ips(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("10.0.0.{i}")).collect()
    }

    fn pool(cluster: &FakeCluster, n: usize, seed: u64) -> Pool<crate::fake::FakeConnector> {
        let mut rng = StdRng::seed_from_u64(seed);
        Pool::new(ips(n), cluster.connector(), &mut rng)
    }

    #[test]
    fn fixed_seed_gives_fixed_order() {
        let cluster = FakeCluster::new();
        let a = pool(&cluster, 8, 42);
        let b = pool(&cluster, 8, 42);
        assert_eq!(a.endpoints(), b.endpoints());

        let mut sorted = a.endpoints().to_vec();
        sorted.sort();
        let mut expected = ips(8);
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn duplicate_and_empty_endpoints_are_ignored() {
        let cluster = FakeCluster::new();
        let mut rng = StdRng::seed_from_u64(1);
        let endpoints = vec![
            "10.0.0.1".to_string(),
            String::new(),
            "10.0.0.1".to_string(),
            "10.0.0.2".to_string(),
        ];
        let pool = Pool::new(endpoints, cluster.connector(), &mut rng);
        assert_eq!(pool.endpoints().len(), 2);
    }

    #[tokio::test]
    async fn connection_is_reused_across_calls() {
        let cluster = FakeCluster::new();
        cluster.respond("status", json!({"io_status": "STARTED"}));
        let mut pool = pool(&cluster, 3, 7);

        for _ in 0..3 {
            let _: Value = pool.call("status", &json!({})).await.unwrap();
        }

        assert_eq!(cluster.connects().len(), 1);
        assert_eq!(cluster.calls().len(), 3);
        let active = pool.active().unwrap().to_string();
        assert!(cluster.calls().iter().all(|c| c.endpoint == active));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_over() {
        let cluster = FakeCluster::new();
        cluster.respond("status", json!({"io_status": "STARTED"}));
        let mut pool = pool(&cluster, 3, 7);
        let first = pool.endpoints()[0].clone();
        cluster.set_unreachable(&first);

        let _: Value = pool.call("status", &json!({})).await.unwrap();
        assert_ne!(pool.active(), Some(first.as_str()));
        assert_eq!(pool.active(), Some(pool.endpoints()[1].as_str()));
    }

    #[tokio::test]
    async fn broken_active_connection_is_replaced() {
        let cluster = FakeCluster::new();
        cluster.respond("status", json!({"io_status": "STARTED"}));
        let mut pool = pool(&cluster, 2, 3);

        let _: Value = pool.call("status", &json!({})).await.unwrap();
        let first = pool.active().unwrap().to_string();
        cluster.set_unreachable(&first);

        let _: Value = pool.call("status", &json!({})).await.unwrap();
        assert_ne!(pool.active().unwrap(), first);
    }

    #[tokio::test]
    async fn all_endpoints_down_is_exhausted() {
        let cluster = FakeCluster::new();
        let mut pool = pool(&cluster, 3, 9);
        for ip in ips(3) {
            cluster.set_unreachable(&ip);
        }

        let err = pool.call::<_, Value>("status", &json!({})).await.unwrap_err();
        match err {
            RpcError::Exhausted { attempts, method, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(method, "status");
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert!(pool.active().is_none());
    }

    #[tokio::test]
    async fn malformed_result_fails_over_then_exhausts() {
        let cluster = FakeCluster::new();
        cluster.respond("status", json!("not an object"));
        let mut pool = pool(&cluster, 2, 5);

        #[derive(Debug, serde::Deserialize)]
        struct Status {
            #[allow(dead_code)]
            io_status: String,
        }

        let err = pool.call::<_, Status>("status", &json!({})).await.unwrap_err();
        match err {
            RpcError::Exhausted { last, .. } => {
                assert!(matches!(*last, RpcError::Decode { .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(cluster.calls().len(), 2);
    }

    #[tokio::test]
    async fn remote_error_fails_over_to_next_endpoint() {
        let cluster = FakeCluster::new();
        let mut pool = pool(&cluster, 3, 11);
        let first = pool.endpoints()[0].clone();
        let second = pool.endpoints()[1].clone();
        cluster.fail_method_on(&first, "status", -32000, "node not ready");

        let _: Value = pool.call("status", &json!({})).await.unwrap();
        assert_eq!(pool.active(), Some(second.as_str()));

        let endpoints: Vec<_> = cluster.calls().into_iter().map(|c| c.endpoint).collect();
        assert_eq!(endpoints, vec![first.clone(), second]);
        // The failed endpoint stays a candidate, only its connection is gone.
        assert!(pool.endpoints().contains(&first));
    }

    #[tokio::test]
    async fn remote_error_everywhere_is_exhausted() {
        let cluster = FakeCluster::new();
        cluster.fail_method("cluster_remove_host", -32000, "host not found");
        let mut pool = pool(&cluster, 3, 11);

        let err = pool
            .call_ack("cluster_remove_host", &json!({"host_id": 4, "no_wait": true}))
            .await
            .unwrap_err();
        match err {
            RpcError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, RpcError::Remote { code: -32000, .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(cluster.calls().len(), 3);
        assert!(pool.active().is_none());
    }

    #[tokio::test]
    async fn dropped_endpoint_is_never_contacted() {
        let cluster = FakeCluster::new();
        cluster.respond("status", json!({}));
        let mut pool = pool(&cluster, 2, 13);

        let _: Value = pool.call("status", &json!({})).await.unwrap();
        let first = pool.active().unwrap().to_string();
        pool.drop_endpoint(&first);
        assert!(pool.active().is_none());
        assert_eq!(pool.endpoints().len(), 1);

        let _: Value = pool.call("status", &json!({})).await.unwrap();
        let last = cluster.calls().pop().unwrap();
        assert_ne!(last.endpoint, first);
    }

    #[tokio::test]
    async fn empty_pool_reports_no_endpoints() {
        let cluster = FakeCluster::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = Pool::new(Vec::new(), cluster.connector(), &mut rng);
        let err = pool.call::<_, Value>("status", &json!({})).await.unwrap_err();
        assert!(matches!(err, RpcError::NoEndpoints { .. }));
    }
}
