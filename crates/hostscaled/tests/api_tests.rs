//! HTTP surface tests against a scripted management plane.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use hostscale_core::HostGroupInfo;
use hostscale_engine::Scaler;
use hostscale_rpc::fake::{FakeCluster, FakeConnector};
use hostscale_rpc::method;
use hostscaled::ConnectorFactory;
use hostscaled::api::{AppState, build_router};

struct Scripted(FakeCluster);

impl ConnectorFactory for Scripted {
    type Connector = FakeConnector;

    fn connector_for(&self, _group: &HostGroupInfo) -> FakeConnector {
        self.0.connector()
    }
}

fn router(cluster: &FakeCluster) -> axum::Router {
    build_router(AppState::new(Scaler::default(), Scripted(cluster.clone())))
}

fn healthy_cluster() -> FakeCluster {
    let cluster = FakeCluster::new();
    cluster
        .respond(method::STATUS, json!({"io_status": "STARTED"}))
        .respond(
            method::HOSTS_LIST,
            json!({
                "HostId<1>": {
                    "aws": {"instance_id": "i-1"},
                    "host_ip": "10.0.0.1",
                    "state": "ACTIVE",
                    "status": "UP",
                    "added_time": "2024-01-01T00:00:00Z",
                    "state_changed_time": "2024-01-01T00:00:00Z"
                },
                "HostId<2>": {
                    "aws": {"instance_id": "i-2"},
                    "host_ip": "10.0.0.2",
                    "state": "ACTIVE",
                    "status": "UP",
                    "added_time": "2024-01-02T00:00:00Z",
                    "state_changed_time": "2024-01-02T00:00:00Z"
                }
            }),
        )
        .respond(method::DRIVES_LIST, json!({}))
        .respond(method::NODES_LIST, json!({}));
    cluster
}

fn group_body(desired: usize) -> Body {
    Body::from(
        json!({
            "username": "admin",
            "password": "admin",
            "desired_capacity": desired,
            "role": "backend",
            "instances": [
                {"Id": "i-1", "PrivateIp": "10.0.0.1"},
                {"Id": "i-2", "PrivateIp": "10.0.0.2"}
            ],
            "backend_ips": ["10.0.0.1", "10.0.0.2"]
        })
        .to_string(),
    )
}

fn post(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_is_ok() {
    let cluster = FakeCluster::new();
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();

    let resp = router(&cluster).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "ok");
}

#[tokio::test]
async fn scale_returns_response_document() {
    let cluster = healthy_cluster();

    let resp = router(&cluster)
        .oneshot(post("/api/v1/scale", group_body(1)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["hosts"].as_array().unwrap().len(), 2);
    assert_eq!(body["hosts"][0]["host_id"], "HostId<1>");
    assert_eq!(body["hosts"][0]["status"], "ACTIVE");
    assert_eq!(body["to_terminate"], json!([]));
    assert_eq!(body["TransientErrors"], json!([]));

    // One surplus driveless host: deactivated directly.
    let calls = cluster.mutating_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, method::DEACTIVATE_HOSTS);
}

#[tokio::test]
async fn plan_never_mutates() {
    let cluster = healthy_cluster();

    let resp = router(&cluster)
        .oneshot(post("/api/v1/plan", group_body(1)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["target"], 1);
    assert_eq!(body["hosts"][0]["selected"], true);
    assert_eq!(body["hosts"][1]["selected"], false);
    assert!(cluster.mutating_calls().is_empty());
}

#[tokio::test]
async fn gate_rejection_is_conflict() {
    let cluster = healthy_cluster();
    cluster.respond(method::STATUS, json!({"io_status": "STOPPED"}));

    let resp = router(&cluster)
        .oneshot(post("/api/v1/scale", group_body(1)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("STOPPED"));
    assert!(cluster.mutating_calls().is_empty());
}

#[tokio::test]
async fn unreachable_cluster_is_bad_gateway() {
    let cluster = healthy_cluster();
    cluster.set_unreachable("10.0.0.1").set_unreachable("10.0.0.2");

    let resp = router(&cluster)
        .oneshot(post("/api/v1/scale", group_body(1)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let cluster = healthy_cluster();

    let resp = router(&cluster)
        .oneshot(post("/api/v1/scale", Body::from("{not json")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = router(&cluster)
        .oneshot(post("/api/v1/scale", Body::from(r#"{"username":"admin"}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn group_without_endpoints_is_bad_request() {
    let cluster = healthy_cluster();
    let body = Body::from(
        json!({
            "username": "admin",
            "password": "admin",
            "desired_capacity": 1,
            "role": "client",
            "backend_ips": []
        })
        .to_string(),
    );

    let resp = router(&cluster).oneshot(post("/api/v1/scale", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(cluster.calls().is_empty());
}
