//! HTTP surface invoked by the scheduler.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/scale` | Run one tick for the posted `HostGroupInfo` |
//! | POST | `/api/v1/plan` | Dry run, returns the `PlanReport` |
//! | GET | `/healthz` | Liveness |

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{info, warn};

use hostscale_core::HostGroupInfo;
use hostscale_engine::{ScaleError, Scaler};

use crate::{ConnectorFactory, validate_group};

/// Shared state for API handlers.
pub struct AppState<F> {
    pub scaler: Scaler,
    pub connectors: Arc<F>,
}

impl<F> AppState<F> {
    pub fn new(scaler: Scaler, connectors: F) -> Self {
        Self {
            scaler,
            connectors: Arc::new(connectors),
        }
    }
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            scaler: self.scaler.clone(),
            connectors: Arc::clone(&self.connectors),
        }
    }
}

/// Build the complete router.
pub fn build_router<F: ConnectorFactory>(state: AppState<F>) -> Router {
    let api_routes = Router::new()
        .route("/scale", post(scale::<F>))
        .route("/plan", post(plan::<F>))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(healthz))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(msg: impl Into<String>, status: StatusCode) -> Response {
    (status, Json(ErrorBody { error: msg.into() })).into_response()
}

fn scale_error_response(err: ScaleError) -> Response {
    match err {
        ScaleError::NotAllowed(_) => {
            info!(error = %err, "tick rejected by cluster gate");
            error_response(err.to_string(), StatusCode::CONFLICT)
        }
        ScaleError::Rpc(_) => {
            warn!(error = %err, "tick failed");
            error_response(err.to_string(), StatusCode::BAD_GATEWAY)
        }
    }
}

fn accept_group(body: Result<Json<HostGroupInfo>, JsonRejection>) -> Result<HostGroupInfo, Response> {
    let Json(group) = body.map_err(|e| error_response(e.body_text(), StatusCode::BAD_REQUEST))?;
    validate_group(&group).map_err(|msg| error_response(msg, StatusCode::BAD_REQUEST))?;
    Ok(group)
}

/// POST /api/v1/scale
async fn scale<F: ConnectorFactory>(
    State(state): State<AppState<F>>,
    body: Result<Json<HostGroupInfo>, JsonRejection>,
) -> Response {
    let group = match accept_group(body) {
        Ok(group) => group,
        Err(resp) => return resp,
    };

    let connector = state.connectors.connector_for(&group);
    let mut rng = StdRng::from_entropy();
    match state.scaler.tick(&group, connector, &mut rng, Utc::now()).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => scale_error_response(e),
    }
}

/// POST /api/v1/plan
async fn plan<F: ConnectorFactory>(
    State(state): State<AppState<F>>,
    body: Result<Json<HostGroupInfo>, JsonRejection>,
) -> Response {
    let group = match accept_group(body) {
        Ok(group) => group,
        Err(resp) => return resp,
    };

    let connector = state.connectors.connector_for(&group);
    let mut rng = StdRng::from_entropy();
    match state.scaler.plan(&group, connector, &mut rng, Utc::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => scale_error_response(e),
    }
}

/// GET /healthz
async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
