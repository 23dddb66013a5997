//! HTTP routes of the demo daemon.

use std::time::Duration;

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tempo_gate::Throttle;
use tempo_http::{metrics_router, ThrottleLayer};

/// Upper bound for the simulated work per request.
const MAX_WORK_MS: u64 = 10_000;

#[derive(Debug, Deserialize)]
pub struct WorkParams {
    ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkResponse {
    pub slept_ms: u64,
}

/// Build the daemon router. Only `/work` is throttled.
pub fn build_router(throttle: Throttle) -> Router {
    let throttled = Router::new()
        .route("/work", get(work))
        .layer(ThrottleLayer::new(throttle.clone()));

    Router::new()
        .merge(throttled)
        .route("/healthz", get(healthz))
        .merge(metrics_router("tempod", throttle))
}

async fn work(Query(params): Query<WorkParams>) -> Json<WorkResponse> {
    let ms = params.ms.unwrap_or(0).min(MAX_WORK_MS);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(WorkResponse { slept_ms: ms })
}

async fn healthz() -> &'static str {
    "ok"
}
