//! Exposition routes for a throttle.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tempo_gate::{render_prometheus, Throttle, ThrottleStats};

#[derive(Clone)]
struct MetricsState {
    name: Arc<str>,
    throttle: Throttle,
}

/// Router serving `GET /metrics` and `GET /stats` for `throttle`.
///
/// These routes are meant to be merged outside the throttled routes so
/// they stay reachable under overload.
pub fn metrics_router<S>(name: &str, throttle: Throttle) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let state = MetricsState {
        name: Arc::from(name),
        throttle,
    };

    Router::new()
        .route("/metrics", get(prometheus_metrics))
        .route("/stats", get(stats))
        .with_state(state)
}

async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    let body = render_prometheus(&state.name, &state.throttle.stats());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

async fn stats(State(state): State<MetricsState>) -> Json<ThrottleStats> {
    Json(state.throttle.stats())
}
