//! tempo-http — adaptive admission control for axum/tower services.
//!
//! Wraps any service producing `axum::response::Response` so each request
//! either runs under a [`Throttle`] permit or is answered immediately with
//! `503 Service Unavailable`.
//!
//! ```text
//! Router::new()
//!     .route("/work", get(handler))
//!     .layer(ThrottleLayer::new(throttle.clone()))
//!     .merge(metrics_router("api", throttle))
//! ```
//!
//! # Routes added by [`metrics_router`]
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/stats` | JSON snapshot of the throttle |

pub mod layer;
pub mod metrics;

pub use layer::{overloaded_response, ThrottleLayer, ThrottleService};
pub use metrics::metrics_router;
pub use tempo_gate::{Throttle, ThrottleConfig};
