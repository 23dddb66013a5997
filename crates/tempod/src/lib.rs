//! tempod — demo daemon for the tempo admission gate.
//!
//! Serves a synthetic workload behind a [`ThrottleLayer`](tempo_http::ThrottleLayer)
//! so the auto-tuner can be observed under load.
//!
//! # Routes
//!
//! | Method | Path | Throttled | Description |
//! |---|---|---|---|
//! | GET | `/work?ms=N` | yes | Sleeps `N` milliseconds, then answers |
//! | GET | `/healthz` | no | Liveness probe |
//! | GET | `/metrics` | no | Prometheus exposition |
//! | GET | `/stats` | no | JSON throttle snapshot |

pub mod app;
pub mod config;

pub use app::build_router;
pub use config::DaemonConfig;
