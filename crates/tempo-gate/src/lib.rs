//! tempo-gate — adaptive admission control.
//!
//! Bounds the number of concurrently in-flight requests and retunes that
//! bound so the observed average request latency tracks a target.
//!
//! # Architecture
//!
//! ```text
//! Throttle (explicit, clonable bundle)
//!   ├── AdmissionGate   try_acquire() / release() / resize()
//!   ├── SampleAggregate record() / snapshot_and_reset()
//!   └── AutoTuner       periodic: snapshot → next_capacity() → resize()
//!
//! Throttle::run(handler)
//!   try_acquire ──no──▶ Err(Overloaded)
//!        │yes
//!        ▼
//!   handler.await ─▶ record(end - start) ─▶ release (on drop)
//! ```
//!
//! The tuner is a proportional controller:
//!
//! ```text
//! new_capacity = round(target / average * capacity), clamped to [1, max]
//! ```
//!
//! No smoothing is applied between cycles, so bursty load can make the
//! capacity oscillate.

pub mod config;
pub mod error;
pub mod gate;
pub mod sampler;
pub mod stats;
pub mod throttle;
pub mod tuner;

pub use config::{ThrottleConfig, ThrottleSettings};
pub use error::{ConfigError, Overloaded};
pub use gate::{AdmissionGate, Permit};
pub use sampler::{Sample, SampleAggregate};
pub use stats::{render_prometheus, ThrottleStats};
pub use throttle::{Admission, Throttle, TunerHandle};
pub use tuner::{next_capacity, AutoTuner, TuneOutcome};
