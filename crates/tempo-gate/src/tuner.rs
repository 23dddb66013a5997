//! Auto-tuner — periodic proportional controller for the gate capacity.
//!
//! Each cycle drains the sample aggregate, computes the average request
//! duration and rescales the capacity by `target / average`. A cycle with
//! no completed requests changes nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::config::ThrottleConfig;
use crate::gate::AdmissionGate;
use crate::sampler::SampleAggregate;

/// First deadline used when `now + interval` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Result of a single tuning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneOutcome {
    /// No requests completed during the window.
    Skipped,
    /// The computed capacity equals the current one.
    Unchanged(usize),
    /// The gate was resized.
    Resized { from: usize, to: usize },
}

/// Compute the next capacity for one cycle.
///
/// `round(target / average * current)`, clamped to `[1, max]`. A zero
/// average is treated as one nanosecond.
pub fn next_capacity(target: Duration, average: Duration, current: usize, max: usize) -> usize {
    let max = max.max(1);
    let average_ns = (average.as_nanos() as f64).max(1.0);
    let target_ns = target.as_nanos() as f64;

    let scaled = (target_ns / average_ns * current as f64).round();
    if !scaled.is_finite() {
        return max;
    }
    // Float-to-int `as` saturates, so huge ratios land on `max`.
    (scaled as usize).clamp(1, max)
}

/// Periodically retunes an [`AdmissionGate`] from a [`SampleAggregate`].
#[derive(Debug)]
pub struct AutoTuner {
    gate: AdmissionGate,
    sampler: Arc<SampleAggregate>,
    target: Duration,
    interval: Duration,
    max_capacity: usize,
}

impl AutoTuner {
    pub fn new(gate: AdmissionGate, sampler: Arc<SampleAggregate>, config: &ThrottleConfig) -> Self {
        let config = config.with_defaults();
        Self {
            gate,
            sampler,
            target: config.target_latency,
            interval: config.sample_interval,
            max_capacity: config.max_capacity,
        }
    }

    /// Run one tuning cycle.
    pub fn tune_once(&self) -> TuneOutcome {
        let sample = self.sampler.snapshot_and_reset();
        let Some(average) = sample.average() else {
            trace!("no completed requests this cycle; skipping");
            return TuneOutcome::Skipped;
        };

        let current = self.gate.capacity();
        let next = next_capacity(self.target, average, current, self.max_capacity);
        if next == current {
            trace!(capacity = current, ?average, "capacity unchanged");
            return TuneOutcome::Unchanged(current);
        }

        let from = self.gate.resize(next);
        debug!(
            from,
            to = next,
            requests = sample.count,
            ?average,
            target = ?self.target,
            "capacity retuned"
        );
        TuneOutcome::Resized { from, to: next }
    }

    /// Run the tuning loop until the shutdown signal fires or its sender
    /// is dropped.
    ///
    /// The first cycle runs one full interval after start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            target_ms = self.target.as_millis() as u64,
            "auto-tuner started"
        );

        let now = Instant::now();
        let first = now
            .checked_add(self.interval)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let mut ticker = tokio::time::interval_at(first, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.tune_once();
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        info!("auto-tuner shutting down");
    }
}
