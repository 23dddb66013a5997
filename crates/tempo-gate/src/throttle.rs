//! Throttle — the gate, sampler and tuner bundled into one explicit object.
//!
//! A `Throttle` is constructed once and shared by cloning. Several
//! independent throttles can coexist in one process.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::config::ThrottleConfig;
use crate::error::Overloaded;
use crate::gate::{AdmissionGate, Permit};
use crate::sampler::SampleAggregate;
use crate::stats::ThrottleStats;
use crate::tuner::AutoTuner;

#[derive(Debug)]
struct Shared {
    config: ThrottleConfig,
    gate: AdmissionGate,
    sampler: Arc<SampleAggregate>,
    admitted: AtomicU64,
    rejected: AtomicU64,
}

/// Latency-targeting admission control for one protected handler set.
#[derive(Debug, Clone)]
pub struct Throttle {
    shared: Arc<Shared>,
}

impl Throttle {
    /// Build a throttle without starting its tuner.
    ///
    /// The configuration is defaulted first; see
    /// [`ThrottleConfig::with_defaults`].
    pub fn new(config: ThrottleConfig) -> Self {
        let config = config.with_defaults();
        Self {
            shared: Arc::new(Shared {
                gate: AdmissionGate::new(config.initial_capacity),
                sampler: Arc::new(SampleAggregate::new()),
                config,
                admitted: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
            }),
        }
    }

    /// Build a throttle and spawn its tuner on the current tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn start(config: ThrottleConfig) -> (Self, TunerHandle) {
        let throttle = Self::new(config);
        let handle = throttle.spawn_tuner();
        (throttle, handle)
    }

    /// A tuner bound to this throttle's gate and sampler.
    pub fn tuner(&self) -> AutoTuner {
        AutoTuner::new(
            self.shared.gate.clone(),
            self.shared.sampler.clone(),
            &self.shared.config,
        )
    }

    /// Spawn the tuning loop. The returned handle stops it.
    pub fn spawn_tuner(&self) -> TunerHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.tuner().run(rx));
        TunerHandle { shutdown, task }
    }

    /// Admit one request or reject it immediately.
    pub fn try_admit(&self) -> Result<Admission, Overloaded> {
        match self.shared.gate.try_permit() {
            Some(permit) => {
                self.shared.admitted.fetch_add(1, Ordering::Relaxed);
                Ok(Admission {
                    sampler: self.shared.sampler.clone(),
                    start: Instant::now(),
                    _permit: permit,
                })
            }
            None => {
                self.shared.rejected.fetch_add(1, Ordering::Relaxed);
                trace!(
                    capacity = self.shared.gate.capacity(),
                    in_flight = self.shared.gate.in_flight(),
                    "request rejected"
                );
                Err(Overloaded)
            }
        }
    }

    /// Run `handler` under admission control.
    ///
    /// When the gate is full, returns [`Overloaded`] without calling
    /// `handler`. Otherwise the handler's output is returned unchanged and
    /// its duration is recorded. The slot is released on every path,
    /// including a panic in the handler or the returned future being
    /// dropped early; only completed handlers are recorded.
    pub async fn run<F, Fut>(&self, handler: F) -> Result<Fut::Output, Overloaded>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let admission = self.try_admit()?;
        let output = handler().await;
        admission.complete();
        Ok(output)
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.shared.gate
    }

    pub fn sampler(&self) -> &SampleAggregate {
        &self.shared.sampler
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.shared.config
    }

    /// Point-in-time counters for exposition.
    pub fn stats(&self) -> ThrottleStats {
        let gate = &self.shared.gate;
        ThrottleStats {
            capacity: gate.capacity(),
            in_flight: gate.in_flight(),
            generation: gate.generation(),
            admitted: self.shared.admitted.load(Ordering::Relaxed),
            rejected: self.shared.rejected.load(Ordering::Relaxed),
            pending_samples: self.shared.sampler.peek().count,
        }
    }
}

/// One admitted request.
///
/// Holds the slot until dropped. Call [`Admission::complete`] once the
/// handler has finished to record its duration; dropping without
/// completing releases the slot without recording.
#[derive(Debug)]
#[must_use = "dropping an admission releases its slot immediately"]
pub struct Admission {
    sampler: Arc<SampleAggregate>,
    start: Instant,
    _permit: Permit,
}

impl Admission {
    /// Record `now - start` and release the slot.
    pub fn complete(self) {
        self.sampler.record(self.start.elapsed());
    }
}

/// Owns the background tuning task of a [`Throttle`].
///
/// Dropping the handle closes the shutdown channel, which also stops the
/// task.
#[derive(Debug)]
pub struct TunerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TunerHandle {
    /// Signal the tuner to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "auto-tuner task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
