//! Sample aggregate — count and total duration of completed requests.
//!
//! Every completed request records into the aggregate; the tuner drains it
//! once per cycle with [`SampleAggregate::snapshot_and_reset`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Completed requests observed over one tuning window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub count: u64,
    pub total: Duration,
}

impl Sample {
    /// Mean request duration, or `None` when nothing was recorded.
    pub fn average(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Some(Duration::from_nanos(
            u64::try_from(nanos).unwrap_or(u64::MAX),
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Mutex-protected `(count, total)` pair shared by all request workers.
#[derive(Debug, Default)]
pub struct SampleAggregate {
    sample: Mutex<Sample>,
}

impl SampleAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sample> {
        self.sample.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one completed request.
    pub fn record(&self, elapsed: Duration) {
        let mut sample = self.lock();
        sample.count = sample.count.saturating_add(1);
        sample.total = sample.total.saturating_add(elapsed);
    }

    /// Record one completed request given in nanoseconds.
    pub fn record_nanos(&self, elapsed_ns: u64) {
        self.record(Duration::from_nanos(elapsed_ns));
    }

    /// Read the current pair and reset it to zero in one step.
    pub fn snapshot_and_reset(&self) -> Sample {
        std::mem::take(&mut *self.lock())
    }

    /// Read the current pair without resetting it.
    pub fn peek(&self) -> Sample {
        *self.lock()
    }
}
