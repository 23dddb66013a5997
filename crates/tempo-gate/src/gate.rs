//! Admission gate — a live-resizable pool of concurrency slots.
//!
//! The current pool is an `Arc<Pool>` behind a read/write lock. A pool only
//! advertises a capacity; the number of outstanding permits is a separate
//! atomic counter that `resize` never touches. Acquire and release take the
//! read side of the lock, resize takes the write side for the duration of a
//! reference swap.
//!
//! Since outstanding permits are counted in one place, a shrink never
//! drops or double-counts permits: requests admitted under the old capacity
//! finish normally and new requests are refused until the count falls
//! below the new capacity.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{trace, warn};

/// The advertised limit. Replaced wholesale on every resize.
#[derive(Debug)]
struct Pool {
    capacity: usize,
    generation: u64,
}

#[derive(Debug)]
struct GateInner {
    pool: RwLock<Arc<Pool>>,
    in_flight: AtomicUsize,
}

/// Bounded, non-blocking admission gate.
///
/// Cloning is cheap and yields a handle to the same gate.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots. A capacity of zero is raised
    /// to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                pool: RwLock::new(Arc::new(Pool {
                    capacity: capacity.max(1),
                    generation: 0,
                })),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    fn pool(&self) -> RwLockReadGuard<'_, Arc<Pool>> {
        self.inner
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve one slot if the pool has spare capacity.
    ///
    /// Never waits: returns `false` immediately when the gate is full.
    pub fn try_acquire(&self) -> bool {
        let pool = self.pool();
        let mut current = self.inner.in_flight.load(Ordering::Acquire);
        loop {
            if current >= pool.capacity {
                return false;
            }
            match self.inner.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Return one previously acquired slot.
    ///
    /// Each successful [`try_acquire`](Self::try_acquire) must be matched
    /// by exactly one release. A release with nothing outstanding is
    /// ignored.
    pub fn release(&self) {
        let _pool = self.pool();
        let released = self
            .inner
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if released.is_err() {
            warn!("admission gate released with no outstanding permits; ignoring");
        }
    }

    /// Acquire a slot wrapped in a guard that releases it on drop.
    pub fn try_permit(&self) -> Option<Permit> {
        self.try_acquire().then(|| Permit { gate: self.clone() })
    }

    /// Replace the pool with one advertising `new_capacity` slots.
    ///
    /// Affects future acquisitions only. Returns the previous capacity.
    /// A capacity of zero is raised to one so the gate never fully closes.
    pub fn resize(&self, new_capacity: usize) -> usize {
        let new_capacity = new_capacity.max(1);
        let mut pool = self
            .inner
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = pool.capacity;
        let generation = pool.generation + 1;
        *pool = Arc::new(Pool {
            capacity: new_capacity,
            generation,
        });
        drop(pool);

        trace!(
            from = previous,
            to = new_capacity,
            generation,
            in_flight = self.in_flight(),
            "admission gate resized"
        );
        previous
    }

    /// Currently advertised capacity.
    pub fn capacity(&self) -> usize {
        self.pool().capacity
    }

    /// Number of resizes applied since creation.
    pub fn generation(&self) -> u64 {
        self.pool().generation
    }

    /// Outstanding acquired-but-unreleased slots.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Slots a caller could acquire right now. Zero while a shrink is still
    /// draining.
    pub fn available(&self) -> usize {
        let capacity = self.capacity();
        capacity.saturating_sub(self.in_flight())
    }
}

/// RAII form of one admitted slot.
///
/// Released exactly once when dropped, whether the holder returns
/// normally, fails, panics, or is cancelled.
#[derive(Debug)]
#[must_use = "dropping a permit releases its slot immediately"]
pub struct Permit {
    gate: AdmissionGate,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn capacity_one_admits_one_at_a_time() {
        let gate = AdmissionGate::new(1);

        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());

        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.capacity(), 1);

        gate.resize(0);
        assert_eq!(gate.capacity(), 1);
        assert!(gate.try_acquire());
    }

    #[test]
    fn balanced_acquire_release_restores_availability() {
        let gate = AdmissionGate::new(8);
        let original = gate.available();

        let acquired = (0..5).filter(|_| gate.try_acquire()).count();
        assert_eq!(acquired, 5);
        assert_eq!(gate.available(), original - 5);

        for _ in 0..acquired {
            gate.release();
        }
        assert_eq!(gate.available(), original);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn unmatched_release_is_a_noop() {
        let gate = AdmissionGate::new(2);
        gate.release();
        gate.release();

        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.available(), 2);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn resize_while_idle_admits_exactly_new_capacity() {
        let gate = AdmissionGate::new(3);
        assert_eq!(gate.resize(7), 3);

        for _ in 0..7 {
            assert!(gate.try_acquire());
        }
        assert!(!gate.try_acquire());
    }

    #[test]
    fn shrink_keeps_outstanding_permits_and_blocks_new_ones() {
        let gate = AdmissionGate::new(4);
        for _ in 0..4 {
            assert!(gate.try_acquire());
        }

        gate.resize(2);
        assert_eq!(gate.in_flight(), 4);
        assert_eq!(gate.available(), 0);
        assert!(!gate.try_acquire());

        // Two releases bring the count down to the new capacity: still full.
        gate.release();
        gate.release();
        assert!(!gate.try_acquire());

        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    fn grow_admits_more_immediately() {
        let gate = AdmissionGate::new(1);
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());

        gate.resize(3);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn generation_counts_resizes() {
        let gate = AdmissionGate::new(5);
        assert_eq!(gate.generation(), 0);
        gate.resize(6);
        gate.resize(6);
        assert_eq!(gate.generation(), 2);
    }

    #[test]
    fn permit_releases_on_drop() {
        let gate = AdmissionGate::new(1);
        let permit = gate.try_permit().unwrap();
        assert!(gate.try_permit().is_none());

        drop(permit);
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.try_permit().is_some());
    }

    #[test]
    fn permit_releases_on_panic() {
        let gate = AdmissionGate::new(1);
        let cloned = gate.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _permit = cloned.try_permit().unwrap();
            panic!("handler blew up");
        }));

        assert!(result.is_err());
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn concurrent_holders_never_exceed_capacity() {
        const CAPACITY: usize = 4;
        let gate = AdmissionGate::new(CAPACITY);
        let holders = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    for _ in 0..2_000 {
                        if let Some(_permit) = gate.try_permit() {
                            let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            std::thread::yield_now();
                            holders.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= CAPACITY);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn concurrent_resize_is_safe() {
        let gate = AdmissionGate::new(8);
        let done = AtomicBool::new(false);
        let peak = AtomicUsize::new(0);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..500 {
                    gate.resize(1 + i % 16);
                }
                done.store(true, Ordering::SeqCst);
            });
            for _ in 0..8 {
                s.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        if let Some(_permit) = gate.try_permit() {
                            peak.fetch_max(gate.in_flight(), Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        // Largest capacity ever advertised is 16.
        assert!(peak.load(Ordering::SeqCst) <= 16);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.generation(), 500);
    }
}
