use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub lookups_started: Arc<AtomicU64>,
    pub lookups_applied: Arc<AtomicU64>,
    pub lookups_superseded: Arc<AtomicU64>,
    pub lookups_cancelled: Arc<AtomicU64>,
    pub fetch_failures: Arc<AtomicU64>,

    pub bookings_created: Arc<AtomicU64>,
    pub payments_confirmed: Arc<AtomicU64>,
    pub payments_pending: Arc<AtomicU64>,
    pub submission_failures: Arc<AtomicU64>,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
