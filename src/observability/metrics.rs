//! Store metrics for slotdb
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics; exact totals, no cross-counter consistency

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by the store and the session coordinator
#[derive(Debug, Default)]
pub struct StoreMetrics {
    creates: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    stale_rejections: AtomicU64,
    policy_rejections: AtomicU64,
    persist_failures: AtomicU64,
    locks_acquired: AtomicU64,
    /// Acquisitions that had to wait for another holder
    lock_waits: AtomicU64,
    queries: AtomicU64,
    /// Candidates dropped by re-verification
    candidates_dropped: AtomicU64,
}

impl StoreMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_creates(&self) {
        self.creates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_rejections(&self) {
        self.stale_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_policy_rejections(&self) {
        self.policy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_persist_failures(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a granted lock, noting whether the caller had to wait
    pub fn record_lock(&self, waited: bool) {
        self.locks_acquired.fetch_add(1, Ordering::Relaxed);
        if waited {
            self.lock_waits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_candidates_dropped(&self, count: u64) {
        self.candidates_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            stale_rejections: self.stale_rejections.load(Ordering::Relaxed),
            policy_rejections: self.policy_rejections.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            locks_acquired: self.locks_acquired.load(Ordering::Relaxed),
            lock_waits: self.lock_waits.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            candidates_dropped: self.candidates_dropped.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub stale_rejections: u64,
    pub policy_rejections: u64,
    pub persist_failures: u64,
    pub locks_acquired: u64,
    pub lock_waits: u64,
    pub queries: u64,
    pub candidates_dropped: u64,
}
