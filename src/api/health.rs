//! Shared health state for the /api/health endpoint.
//! Updated by the fetch-data handler.

use std::sync::atomic::{AtomicU64, Ordering};

/// Acquisition counters. Updated on every fetch, read by /api/health.
#[derive(Default)]
pub struct HealthState {
    pub fetch_count: AtomicU64,
    pub fetch_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self) {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }
}
