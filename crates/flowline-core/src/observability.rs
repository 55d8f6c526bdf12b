//! Terminal-event counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Thread-safe success/fail/skip tally, incremented from listener hooks.
#[derive(Debug, Default)]
pub struct FlowCounts {
    success: AtomicU64,
    fail: AtomicU64,
    skip: AtomicU64,
}

impl FlowCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_fail(&self) {
        self.fail.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_skip(&self) {
        self.skip.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountsSnapshot {
        CountsSnapshot {
            success: self.success.load(Ordering::Relaxed),
            fail: self.fail.load(Ordering::Relaxed),
            skip: self.skip.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsSnapshot {
    pub success: u64,
    pub fail: u64,
    pub skip: u64,
}

impl CountsSnapshot {
    pub fn total(&self) -> u64 {
        self.success + self.fail + self.skip
    }
}

impl std::fmt::Display for CountsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "success: {}, failure: {}, skipped: {}",
            self.success, self.fail, self.skip
        )
    }
}
