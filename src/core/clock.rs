//! Clock
//!
//! Wall clock abstraction used for every expiry check.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Clock interface (for dependency injection).
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;
}

/// System wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Mock clock for testing.
#[derive(Debug, Default)]
pub struct MockClock {
    now: AtomicI64,
}

impl MockClock {
    /// Create mock clock fixed at the given epoch millisecond.
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    /// Set the current time.
    pub fn set(&self, now_millis: i64) -> &Self {
        self.now.store(now_millis, Ordering::SeqCst);
        self
    }

    /// Move the current time forward.
    pub fn advance(&self, millis: i64) -> &Self {
        self.now.fetch_add(millis, Ordering::SeqCst);
        self
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
