//! Wall-clock sources used to stamp nonces.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of the current wall-clock time in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// System clock backed by `chrono::Utc`.
///
/// Clocks set before 1970 report 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: u64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    /// Move the clock forward, saturating at `u64::MAX`. Returns the new time.
    pub fn advance(&self, millis: u64) -> u64 {
        match self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(millis))
            }) {
            Ok(prev) | Err(prev) => prev.saturating_add(millis),
        }
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}
