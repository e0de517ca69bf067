//! Per-device refresh serialization
//!
//! At most one refresh of a device runs at a time, and refreshes are spaced
//! by a minimum interval that is shorter for forced refreshes. Both checks
//! take the current instant as an argument so they can be exercised without
//! a runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// How a refresh was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Host poll loop; spaced by the regular scan interval
    Scheduled,
    /// Events, timers, commands and group cascades; spaced by the forced interval
    Forced,
}

/// Why a refresh did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSkipped {
    /// Another refresh of the same device is still running
    InFlight,
    /// The previous refresh started less than the minimum interval ago
    TooSoon { remaining: Duration },
}

/// In-flight flag plus minimum-interval check for one device
#[derive(Debug)]
pub struct RefreshGuard {
    in_flight: AtomicBool,
    last_started: Mutex<Option<Instant>>,
    min_interval: Duration,
    forced_min_interval: Duration,
}

impl RefreshGuard {
    pub fn new(min_interval: Duration, forced_min_interval: Duration) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            last_started: Mutex::new(None),
            min_interval,
            forced_min_interval,
        }
    }

    /// Try to start a refresh at `now`
    ///
    /// The returned permit keeps the device marked in flight until dropped.
    pub fn try_acquire(
        &self,
        mode: RefreshMode,
        now: Instant,
    ) -> Result<RefreshPermit<'_>, RefreshSkipped> {
        let mut last_started = self.last_started.lock();

        if self.in_flight.load(Ordering::Acquire) {
            return Err(RefreshSkipped::InFlight);
        }

        let interval = match mode {
            RefreshMode::Scheduled => self.min_interval,
            RefreshMode::Forced => self.forced_min_interval,
        };
        if let Some(previous) = *last_started {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < interval {
                return Err(RefreshSkipped::TooSoon {
                    remaining: interval - elapsed,
                });
            }
        }

        self.in_flight.store(true, Ordering::Release);
        *last_started = Some(now);
        Ok(RefreshPermit { guard: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_started(&self) -> Option<Instant> {
        *self.last_started.lock()
    }
}

/// Marks a refresh in flight for as long as it lives
#[derive(Debug)]
pub struct RefreshPermit<'a> {
    guard: &'a RefreshGuard,
}

impl Drop for RefreshPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}
