//! Call quota bookkeeping
//!
//! The remote service grants a fixed number of calls per window (a day for
//! the Steam Web API). `QuotaState` counts logical calls in the current
//! window and knows when the window resets. It is owned by the
//! `RateLimitedClient` and only ever mutated under the client's lock.

use tokio::time::{Duration, Instant};

/// Calls made in the current window and the instant the window resets
#[derive(Debug, Clone)]
pub struct QuotaState {
    limit: u64,
    window: Duration,
    calls_made: u64,
    reset_at: Instant,
    total_calls: u64,
}

impl QuotaState {
    /// Creates a quota whose first window starts now
    pub fn new(limit: u64, window: Duration) -> Self {
        Self::starting_at(limit, window, Instant::now())
    }

    pub fn starting_at(limit: u64, window: Duration, now: Instant) -> Self {
        Self {
            limit,
            window,
            calls_made: 0,
            reset_at: now + window,
            total_calls: 0,
        }
    }

    /// Returns how long the next call has to wait, rolling the window over
    /// first if its reset instant has passed
    ///
    /// `None` means a call may be issued immediately.
    pub fn wait_time(&mut self, now: Instant) -> Option<Duration> {
        if now >= self.reset_at {
            self.reset(now);
        }

        if self.calls_made >= self.limit {
            Some(self.reset_at.saturating_duration_since(now))
        } else {
            None
        }
    }

    /// Zeroes the counter and starts a new window at `now`
    pub fn reset(&mut self, now: Instant) {
        self.calls_made = 0;
        self.reset_at = now + self.window;
    }

    /// Counts one logical call against the current window
    pub fn record_call(&mut self) {
        self.calls_made += 1;
        self.total_calls += 1;
    }

    /// Calls counted in the current window
    pub fn calls_made(&self) -> u64 {
        self.calls_made
    }

    /// Calls counted since the client was created
    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn reset_at(&self) -> Instant {
        self.reset_at
    }
}
