// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capped exponential backoff for reconnect scheduling.

use std::time::Duration;

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE: Duration = Duration::from_secs(1);

/// Default upper bound on any reconnect delay.
pub const DEFAULT_CAP: Duration = Duration::from_secs(30);

/// Exponential backoff: attempt `n` (1-based) waits `min(cap, base * 2^(n-1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Backoff {
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Backoff { base, cap }
    }

    /// Delay before the given attempt. Attempt 0 is treated as attempt 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(DEFAULT_BASE, DEFAULT_CAP)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
