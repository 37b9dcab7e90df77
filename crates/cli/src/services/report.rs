// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sink for failures that are handled locally instead of propagated.

use std::error::Error;

/// Receives failures the sync components swallow (discarded queues, rejected
/// replays, dead letters).
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &dyn Error);
}

/// Reports through `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &dyn Error) {
        tracing::error!(context, error = %error, "sync failure");
    }
}
