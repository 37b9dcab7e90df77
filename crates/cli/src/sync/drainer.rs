// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential replay of queued mutations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use outbox_core::QueuedMutation;
use serde::Serialize;

use crate::connectivity::ConnectivityMonitor;
use crate::queue::{MutationQueue, QueueError};
use crate::services::{ErrorReporter, HttpClient, HttpError};
use crate::subscription::Subscription;

/// Default number of server failures before a mutation is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Configuration for the drainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainConfig {
    /// Server failures per mutation before it is dead-lettered (0 = never).
    pub max_attempts: u32,
    /// Re-check connectivity before every item after the first.
    pub recheck_connectivity: bool,
}

impl Default for DrainConfig {
    fn default() -> Self {
        DrainConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            recheck_connectivity: true,
        }
    }
}

/// Tally of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub sent: usize,
    pub rejected: usize,
    pub dead_lettered: usize,
    /// Stopped before the queue was empty.
    pub halted: bool,
}

/// Result of a [`SyncDrainer::drain`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain was running; nothing was done.
    AlreadyDraining,
    /// Connectivity check failed; nothing was sent.
    Offline,
    Drained(DrainReport),
}

/// Replays the queue oldest first, one request at a time.
pub struct SyncDrainer {
    queue: Arc<MutationQueue>,
    http: Arc<dyn HttpClient>,
    monitor: ConnectivityMonitor,
    reporter: Arc<dyn ErrorReporter>,
    config: DrainConfig,
    draining: AtomicBool,
}

/// Clears the single-flight flag when a drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What to do after one item.
enum Step {
    Continue,
    Halt,
}

impl SyncDrainer {
    pub fn new(
        queue: Arc<MutationQueue>,
        http: Arc<dyn HttpClient>,
        monitor: ConnectivityMonitor,
        reporter: Arc<dyn ErrorReporter>,
        config: DrainConfig,
    ) -> Self {
        SyncDrainer {
            queue,
            http,
            monitor,
            reporter,
            config,
            draining: AtomicBool::new(false),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn config(&self) -> DrainConfig {
        self.config
    }

    /// Runs one drain pass.
    ///
    /// The queue head is re-read on every iteration, so mutations added while
    /// draining are sent in the same pass.
    pub async fn drain(&self) -> DrainOutcome {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            tracing::debug!("drain already running");
            return DrainOutcome::AlreadyDraining;
        };

        if !self.monitor.check_connectivity().await {
            tracing::debug!("offline; drain skipped");
            return DrainOutcome::Offline;
        }

        let mut report = DrainReport::default();
        let mut first = true;
        loop {
            if !first && self.config.recheck_connectivity && !self.monitor.check_connectivity().await
            {
                tracing::info!("connectivity lost; drain halted");
                report.halted = true;
                break;
            }
            first = false;

            let Some(mutation) = self.queue.head().await else {
                break;
            };
            if let Step::Halt = self.replay(&mutation, &mut report).await {
                report.halted = true;
                break;
            }
        }

        if report.sent + report.rejected + report.dead_lettered > 0 || report.halted {
            tracing::info!(
                sent = report.sent,
                rejected = report.rejected,
                dead_lettered = report.dead_lettered,
                halted = report.halted,
                "drain finished"
            );
        }
        DrainOutcome::Drained(report)
    }

    /// Subscribes the drainer to the monitor so every transition to online
    /// spawns a drain on the current runtime.
    pub fn attach(self: &Arc<Self>) -> Subscription {
        let weak = Arc::downgrade(self);
        self.monitor.subscribe(move |online| {
            if !online {
                return;
            }
            let Some(drainer) = weak.upgrade() else {
                return;
            };
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        drainer.drain().await;
                    });
                }
                Err(_) => tracing::warn!("back online but no async runtime to drain on"),
            }
        })
    }

    async fn replay(&self, mutation: &QueuedMutation, report: &mut DrainReport) -> Step {
        tracing::debug!(id = %mutation.id, method = %mutation.method, url = %mutation.url, "replaying");

        match self.http.execute(&mutation.request()).await {
            Ok(()) => {
                report.sent += 1;
                self.remove(&mutation.id).await
            }
            Err(e) if e.is_retryable() => {
                if e.counts_as_attempt() {
                    self.count_failure(mutation, &e, report).await
                } else {
                    tracing::info!(error = %e, "replay deferred");
                    Step::Halt
                }
            }
            Err(e) => {
                self.reporter.report("mutation rejected", &e);
                report.rejected += 1;
                self.remove(&mutation.id).await
            }
        }
    }

    /// Counts a failed attempt. Only a head moved to the dead letters lets
    /// the pass go on to the next item.
    async fn count_failure(&self, mutation: &QueuedMutation, error: &HttpError, report: &mut DrainReport) -> Step {
        let attempts = match self.queue.record_failure(&mutation.id).await {
            Ok(attempts) => attempts,
            Err(QueueError::NotFound(_)) => return Step::Halt,
            Err(e) => {
                self.reporter.report("record replay failure", &e);
                return Step::Halt;
            }
        };
        tracing::info!(id = %mutation.id, attempts, error = %error, "replay failed");

        if self.config.max_attempts == 0 || attempts < self.config.max_attempts {
            return Step::Halt;
        }
        match self.queue.move_to_dead_letter(&mutation.id, &error.to_string()).await {
            Ok(_) => {
                self.reporter.report("mutation dead-lettered", error);
                report.dead_lettered += 1;
                Step::Continue
            }
            Err(QueueError::NotFound(_)) => Step::Halt,
            Err(e) => {
                self.reporter.report("dead-letter mutation", &e);
                Step::Halt
            }
        }
    }

    /// A removal that fails would replay the same head forever, so it halts.
    async fn remove(&self, id: &str) -> Step {
        match self.queue.remove_from_queue(id).await {
            Ok(()) | Err(QueueError::NotFound(_)) => Step::Continue,
            Err(e) => {
                self.reporter.report("remove replayed mutation", &e);
                Step::Halt
            }
        }
    }
}

#[cfg(test)]
#[path = "drainer_tests.rs"]
mod tests;
