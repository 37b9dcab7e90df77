// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Mutex};

use outbox_core::MutationRequest;

use super::{DrainConfig, DrainOutcome, SyncDrainer};
use crate::connectivity::ConnectivityMonitor;
use crate::lock;
use crate::queue::{MutationQueue, QueueError};
use crate::services::{ErrorReporter, HttpClient};
use crate::subscription::Subscription;

/// Entry point for callers: queue writes while offline, replay on reconnect.
pub struct OfflineSync {
    monitor: ConnectivityMonitor,
    queue: Arc<MutationQueue>,
    drainer: Arc<SyncDrainer>,
    reporter: Arc<dyn ErrorReporter>,
    session: Mutex<Option<Session>>,
}

struct Session {
    listener: Subscription,
    drainer: Subscription,
}

impl OfflineSync {
    pub fn new(
        monitor: ConnectivityMonitor,
        queue: Arc<MutationQueue>,
        http: Arc<dyn HttpClient>,
        reporter: Arc<dyn ErrorReporter>,
        config: DrainConfig,
    ) -> Self {
        let drainer = Arc::new(SyncDrainer::new(
            queue.clone(),
            http,
            monitor.clone(),
            reporter.clone(),
            config,
        ));
        OfflineSync {
            monitor,
            queue,
            drainer,
            reporter,
            session: Mutex::new(None),
        }
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn queue(&self) -> &Arc<MutationQueue> {
        &self.queue
    }

    pub fn drainer(&self) -> &Arc<SyncDrainer> {
        &self.drainer
    }

    /// Queues the request when the last-known state is offline.
    ///
    /// Returns `true` when queued. Returns `false` when online (the caller
    /// should send it live) or when it could not be queued safely.
    pub async fn queue_request_if_offline(&self, request: MutationRequest) -> bool {
        if self.monitor.is_online() {
            return false;
        }
        match self.queue.add_to_queue(request).await {
            Ok(_) => true,
            // Already reported by the queue.
            Err(QueueError::Encrypt(_)) => false,
            Err(e) => {
                self.reporter.report("queue request", &e);
                false
            }
        }
    }

    /// Starts the live listener, attaches the drainer, then checks
    /// connectivity and drains whatever is already queued.
    pub async fn start(&self) -> DrainOutcome {
        {
            let mut session = lock(&self.session);
            if session.is_none() {
                *session = Some(Session {
                    listener: self.monitor.start_listening(),
                    drainer: self.drainer.attach(),
                });
            }
        }
        self.drainer.drain().await
    }

    /// Detaches the drainer and stops the live listener.
    pub fn stop(&self) {
        let session = lock(&self.session).take();
        if let Some(session) = session {
            session.drainer.unsubscribe();
            session.listener.unsubscribe();
        }
    }

    pub fn is_started(&self) -> bool {
        lock(&self.session).is_some()
    }
}

impl Drop for OfflineSync {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "offline_tests.rs"]
mod tests;
