// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use outbox_core::Reachability;

use super::{ConnectivityProvider, RemoveListener};
use crate::lock;
use crate::subscription::Subscription;

type Handler = Arc<dyn Fn(bool) + Send + Sync>;

/// Last-known connectivity with change notification.
///
/// Clones share state. The first resolved value is a baseline and does not
/// notify; afterwards subscribers run only when the boolean flips.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn ConnectivityProvider>,
    state: Mutex<State>,
    listener: Mutex<Option<ActiveListener>>,
    generation: AtomicU64,
}

#[derive(Default)]
struct State {
    reachability: Reachability,
    last: Option<bool>,
    next_id: u64,
    subscribers: Vec<(u64, Handler)>,
}

struct ActiveListener {
    generation: u64,
    remove: RemoveListener,
    handle: Subscription,
}

impl ConnectivityMonitor {
    pub fn new(provider: Arc<dyn ConnectivityProvider>) -> Self {
        ConnectivityMonitor {
            inner: Arc::new(Inner {
                provider,
                state: Mutex::new(State::default()),
                listener: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Queries the provider once. Failures and unknown answers resolve to
    /// offline.
    pub async fn check_connectivity(&self) -> bool {
        let status = match self.inner.provider.fetch().await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(error = %e, "connectivity check failed");
                None
            }
        };
        self.inner.apply(status)
    }

    /// Registers the live platform listener. Returns the existing handle when
    /// one is already registered.
    pub fn start_listening(&self) -> Subscription {
        let mut slot = lock(&self.inner.listener);
        if let Some(active) = slot.as_ref() {
            return active.handle.clone();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let weak = Arc::downgrade(&self.inner);
        let remove = self.inner.provider.add_listener(Arc::new(move |status| {
            if let Some(inner) = weak.upgrade() {
                inner.apply(status);
            }
        }));

        let weak = Arc::downgrade(&self.inner);
        let handle = Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.stop(Some(generation));
            }
        });

        tracing::debug!(generation, "connectivity listener started");
        *slot = Some(ActiveListener {
            generation,
            remove,
            handle: handle.clone(),
        });
        handle
    }

    /// Removes the live listener if one is registered.
    pub fn stop_listening(&self) {
        self.inner.stop(None);
    }

    pub fn is_listening(&self) -> bool {
        lock(&self.inner.listener).is_some()
    }

    /// Adds a change handler.
    pub fn subscribe(&self, handler: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut state = lock(&self.inner.state);
            state.next_id += 1;
            let id = state.next_id;
            state.subscribers.push((id, Arc::new(handler)));
            id
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.state).subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }

    /// Last-known state, `false` before any check.
    pub fn is_online(&self) -> bool {
        self.reachability().is_online()
    }

    pub fn reachability(&self) -> Reachability {
        lock(&self.inner.state).reachability
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        lock(&self.inner.state).subscribers.len()
    }
}

impl Inner {
    /// Records a status and notifies on change. Returns the resolved boolean.
    fn apply(&self, status: Option<bool>) -> bool {
        let reachability = Reachability::from_status(status);
        let online = reachability.is_online();

        let handlers: Vec<Handler> = {
            let mut state = lock(&self.state);
            let previous = state.last.replace(online);
            state.reachability = reachability;
            if previous.is_some_and(|p| p != online) {
                state.subscribers.iter().map(|(_, h)| h.clone()).collect()
            } else {
                Vec::new()
            }
        };

        if !handlers.is_empty() {
            tracing::info!(%reachability, "connectivity changed");
        }
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(online))).is_err() {
                tracing::error!("connectivity subscriber panicked");
            }
        }
        online
    }

    /// Removes the listener. With a generation, only that session is stopped.
    fn stop(&self, generation: Option<u64>) {
        let active = {
            let mut slot = lock(&self.listener);
            match (slot.as_ref(), generation) {
                (Some(active), Some(g)) if active.generation != g => None,
                _ => slot.take(),
            }
        };

        if let Some(active) = active {
            tracing::debug!(generation = active.generation, "connectivity listener stopped");
            (active.remove)();
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
