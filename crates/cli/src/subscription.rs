// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capability handles returned by subscribe-style operations.

use std::sync::{Arc, Mutex};

use crate::lock;

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle that undoes one registration.
///
/// Cloning shares the handle; whichever clone unsubscribes first runs the
/// teardown and every later call is a no-op.
#[derive(Clone)]
pub struct Subscription {
    teardown: Arc<Mutex<Option<Teardown>>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            teardown: Arc::new(Mutex::new(Some(Box::new(teardown)))),
        }
    }

    /// A handle with nothing to undo.
    pub fn noop() -> Self {
        Subscription {
            teardown: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs the teardown once. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        let teardown = lock(&self.teardown).take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.teardown).is_some()
    }

    /// Whether both handles refer to the same registration.
    pub fn same_as(&self, other: &Subscription) -> bool {
        Arc::ptr_eq(&self.teardown, &other.teardown)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
