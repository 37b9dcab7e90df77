// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use outbox_core::protocol::WILDCARD;
use outbox_core::Envelope;

/// Callback for realtime events.
pub type EventHandler = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Handlers keyed by event name.
///
/// A key is removed as soon as its last handler is, so [`Self::events`]
/// always lists exactly the events someone is listening to.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: HashMap<String, Vec<(u64, EventHandler)>>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler. Returns its id and whether the registry was empty.
    pub fn insert(&mut self, event: &str, handler: EventHandler) -> (u64, bool) {
        let was_empty = self.is_empty();
        self.next_id += 1;
        let id = self.next_id;
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        (id, was_empty)
    }

    /// Removes one handler. Returns false if it was not registered.
    pub fn remove(&mut self, event: &str, id: u64) -> bool {
        let Some(list) = self.handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(hid, _)| *hid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(event);
        }
        removed
    }

    /// Handlers for `event` followed by wildcard handlers.
    pub fn handlers_for(&self, event: &str) -> Vec<EventHandler> {
        let exact = self.handlers.get(event).into_iter().flatten();
        let wildcard = if event == WILDCARD {
            None
        } else {
            self.handlers.get(WILDCARD)
        };
        exact
            .chain(wildcard.into_iter().flatten())
            .map(|(_, h)| h.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Total number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Event names with at least one handler, sorted.
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.handlers.keys().cloned().collect();
        events.sort();
        events
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
