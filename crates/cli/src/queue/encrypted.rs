// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use chrono::Utc;
use outbox_core::{DeadLetter, MutationRequest, QueuedMutation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{QueueError, QueueResult, DEAD_LETTER_SUFFIX};
use crate::services::{Cipher, CryptoError, ErrorReporter, KeyValueStore};

/// FIFO of pending mutations, encrypted at rest.
///
/// Every operation holds an async lock across its read-modify-write, so
/// concurrent callers sharing one instance never interleave writes.
pub struct MutationQueue {
    store: Arc<dyn KeyValueStore>,
    cipher: Arc<dyn Cipher>,
    reporter: Arc<dyn ErrorReporter>,
    key: String,
    dead_letter_key: String,
    write_lock: Mutex<()>,
}

impl MutationQueue {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cipher: Arc<dyn Cipher>,
        reporter: Arc<dyn ErrorReporter>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        MutationQueue {
            dead_letter_key: format!("{key}{DEAD_LETTER_SUFFIX}"),
            store,
            cipher,
            reporter,
            key,
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dead_letter_key(&self) -> &str {
        &self.dead_letter_key
    }

    /// Current queue, oldest first. Unreadable data is discarded and reported.
    pub async fn get_queue(&self) -> Vec<QueuedMutation> {
        let _guard = self.write_lock.lock().await;
        self.read_or_empty(&self.key).await
    }

    pub async fn len(&self) -> usize {
        self.get_queue().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Oldest queued mutation.
    pub async fn head(&self) -> Option<QueuedMutation> {
        self.get_queue().await.into_iter().next()
    }

    /// Appends a mutation, assigning its id and timestamp.
    ///
    /// When encryption fails nothing is written and the error is returned.
    pub async fn add_to_queue(&self, request: MutationRequest) -> QueueResult<QueuedMutation> {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<QueuedMutation> = self.load(&self.key).await?;

        let mutation = QueuedMutation::new(
            Uuid::new_v4().to_string(),
            request,
            Utc::now().timestamp_millis(),
        );
        items.push(mutation.clone());
        self.persist(&self.key, &items).await?;

        tracing::debug!(id = %mutation.id, method = %mutation.method, "mutation queued");
        Ok(mutation)
    }

    pub async fn remove_from_queue(&self, id: &str) -> QueueResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<QueuedMutation> = self.load(&self.key).await?;

        let before = items.len();
        items.retain(|m| m.id != id);
        if items.len() == before {
            return Err(QueueError::NotFound(id.to_string()));
        }
        self.persist(&self.key, &items).await
    }

    /// Increments the attempt count of a mutation, returning the new count.
    pub async fn record_failure(&self, id: &str) -> QueueResult<u32> {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<QueuedMutation> = self.load(&self.key).await?;

        let mutation = items
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        mutation.attempts = mutation.attempts.saturating_add(1);
        let attempts = mutation.attempts;

        self.persist(&self.key, &items).await?;
        Ok(attempts)
    }

    /// Moves a mutation from the queue to the dead-letter list.
    pub async fn move_to_dead_letter(&self, id: &str, reason: &str) -> QueueResult<DeadLetter> {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<QueuedMutation> = self.load(&self.key).await?;

        let index = items
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        let letter = DeadLetter {
            mutation: items.remove(index),
            reason: reason.to_string(),
            failed_at: Utc::now().timestamp_millis(),
        };

        // Dead letter first: a failure in between duplicates, never loses.
        let mut letters: Vec<DeadLetter> = self.load(&self.dead_letter_key).await?;
        letters.push(letter.clone());
        self.persist(&self.dead_letter_key, &letters).await?;
        self.persist(&self.key, &items).await?;

        tracing::warn!(id, attempts = letter.mutation.attempts, "mutation dead-lettered");
        Ok(letter)
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        let _guard = self.write_lock.lock().await;
        self.read_or_empty(&self.dead_letter_key).await
    }

    /// Deletes the queue and its dead letters.
    pub async fn clear_queue(&self) -> QueueResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove_item(&self.key).await?;
        self.store.remove_item(&self.dead_letter_key).await?;
        Ok(())
    }

    pub async fn clear_dead_letters(&self) -> QueueResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove_item(&self.dead_letter_key).await?;
        Ok(())
    }

    async fn read_or_empty<T>(&self, key: &str) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.load(key).await {
            Ok(items) => items,
            Err(e) => {
                self.reporter.report("queue read", &e);
                Vec::new()
            }
        }
    }

    /// Reads and decodes a list. Storage read failures and a missing key
    /// propagate; undecodable data is discarded.
    async fn load<T>(&self, key: &str) -> QueueResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(raw) = self.store.get_item(key).await? else {
            return Ok(Vec::new());
        };

        if is_legacy_plaintext(&raw) {
            return Ok(self.migrate_legacy(key, &raw).await);
        }

        let decoded = match self.cipher.decrypt(&raw) {
            // Kept as is; only a keyed run can read it.
            Err(CryptoError::Unavailable) => return Err(CryptoError::Unavailable.into()),
            Err(e) => Err(QueueError::from(e)),
            Ok(json) => serde_json::from_str(&json).map_err(QueueError::from),
        };
        match decoded {
            Ok(items) => Ok(items),
            Err(e) => {
                self.discard(key, "queue decode", &e).await;
                Ok(Vec::new())
            }
        }
    }

    /// Re-encrypts a plaintext list in place. Plaintext never stays at rest:
    /// if it cannot be re-encrypted and written, it is deleted.
    async fn migrate_legacy<T>(&self, key: &str, raw: &str) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let items: Vec<T> = match serde_json::from_str(raw) {
            Ok(items) => items,
            Err(e) => {
                self.discard(key, "legacy queue decode", &QueueError::from(e))
                    .await;
                return Vec::new();
            }
        };

        match self.persist(key, &items).await {
            Ok(()) => {
                tracing::info!(key, count = items.len(), "migrated plaintext queue");
                items
            }
            Err(e) => {
                self.discard(key, "legacy queue migration", &e).await;
                Vec::new()
            }
        }
    }

    async fn persist<T: Serialize>(&self, key: &str, items: &[T]) -> QueueResult<()> {
        let json = serde_json::to_string(items)?;
        let sealed = match self.cipher.encrypt(&json) {
            Ok(sealed) => sealed,
            Err(e) => {
                let err = QueueError::from(e);
                self.reporter.report("queue encrypt", &err);
                return Err(err);
            }
        };
        self.store.set_item(key, &sealed).await?;
        Ok(())
    }

    async fn discard(&self, key: &str, context: &str, error: &QueueError) {
        tracing::warn!(key, "discarding unreadable queue data");
        if let Err(e) = self.store.remove_item(key).await {
            self.reporter.report("queue discard", &e);
        }
        self.reporter.report(context, error);
    }
}

fn is_legacy_plaintext(raw: &str) -> bool {
    raw.trim_start().starts_with('[')
}

#[cfg(test)]
#[path = "encrypted_tests.rs"]
mod tests;
