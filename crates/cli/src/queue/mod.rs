// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Encrypted offline queue of pending mutations.
//!
//! The whole queue is stored as one ciphertext blob under a single key.
//! Dead letters live under `<key>_dead_letter` in the same format.

use crate::services::{CryptoError, StorageError};

mod encrypted;

pub use encrypted::MutationQueue;

/// Default storage key of the queue.
pub const DEFAULT_QUEUE_KEY: &str = "offline_queue";

/// Suffix appended to the queue key for the dead-letter list.
pub const DEAD_LETTER_SUFFIX: &str = "_dead_letter";

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Encryption failed; nothing was written.
    #[error("refusing to persist unencrypted queue: {0}")]
    Encrypt(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("queued mutation not found: {0}")]
    NotFound(String),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
