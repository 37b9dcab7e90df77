// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::queue::QueueError;
use crate::realtime::ConnectError;
use crate::services::{CryptoError, HttpError, StorageError};

/// Errors surfaced by the `outbox` command line.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] outbox_core::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("request failed: {0}")]
    Http(#[from] HttpError),

    #[error("realtime connect failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("invalid body: {0}\n  hint: the body must be valid JSON, e.g. '{{\"title\":\"x\"}}'")]
    InvalidBody(String),

    #[error("offline and the mutation could not be queued\n  hint: check the queue key with 'outbox status'; create one with 'outbox keygen --write'")]
    QueueUnavailable,

    #[error("realtime is not configured\n  hint: set [realtime] url in the config file")]
    RealtimeNotConfigured,

    #[error("key file already exists: {0}\n  hint: remove it first to rotate keys; queued data encrypted with the old key becomes unreadable")]
    KeyExists(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
