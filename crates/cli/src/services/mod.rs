// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator seams used by the sync components.
//!
//! Each seam is a trait with one or more production implementations:
//! - [`Cipher`] - encryption of the queue at rest
//! - [`KeyValueStore`] - persistent string storage
//! - [`ErrorReporter`] - sink for failures that are not propagated
//! - [`TokenProvider`] - credentials for the realtime channel
//! - [`HttpClient`] - replay of queued mutations

use std::future::Future;
use std::pin::Pin;

pub mod crypto;
pub mod http;
pub mod report;
pub mod storage;
pub mod token;

pub use crypto::{ChaChaCipher, Cipher, CryptoError, DisabledCipher};
pub use http::{HttpClient, HttpError, ReqwestClient};
pub use report::{ErrorReporter, TracingReporter};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};
pub use token::{EnvToken, StaticToken, TokenProvider};

/// Boxed future returned by the async collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
