// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending write operations captured while the network is unreachable.
//!
//! A [`MutationRequest`] is what a caller hands over; the queue turns it into a
//! [`QueuedMutation`] by assigning an id and an insertion timestamp.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// HTTP methods a queued mutation may use.
pub const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

/// A write the caller wants delivered to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    /// Target URL, absolute or relative to the HTTP client's base URL.
    pub url: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Optional JSON body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl MutationRequest {
    /// Creates a request, normalizing the method to upper case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMethod`] for methods outside [`ALLOWED_METHODS`]
    /// and [`Error::EmptyUrl`] when the url is blank.
    pub fn new(method: &str, url: impl Into<String>, body: Option<Value>) -> Result<Self> {
        let method = method.trim().to_ascii_uppercase();
        if !ALLOWED_METHODS.contains(&method.as_str()) {
            return Err(Error::InvalidMethod(method));
        }
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::EmptyUrl);
        }
        Ok(MutationRequest { url, method, body })
    }

    /// Shorthand for a `POST` with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        MutationRequest {
            url: url.into(),
            method: "POST".to_string(),
            body: Some(body),
        }
    }
}

/// A mutation persisted in the offline queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    /// Queue-assigned identifier.
    pub id: String,
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Insertion time in epoch milliseconds, assigned by the queue.
    pub timestamp: i64,
    /// Number of server-side replay failures recorded so far.
    #[serde(default)]
    pub attempts: u32,
}

impl QueuedMutation {
    /// Wraps a request with its queue-assigned id and timestamp.
    pub fn new(id: impl Into<String>, request: MutationRequest, timestamp: i64) -> Self {
        QueuedMutation {
            id: id.into(),
            url: request.url,
            method: request.method,
            body: request.body,
            timestamp,
            attempts: 0,
        }
    }

    /// The request exactly as it was captured.
    pub fn request(&self) -> MutationRequest {
        MutationRequest {
            url: self.url.clone(),
            method: self.method.clone(),
            body: self.body.clone(),
        }
    }
}

/// A mutation that was given up on after repeated server failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub mutation: QueuedMutation,
    /// Last failure seen for this mutation.
    pub reason: String,
    /// When the mutation was moved out of the queue, epoch milliseconds.
    pub failed_at: i64,
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
