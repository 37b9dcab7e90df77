// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP replay of queued mutations.

use std::sync::Arc;
use std::time::Duration;

use outbox_core::MutationRequest;
use reqwest::{Method, StatusCode};
use url::Url;

use super::{BoxFuture, TokenProvider};

/// Longest response body kept in an error message.
const MAX_MESSAGE_LEN: usize = 200;

/// Error type for HTTP replay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// The server could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// Transient server-side failure (5xx, 408, 429).
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The server refused the payload.
    #[error("rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpError {
    /// Classifies a non-success status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status >= 500 || status == 408 || status == 429 {
            HttpError::Server { status, message }
        } else {
            HttpError::Rejected { status, message }
        }
    }

    /// Whether the mutation should stay queued for a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HttpError::Network(_) | HttpError::Server { .. })
    }

    /// Whether this failure counts against the mutation's attempt budget.
    ///
    /// Network failures describe the environment, not the mutation.
    pub fn counts_as_attempt(&self) -> bool {
        matches!(self, HttpError::Server { .. })
    }
}

/// Result type for HTTP replay.
pub type HttpResult<T> = Result<T, HttpError>;

/// Issues a captured mutation against the server.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: &'a MutationRequest) -> BoxFuture<'a, HttpResult<()>>;
}

/// `reqwest` client with an optional base URL and bearer token.
pub struct ReqwestClient {
    client: reqwest::Client,
    base_url: Option<Url>,
    token: Option<Arc<dyn TokenProvider>>,
}

impl ReqwestClient {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> HttpResult<Self> {
        let base_url = base_url
            .filter(|b| !b.is_empty())
            .map(Url::parse)
            .transpose()
            .map_err(|e| HttpError::InvalidRequest(format!("base url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
        Ok(ReqwestClient {
            client,
            base_url,
            token: None,
        })
    }

    /// Attaches `Authorization: Bearer` from the provider when it has a token.
    pub fn with_token(mut self, token: Arc<dyn TokenProvider>) -> Self {
        self.token = Some(token);
        self
    }

    /// Resolves a mutation URL, joining relative paths onto the base URL.
    pub fn resolve(&self, url: &str) -> HttpResult<Url> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .as_ref()
                .ok_or_else(|| {
                    HttpError::InvalidRequest(format!("relative url '{url}' needs a base url"))
                })?
                .join(url)
                .map_err(|e| HttpError::InvalidRequest(e.to_string())),
            Err(e) => Err(HttpError::InvalidRequest(e.to_string())),
        }
    }

    async fn send(&self, request: &MutationRequest) -> HttpResult<()> {
        let url = self.resolve(&request.url)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(provider) = &self.token {
            if let Some(token) = provider.access_token().await {
                builder = builder.bearer_auth(token);
            }
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(HttpError::from_status(status.as_u16(), summarize(status, &body)))
    }
}

impl HttpClient for ReqwestClient {
    fn execute<'a>(&'a self, request: &'a MutationRequest) -> BoxFuture<'a, HttpResult<()>> {
        Box::pin(self.send(request))
    }
}

fn classify(err: reqwest::Error) -> HttpError {
    if err.is_builder() {
        HttpError::InvalidRequest(err.to_string())
    } else {
        HttpError::Network(err.to_string())
    }
}

fn summarize(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.canonical_reason().unwrap_or("no reason").to_string();
    }
    body.chars().take(MAX_MESSAGE_LEN).collect()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
