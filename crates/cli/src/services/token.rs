// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Access token sources for the realtime channel.

use super::BoxFuture;
use crate::env;

/// Supplies the current access token, `None` when signed out.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, Option<String>>;
}

/// Fixed token.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        StaticToken(token.filter(|t| !t.is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { self.0.clone() })
    }
}

/// Reads `OUTBOX_ACCESS_TOKEN` on every call, falling back to a configured
/// token when the variable is unset or empty.
#[derive(Debug, Clone, Default)]
pub struct EnvToken {
    fallback: Option<String>,
}

impl EnvToken {
    pub fn new(fallback: Option<String>) -> Self {
        EnvToken {
            fallback: fallback.filter(|t| !t.is_empty()),
        }
    }
}

impl TokenProvider for EnvToken {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { env::access_token().or_else(|| self.fallback.clone()) })
    }
}
