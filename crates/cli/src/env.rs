// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by outbox are defined here
//! with typed accessor functions. The variable name constants are generated
//! by `build.rs` and live in the [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the value of `OUTBOX_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    non_empty(vars::OUTBOX_CONFIG).map(PathBuf::from)
}

/// Returns the value of `OUTBOX_DATA_DIR` if set.
pub fn data_dir() -> Option<PathBuf> {
    non_empty(vars::OUTBOX_DATA_DIR).map(PathBuf::from)
}

/// Returns the value of `OUTBOX_QUEUE_KEY` if set.
pub fn queue_key() -> Option<String> {
    non_empty(vars::OUTBOX_QUEUE_KEY)
}

/// Returns the value of `OUTBOX_ACCESS_TOKEN` if set and non-empty.
pub fn access_token() -> Option<String> {
    non_empty(vars::OUTBOX_ACCESS_TOKEN)
}

/// Returns the log filter directive from `OUTBOX_LOG` if set.
pub fn log_filter() -> Option<String> {
    non_empty(vars::OUTBOX_LOG)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
