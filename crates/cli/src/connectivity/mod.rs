// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network connectivity tracking.
//!
//! A [`ConnectivityProvider`] answers one-shot reachability queries and can
//! push status events. [`ConnectivityMonitor`] turns both into a single
//! last-known boolean and notifies subscribers only when it changes.

use std::sync::Arc;

use crate::services::BoxFuture;

mod monitor;
mod probe;

pub use monitor::ConnectivityMonitor;
pub use probe::TcpProbe;

/// Callback a provider invokes with each status event.
pub type StatusCallback = Arc<dyn Fn(Option<bool>) + Send + Sync>;

/// Removes a provider listener.
pub type RemoveListener = Box<dyn FnOnce() + Send>;

/// Error type for connectivity queries.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid probe address: '{0}'")]
    InvalidAddress(String),

    #[error("probe failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of device reachability. `None` means the provider cannot tell.
pub trait ConnectivityProvider: Send + Sync {
    /// Queries reachability once.
    fn fetch(&self) -> BoxFuture<'_, Result<Option<bool>, ProbeError>>;

    /// Registers a live listener, returning its removal function.
    fn add_listener(&self, callback: StatusCallback) -> RemoveListener;
}
