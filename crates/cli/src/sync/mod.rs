// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first sync: queue while offline, replay once back online.
//!
//! - [`SyncDrainer`] replays the queue in order through an [`HttpClient`]
//! - [`OfflineSync`] wires a monitor, a queue and a drainer together
//!
//! [`HttpClient`]: crate::services::HttpClient

mod drainer;
mod offline;

pub use drainer::{DrainConfig, DrainOutcome, DrainReport, SyncDrainer, DEFAULT_MAX_ATTEMPTS};
pub use offline::OfflineSync;
