// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox-core: shared data model for the outbox offline sync client.
//!
//! This crate holds the types that cross component and wire boundaries:
//! queued mutations as persisted at rest, realtime frames, reachability, and
//! the reconnect backoff schedule.

pub mod backoff;
pub mod error;
pub mod mutation;
pub mod protocol;
pub mod reachability;

pub use backoff::Backoff;
pub use error::{Error, Result};
pub use mutation::{DeadLetter, MutationRequest, QueuedMutation, ALLOWED_METHODS};
pub use protocol::Envelope;
pub use reachability::Reachability;
