// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server-push event channel.
//!
//! One shared socket per [`RealtimeChannel`], opened while at least one
//! subscription exists, authenticated with a query-string token, and
//! reconnected with capped exponential backoff.

mod channel;
mod registry;
mod transport;

pub use channel::{ChannelPhase, ConnectError, RealtimeChannel, RealtimeConfig};
pub use registry::{EventHandler, SubscriptionRegistry};
pub use transport::{
    Connection, FrameSink, FrameStream, Transport, TransportError, TransportResult,
    WebSocketTransport,
};
