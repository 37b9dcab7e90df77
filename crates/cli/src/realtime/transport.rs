// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Socket seam for the realtime channel.
//!
//! A [`Transport`] opens a connection and hands back its two directions as a
//! text-frame sink and stream; the channel owns framing and reconnects.

use std::future::Future;
use std::pin::Pin;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::Message;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Handshake or TCP connect failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Outgoing text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Incoming text frames. Ends when the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = TransportResult<String>> + Send>>;

/// An open socket split into its two directions.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens sockets. Each call yields an independent connection.
pub trait Transport: Send + Sync + 'static {
    fn connect(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Connection>> + Send + '_>>;
}

/// WebSocket transport implementation using tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport
    }
}

impl Transport for WebSocketTransport {
    fn connect(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Connection>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();

            let sink = sink
                .sink_map_err(|e| TransportError::SendFailed(e.to_string()))
                .with(|text: String| {
                    futures_util::future::ready(Ok::<_, TransportError>(Message::Text(text.into())))
                });

            let stream = stream.filter_map(|message| {
                futures_util::future::ready(match message {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    // Close ends the stream; control and binary frames are ignored
                    Ok(_) => None,
                    Err(e) => Some(Err(TransportError::ReceiveFailed(e.to_string()))),
                })
            });

            Ok(Connection {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        })
    }
}
