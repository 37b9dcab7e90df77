// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel state machine.
//!
//! ```text
//! disconnected -> connecting -> open -> (error | close) -> disconnected
//!       ^                                                      |
//!       +------------- reconnect timer (backoff) <-------------+
//! ```
//!
//! A generation counter guards every transition: a connect attempt, socket
//! pump or timer that outlives a teardown sees a newer generation and does
//! nothing.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{FutureExt, Shared};
use futures_util::{SinkExt, StreamExt};
use outbox_core::{Backoff, Envelope};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::registry::{EventHandler, SubscriptionRegistry};
use super::transport::{Connection, FrameSink, Transport, TransportError, WebSocketTransport};
use crate::lock;
use crate::services::{BoxFuture, TokenProvider};
use crate::subscription::Subscription;

/// Watchdog period used when no idle timeout is configured. The branch is
/// disabled in that case; this only keeps the timer valid.
const NO_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for a realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Socket endpoint (`ws`, `wss`, `http` or `https`).
    pub url: String,
    /// Query parameter carrying the access token.
    pub token_param: String,
    pub backoff: Backoff,
    /// Close the socket when no frame arrives for this long.
    pub idle_timeout: Option<Duration>,
}

impl RealtimeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        RealtimeConfig {
            url: url.into(),
            token_param: "token".to_string(),
            backoff: Backoff::default(),
            idle_timeout: None,
        }
    }
}

/// Error type for connect attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// No access token; the attempt is abandoned and not retried.
    #[error("no access token available")]
    NoToken,

    #[error("invalid realtime url: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// A disconnect happened while the attempt was in flight.
    #[error("connect attempt superseded by disconnect")]
    Superseded,

    #[error("no async runtime to connect on")]
    NoRuntime,
}

impl ConnectError {
    /// Whether a failed attempt schedules a reconnect.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectError::Transport(_))
    }
}

/// Observable connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    Disconnected,
    Connecting,
    Open,
}

type PendingConnect = Shared<BoxFuture<'static, Result<(), ConnectError>>>;

enum Phase {
    Disconnected,
    /// One shared attempt that every concurrent `connect` joins.
    Connecting(PendingConnect),
    Open { shutdown: CancellationToken },
}

struct State {
    phase: Phase,
    generation: u64,
    reconnect_attempts: u32,
    reconnect_timer: Option<(u64, CancellationToken)>,
    next_timer: u64,
    /// Set by an explicit disconnect; suppresses automatic reconnects.
    manual_disconnect: bool,
}

struct Inner<T> {
    transport: T,
    tokens: Arc<dyn TokenProvider>,
    config: RealtimeConfig,
    registry: Mutex<SubscriptionRegistry>,
    state: Mutex<State>,
}

/// Why a pump stopped.
enum CloseReason {
    Closed,
    Idle,
    Failed(TransportError),
}

/// Shared realtime socket with reference-counted subscriptions.
///
/// Clones share the same socket and registry.
pub struct RealtimeChannel<T: Transport = WebSocketTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for RealtimeChannel<T> {
    fn clone(&self) -> Self {
        RealtimeChannel {
            inner: self.inner.clone(),
        }
    }
}

impl RealtimeChannel<WebSocketTransport> {
    pub fn new(tokens: Arc<dyn TokenProvider>, config: RealtimeConfig) -> Self {
        Self::with_transport(WebSocketTransport::new(), tokens, config)
    }
}

impl<T: Transport> RealtimeChannel<T> {
    pub fn with_transport(transport: T, tokens: Arc<dyn TokenProvider>, config: RealtimeConfig) -> Self {
        RealtimeChannel {
            inner: Arc::new(Inner {
                transport,
                tokens,
                config,
                registry: Mutex::new(SubscriptionRegistry::new()),
                state: Mutex::new(State {
                    phase: Phase::Disconnected,
                    generation: 0,
                    reconnect_attempts: 0,
                    reconnect_timer: None,
                    next_timer: 0,
                    manual_disconnect: false,
                }),
            }),
        }
    }

    /// Registers `handler` for `event` (`"*"` for every event).
    ///
    /// The first subscription opens the socket; dropping the last one closes it.
    pub fn subscribe(
        &self,
        event: &str,
        handler: impl Fn(&Envelope) + Send + Sync + 'static,
    ) -> Subscription {
        let handler: EventHandler = Arc::new(handler);
        let (id, first) = lock(&self.inner.registry).insert(event, handler);
        tracing::debug!(event, "realtime subscription added");

        if first {
            // Errors are logged; failures schedule their own retries.
            drop(self.inner.begin_connect());
        }

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let event = event.to_string();
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let now_empty = {
                let mut registry = lock(&inner.registry);
                registry.remove(&event, id);
                registry.is_empty()
            };
            if now_empty {
                tracing::debug!("last realtime subscription removed");
                inner.teardown(false);
            }
        })
    }

    /// Opens the socket, or joins the attempt already in flight. A prior
    /// `disconnect` stays in force until this attempt succeeds.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        self.inner.connect().await
    }

    /// Closes the socket and stops automatic reconnects until the next
    /// successful open.
    pub fn disconnect(&self) {
        self.inner.teardown(true);
    }

    /// Disconnects and drops every subscription.
    pub fn dispose(&self) {
        self.inner.teardown(true);
        lock(&self.inner.registry).clear();
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == ChannelPhase::Open
    }

    pub fn phase(&self) -> ChannelPhase {
        match lock(&self.inner.state).phase {
            Phase::Disconnected => ChannelPhase::Disconnected,
            Phase::Connecting(_) => ChannelPhase::Connecting,
            Phase::Open { .. } => ChannelPhase::Open,
        }
    }

    pub fn reconnect_attempts(&self) -> u32 {
        lock(&self.inner.state).reconnect_attempts
    }

    pub fn has_pending_reconnect(&self) -> bool {
        lock(&self.inner.state).reconnect_timer.is_some()
    }

    /// Event names with at least one subscription, sorted.
    pub fn subscribed_events(&self) -> Vec<String> {
        lock(&self.inner.registry).events()
    }
}

impl<T: Transport> Inner<T> {
    fn connect(self: &Arc<Self>) -> impl Future<Output = Result<(), ConnectError>> + Send + 'static {
        let pending = self.begin_connect();
        async move {
            match pending {
                Some(pending) => pending.await,
                None => Ok(()),
            }
        }
    }

    /// Starts an attempt if disconnected. Returns the attempt to await, or
    /// `None` when already open.
    fn begin_connect(self: &Arc<Self>) -> Option<PendingConnect> {
        let mut state = lock(&self.state);
        match &state.phase {
            Phase::Open { .. } => return None,
            Phase::Connecting(pending) => return Some(pending.clone()),
            Phase::Disconnected => {}
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("no async runtime; realtime connect skipped");
                let failed: BoxFuture<'static, _> = Box::pin(async { Err(ConnectError::NoRuntime) });
                return Some(failed.shared());
            }
        };

        state.generation += 1;
        let generation = state.generation;
        if let Some((_, timer)) = state.reconnect_timer.take() {
            timer.cancel();
        }

        let task = runtime.spawn(self.clone().attempt(generation));
        let pending: BoxFuture<'static, _> = Box::pin(async move {
            task.await
                .unwrap_or_else(|e| Err(ConnectError::Transport(format!("connect task failed: {e}"))))
        });
        let pending = pending.shared();
        state.phase = Phase::Connecting(pending.clone());
        Some(pending)
    }

    async fn attempt(self: Arc<Self>, generation: u64) -> Result<(), ConnectError> {
        let result = self.open_socket().await;
        match result {
            Ok(connection) => self.settle_open(generation, connection),
            Err(e) => {
                self.settle_failed(generation, &e);
                Err(e)
            }
        }
    }

    async fn open_socket(&self) -> Result<Connection, ConnectError> {
        let Some(token) = self.tokens.access_token().await else {
            return Err(ConnectError::NoToken);
        };
        let url = socket_url(&self.config.url, &self.config.token_param, &token)?;
        tracing::debug!(host = url.host_str().unwrap_or(""), "opening realtime socket");

        self.transport
            .connect(url.as_str())
            .await
            .map_err(|e| ConnectError::Transport(e.to_string()))
    }

    fn settle_open(self: &Arc<Self>, generation: u64, connection: Connection) -> Result<(), ConnectError> {
        let shutdown = CancellationToken::new();
        {
            let mut state = lock(&self.state);
            if state.generation != generation {
                tracing::debug!("connect superseded; dropping socket");
                return Err(ConnectError::Superseded);
            }
            state.reconnect_attempts = 0;
            state.manual_disconnect = false;
            state.phase = Phase::Open {
                shutdown: shutdown.clone(),
            };
        }

        tracing::info!("realtime channel open");
        tokio::spawn(pump(Arc::downgrade(self), generation, connection, shutdown));
        Ok(())
    }

    fn settle_failed(self: &Arc<Self>, generation: u64, error: &ConnectError) {
        let has_subscribers = !lock(&self.registry).is_empty();
        let mut state = lock(&self.state);
        if state.generation != generation {
            return;
        }
        state.phase = Phase::Disconnected;

        if error.is_retryable() {
            tracing::warn!(error = %error, "realtime connect failed");
            self.schedule_reconnect(&mut state, has_subscribers);
        } else {
            tracing::warn!(error = %error, "realtime connect abandoned");
        }
    }

    fn settle_closed(self: &Arc<Self>, generation: u64, reason: CloseReason) {
        let has_subscribers = !lock(&self.registry).is_empty();
        let mut state = lock(&self.state);
        if state.generation != generation {
            return;
        }
        state.phase = Phase::Disconnected;

        match &reason {
            CloseReason::Closed => tracing::info!("realtime socket closed by server"),
            CloseReason::Idle => tracing::warn!("realtime socket idle; closing"),
            CloseReason::Failed(e) => tracing::warn!(error = %e, "realtime socket failed"),
        }
        self.schedule_reconnect(&mut state, has_subscribers);
    }

    /// Arms the single reconnect timer unless the caller disconnected, nobody
    /// is subscribed, or a timer is already pending.
    fn schedule_reconnect(self: &Arc<Self>, state: &mut State, has_subscribers: bool) {
        if state.manual_disconnect || !has_subscribers || state.reconnect_timer.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime; reconnect not scheduled");
            return;
        };

        state.reconnect_attempts = state.reconnect_attempts.saturating_add(1);
        let attempt = state.reconnect_attempts;
        let delay = self.config.backoff.delay(attempt);

        state.next_timer += 1;
        let timer_id = state.next_timer;
        let cancel = CancellationToken::new();
        state.reconnect_timer = Some((timer_id, cancel.clone()));

        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "realtime reconnect scheduled");
        let weak = Arc::downgrade(self);
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire_timer(timer_id).await;
                    }
                }
            }
        });
    }

    async fn fire_timer(self: Arc<Self>, timer_id: u64) {
        {
            let mut state = lock(&self.state);
            match &state.reconnect_timer {
                Some((id, _)) if *id == timer_id => state.reconnect_timer = None,
                _ => return,
            }
        }
        // Failures reschedule from inside the attempt.
        let _ = self.connect().await;
    }

    /// Closes the socket, cancels the timer and invalidates in-flight work.
    fn teardown(&self, manual: bool) {
        let previous = {
            let mut state = lock(&self.state);
            state.generation += 1;
            if manual {
                state.manual_disconnect = true;
            }
            if let Some((_, timer)) = state.reconnect_timer.take() {
                timer.cancel();
            }
            std::mem::replace(&mut state.phase, Phase::Disconnected)
        };

        match previous {
            Phase::Open { shutdown } => {
                shutdown.cancel();
                tracing::info!(manual, "realtime channel closed");
            }
            Phase::Connecting(_) => tracing::debug!("realtime connect superseded"),
            Phase::Disconnected => {}
        }
    }

    fn dispatch(&self, envelope: &Envelope) {
        let handlers = lock(&self.registry).handlers_for(&envelope.event);
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(envelope))).is_err() {
                tracing::error!(event = %envelope.event, "realtime handler panicked");
            }
        }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((_, timer)) = state.reconnect_timer.take() {
            timer.cancel();
        }
        if let Phase::Open { shutdown } = &state.phase {
            shutdown.cancel();
        }
    }
}

/// Reads frames until shutdown, close, failure or idle timeout.
async fn pump<T: Transport>(
    inner: Weak<Inner<T>>,
    generation: u64,
    connection: Connection,
    shutdown: CancellationToken,
) {
    let Connection {
        mut sink,
        mut stream,
    } = connection;
    let idle = inner.upgrade().and_then(|i| i.config.idle_timeout);
    let watchdog = tokio::time::sleep(idle.unwrap_or(NO_IDLE_TIMEOUT));
    tokio::pin!(watchdog);

    let reason = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.close().await;
                return;
            }
            _ = &mut watchdog, if idle.is_some() => break CloseReason::Idle,
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    if let Some(idle) = idle {
                        watchdog.as_mut().reset(Instant::now() + idle);
                    }
                    let Some(channel) = inner.upgrade() else {
                        return;
                    };
                    if let Err(e) = handle_frame(&channel, &text, &mut sink).await {
                        break CloseReason::Failed(e);
                    }
                }
                Some(Err(e)) => break CloseReason::Failed(e),
                None => break CloseReason::Closed,
            },
        }
    };

    let _ = sink.close().await;
    if let Some(channel) = inner.upgrade() {
        channel.settle_closed(generation, reason);
    }
}

/// Answers pings and dispatches everything else.
async fn handle_frame<T: Transport>(
    channel: &Inner<T>,
    text: &str,
    sink: &mut FrameSink,
) -> Result<(), TransportError> {
    let envelope = match Envelope::from_json(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed realtime frame");
            return Ok(());
        }
    };

    if envelope.is_ping() {
        let pong = envelope
            .pong(Utc::now().timestamp_millis())
            .to_json()
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        return sink.send(pong).await;
    }

    channel.dispatch(&envelope);
    Ok(())
}

/// Builds the socket URL with the token as a query credential.
fn socket_url(base: &str, token_param: &str, token: &str) -> Result<Url, ConnectError> {
    let mut url = Url::parse(base).map_err(|e| ConnectError::InvalidUrl(e.to_string()))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(ConnectError::InvalidUrl(format!("unsupported scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| ConnectError::InvalidUrl(base.to_string()))?;
    url.query_pairs_mut().append_pair(token_param, token);
    Ok(url)
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
