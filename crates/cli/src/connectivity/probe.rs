// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! TCP reachability probe.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::{ConnectivityProvider, ProbeError, RemoveListener, StatusCallback};
use crate::services::BoxFuture;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Treats a successful TCP connect to `addr` as online.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration, poll_interval: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
            poll_interval,
        }
    }

    async fn probe(&self) -> Result<Option<bool>, ProbeError> {
        if self.addr.trim().is_empty() {
            return Err(ProbeError::InvalidAddress(self.addr.clone()));
        }

        match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await {
            Ok(Ok(_)) => Ok(Some(true)),
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.addr, error = %e, "probe connect failed");
                Ok(Some(false))
            }
            Err(_) => {
                tracing::debug!(addr = %self.addr, "probe timed out");
                Ok(Some(false))
            }
        }
    }
}

impl ConnectivityProvider for TcpProbe {
    fn fetch(&self) -> BoxFuture<'_, Result<Option<bool>, ProbeError>> {
        Box::pin(self.probe())
    }

    /// Polls on an interval from a background task. Needs a tokio runtime;
    /// without one no events are delivered.
    fn add_listener(&self, callback: StatusCallback) -> RemoveListener {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime; connectivity polling disabled");
            return Box::new(|| {});
        };

        let token = CancellationToken::new();
        let cancel = token.clone();
        let probe = self.clone();
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(probe.poll_interval.max(MIN_POLL_INTERVAL));
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let status = probe.probe().await.unwrap_or(None);
                        if token.is_cancelled() {
                            break;
                        }
                        callback(status);
                    }
                }
            }
        });

        Box::new(move || cancel.cancel())
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
