// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod drain;
pub mod keygen;
pub mod listen;
pub mod queue;
pub mod status;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::connectivity::{ConnectivityMonitor, ConnectivityProvider, TcpProbe};
use crate::env;
use crate::error::Result;
use crate::queue::MutationQueue;
use crate::services::{
    ChaChaCipher, Cipher, DisabledCipher, EnvToken, ErrorReporter, HttpClient, KeyValueStore,
    ReqwestClient, SqliteStore, TokenProvider, TracingReporter,
};
use crate::sync::OfflineSync;

/// Everything a command needs, built once from configuration.
pub struct Context {
    pub config: Config,
    pub sync: OfflineSync,
    pub http: Arc<dyn HttpClient>,
    pub tokens: Arc<dyn TokenProvider>,
    /// Fingerprint of the queue key, `None` when queueing is disabled.
    pub fingerprint: Option<String>,
}

impl Context {
    /// Opens the production stack: SQLite storage, the TCP probe, reqwest.
    pub fn open(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(&config.db_path())?);
        let (cipher, fingerprint) = resolve_cipher(env::queue_key(), &config.key_path())?;
        let provider = Arc::new(TcpProbe::new(
            config.connectivity.probe_addr.clone(),
            Duration::from_millis(config.connectivity.probe_timeout_ms),
            Duration::from_secs(config.connectivity.poll_interval_secs),
        ));
        let tokens: Arc<dyn TokenProvider> =
            Arc::new(EnvToken::new(config.realtime.access_token.clone()));
        let http = Arc::new(
            ReqwestClient::new(config.http.base_url.as_deref(), config.http_timeout())?
                .with_token(tokens.clone()),
        );

        Ok(Self::assemble(
            config,
            store,
            cipher,
            fingerprint,
            provider,
            http,
            tokens,
            Arc::new(TracingReporter),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        cipher: Arc<dyn Cipher>,
        fingerprint: Option<String>,
        provider: Arc<dyn ConnectivityProvider>,
        http: Arc<dyn HttpClient>,
        tokens: Arc<dyn TokenProvider>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let queue = Arc::new(MutationQueue::new(
            store,
            cipher,
            reporter.clone(),
            config.queue.storage_key.clone(),
        ));
        let sync = OfflineSync::new(
            ConnectivityMonitor::new(provider),
            queue,
            http.clone(),
            reporter,
            config.drain_config(),
        );
        Context {
            config,
            sync,
            http,
            tokens,
            fingerprint,
        }
    }

    pub fn queue(&self) -> &MutationQueue {
        self.sync.queue()
    }
}

/// Picks the queue cipher: an explicit hex key, then the key file.
///
/// With neither, queueing is disabled rather than falling back to plaintext.
pub fn resolve_cipher(
    env_key: Option<String>,
    key_path: &Path,
) -> Result<(Arc<dyn Cipher>, Option<String>)> {
    let hex = match env_key {
        Some(key) => Some(key),
        None if key_path.exists() => Some(fs::read_to_string(key_path)?),
        None => None,
    };

    match hex {
        Some(hex) => {
            let cipher = ChaChaCipher::from_hex(&hex)?;
            let fingerprint = cipher.fingerprint().to_string();
            tracing::debug!(key = %fingerprint, "queue key loaded");
            Ok((Arc::new(cipher), Some(fingerprint)))
        }
        None => {
            tracing::warn!(
                path = %key_path.display(),
                "no queue key; offline queueing is disabled (run 'outbox keygen --write')"
            );
            Ok((Arc::new(DisabledCipher), None))
        }
    }
}
