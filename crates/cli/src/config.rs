// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from `$OUTBOX_CONFIG` or `<config dir>/outbox/config.toml`
//! and has four sections:
//! - `[http]`: where queued mutations are replayed
//! - `[queue]`: storage key, data directory, encryption key file, retry cap
//! - `[connectivity]`: the TCP reachability probe
//! - `[realtime]`: socket endpoint, credentials and reconnect timing
//!
//! Every field has a default, so a missing default file is not an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use outbox_core::Backoff;

use crate::env;
use crate::error::{Error, Result};
use crate::queue::DEFAULT_QUEUE_KEY;
use crate::realtime::RealtimeConfig;
use crate::sync::DrainConfig;

const APP_DIR_NAME: &str = "outbox";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "outbox.db";
const KEY_FILE_NAME: &str = "queue.key";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub realtime: RealtimeSettings,
}

/// Replay target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL that relative mutation URLs are joined onto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Offline queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Storage key of the queue (default: "offline_queue").
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Directory holding the database and key file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// File holding the hex encryption key (default: `<data dir>/queue.key`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    /// Server failures before a mutation is dead-lettered (default: 5). 0 = never.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Re-check connectivity before each replayed mutation (default: true).
    #[serde(default = "default_true")]
    pub recheck_connectivity: bool,
}

/// Reachability probe settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// `host:port` that must accept a TCP connection to count as online.
    #[serde(default = "default_probe_addr")]
    pub probe_addr: String,
    /// Probe connect timeout in milliseconds (default: 3000).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Interval between probes while listening, in seconds (default: 5).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Realtime channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSettings {
    /// Socket endpoint. Realtime commands need it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Query parameter carrying the token (default: "token").
    #[serde(default = "default_token_param")]
    pub token_param: String,
    /// Token used when `OUTBOX_ACCESS_TOKEN` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Initial reconnect delay in milliseconds (default: 1000).
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    /// Maximum reconnect delay in seconds (default: 30).
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    /// Close the socket after this many silent seconds. Unset disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_storage_key() -> String {
    DEFAULT_QUEUE_KEY.to_string()
}

fn default_max_attempts() -> u32 {
    crate::sync::DEFAULT_MAX_ATTEMPTS
}

fn default_true() -> bool {
    true
}

fn default_probe_addr() -> String {
    "1.1.1.1:443".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_token_param() -> String {
    "token".to_string()
}

fn default_reconnect_base_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            storage_key: default_storage_key(),
            data_dir: None,
            key_file: None,
            max_attempts: default_max_attempts(),
            recheck_connectivity: true,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        ConnectivityConfig {
            probe_addr: default_probe_addr(),
            probe_timeout_ms: default_probe_timeout_ms(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        RealtimeSettings {
            url: None,
            token_param: default_token_param(),
            access_token: None,
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            idle_timeout_secs: None,
        }
    }
}

impl Config {
    /// Parses a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads from an explicit path, `$OUTBOX_CONFIG`, or the default
    /// location. Only the default location may be missing.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit.map(Path::to_path_buf).or_else(env::config_path) {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Data directory: `$OUTBOX_DATA_DIR`, then `[queue] data_dir`, then the
    /// platform data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir_with(env::data_dir())
    }

    fn data_dir_with(&self, from_env: Option<PathBuf>) -> PathBuf {
        from_env
            .or_else(|| self.queue.data_dir.clone())
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR_NAME)))
            .unwrap_or_else(|| PathBuf::from(".outbox"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(DB_FILE_NAME)
    }

    pub fn key_path(&self) -> PathBuf {
        self.key_path_in(self.data_dir())
    }

    fn key_path_in(&self, data_dir: PathBuf) -> PathBuf {
        self.queue
            .key_file
            .clone()
            .unwrap_or_else(|| data_dir.join(KEY_FILE_NAME))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn drain_config(&self) -> DrainConfig {
        DrainConfig {
            max_attempts: self.queue.max_attempts,
            recheck_connectivity: self.queue.recheck_connectivity,
        }
    }

    /// Channel configuration, or `None` when no realtime url is set.
    pub fn realtime_config(&self) -> Option<RealtimeConfig> {
        let url = self.realtime.url.clone().filter(|u| !u.trim().is_empty())?;
        Some(RealtimeConfig {
            url,
            token_param: self.realtime.token_param.clone(),
            backoff: Backoff::new(
                Duration::from_millis(self.realtime.reconnect_base_ms),
                Duration::from_secs(self.realtime.reconnect_max_delay_secs),
            ),
            idle_timeout: self
                .realtime
                .idle_timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        })
    }
}

/// `<config dir>/outbox/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
