// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline sync over SQLite storage and a switchable network.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outbox::connectivity::{ProbeError, RemoveListener, StatusCallback};
use outbox::services::http::HttpResult;
use outbox::services::{
    BoxFuture, ChaChaCipher, HttpClient, KeyValueStore, SqliteStore, TracingReporter,
};
use outbox::{ConnectivityMonitor, ConnectivityProvider, DrainConfig, MutationQueue, OfflineSync};
use outbox_core::MutationRequest;
use serde_json::json;
use tempfile::TempDir;

const KEY: &str = "offline_queue";

/// Network that tests flip on and off, pushing each change to listeners.
#[derive(Default)]
struct Network {
    online: AtomicBool,
    listeners: Arc<Mutex<Vec<StatusCallback>>>,
}

impl Network {
    fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        let listeners: Vec<StatusCallback> = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener(Some(online));
        }
    }
}

impl ConnectivityProvider for Network {
    fn fetch(&self) -> BoxFuture<'_, Result<Option<bool>, ProbeError>> {
        let online = self.online.load(Ordering::SeqCst);
        Box::pin(async move { Ok(Some(online)) })
    }

    fn add_listener(&self, callback: StatusCallback) -> RemoveListener {
        self.listeners.lock().unwrap().push(callback);
        let listeners = self.listeners.clone();
        Box::new(move || listeners.lock().unwrap().clear())
    }
}

/// Records every request and always succeeds.
#[derive(Default)]
struct Recorder {
    requests: Mutex<Vec<MutationRequest>>,
}

impl HttpClient for Recorder {
    fn execute<'a>(&'a self, request: &'a MutationRequest) -> BoxFuture<'a, HttpResult<()>> {
        self.requests.lock().unwrap().push(request.clone());
        Box::pin(async { Ok(()) })
    }
}

fn key() -> [u8; 32] {
    [7u8; 32]
}

fn queue(store: Arc<SqliteStore>) -> Arc<MutationQueue> {
    Arc::new(MutationQueue::new(
        store,
        Arc::new(ChaChaCipher::from_key(&key())),
        Arc::new(TracingReporter),
        KEY,
    ))
}

#[tokio::test]
async fn queue_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("outbox.db");

    let first = queue(Arc::new(SqliteStore::open(&path).unwrap()));
    let a = first
        .add_to_queue(MutationRequest::post("/api/a", json!({"n": 1})))
        .await
        .unwrap();
    let b = first
        .add_to_queue(MutationRequest::post("/api/b", json!({"n": 2})))
        .await
        .unwrap();
    drop(first);

    let reopened = queue(Arc::new(SqliteStore::open(&path).unwrap()));
    assert_eq!(reopened.get_queue().await, vec![a, b]);
}

#[tokio::test]
async fn legacy_plaintext_queue_is_migrated() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("outbox.db")).unwrap());
    let legacy = r#"[{"id":"legacy-1","url":"/api/old","method":"POST","body":{"x":1},"timestamp":1700000000000}]"#;
    store.set_item(KEY, legacy).await.unwrap();

    let queue = queue(store.clone());
    let items = queue.get_queue().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "legacy-1");
    assert_eq!(items[0].attempts, 0);

    let stored = store.get_item(KEY).await.unwrap().unwrap();
    assert!(!stored.contains("legacy-1"));
    assert_eq!(queue.get_queue().await, items);
}

#[tokio::test]
async fn queue_written_with_another_key_is_discarded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("outbox.db");
    let store = Arc::new(SqliteStore::open(&path).unwrap());

    queue(store.clone())
        .add_to_queue(MutationRequest::post("/api/a", json!({})))
        .await
        .unwrap();

    let other = MutationQueue::new(
        store.clone(),
        Arc::new(ChaChaCipher::from_key(&[9u8; 32])),
        Arc::new(TracingReporter),
        KEY,
    );
    assert!(other.get_queue().await.is_empty());
    assert!(store.get_item(KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn offline_mutation_is_replayed_on_reconnect() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("outbox.db")).unwrap());
    let network = Arc::new(Network::default());
    let http = Arc::new(Recorder::default());

    let sync = OfflineSync::new(
        ConnectivityMonitor::new(network.clone()),
        queue(store),
        http.clone(),
        Arc::new(TracingReporter),
        DrainConfig::default(),
    );
    sync.start().await;

    let request = MutationRequest::post("/api/x", json!({"title": "offline"}));
    assert!(sync.queue_request_if_offline(request.clone()).await);
    assert_eq!(sync.queue().len().await, 1);

    network.set(true);
    for _ in 0..100 {
        if sync.queue().is_empty().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(sync.queue().is_empty().await);
    assert_eq!(*http.requests.lock().unwrap(), vec![request.clone()]);
    assert!(!sync.queue_request_if_offline(request).await);
    sync.stop();
}
