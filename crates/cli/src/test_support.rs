// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles for the collaborator seams.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outbox_core::MutationRequest;

use crate::connectivity::{ConnectivityProvider, ProbeError, RemoveListener, StatusCallback};
use crate::lock;
use crate::services::http::HttpResult;
use crate::services::storage::StorageResult;
use crate::services::{
    BoxFuture, ChaChaCipher, Cipher, CryptoError, ErrorReporter, HttpClient, KeyValueStore,
    MemoryStore, StorageError,
};

/// Scripted connectivity provider.
#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Result<Option<bool>, ProbeError>>>,
    status: Mutex<Option<bool>>,
    listeners: Arc<Mutex<Vec<(u64, StatusCallback)>>>,
    next_listener: AtomicU64,
    added: AtomicUsize,
    removed: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(status: Option<bool>) -> Arc<Self> {
        let provider = MockProvider::default();
        *lock(&provider.status) = status;
        Arc::new(provider)
    }

    /// Answer returned once the script is exhausted.
    pub fn set_status(&self, status: Option<bool>) {
        *lock(&self.status) = status;
    }

    /// Queues answers for the next fetches.
    pub fn script(&self, results: impl IntoIterator<Item = Result<Option<bool>, ProbeError>>) {
        lock(&self.script).extend(results);
    }

    /// Delivers a status event to every registered listener.
    pub fn emit(&self, status: Option<bool>) {
        let callbacks: Vec<StatusCallback> =
            lock(&self.listeners).iter().map(|(_, c)| c.clone()).collect();
        for callback in callbacks {
            callback(status);
        }
    }

    pub fn listeners_added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub fn listeners_removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }

    pub fn active_listeners(&self) -> usize {
        lock(&self.listeners).len()
    }
}

impl ConnectivityProvider for MockProvider {
    fn fetch(&self) -> BoxFuture<'_, Result<Option<bool>, ProbeError>> {
        let next = lock(&self.script).pop_front();
        let result = next.unwrap_or_else(|| Ok(*lock(&self.status)));
        Box::pin(async move { result })
    }

    fn add_listener(&self, callback: StatusCallback) -> RemoveListener {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        lock(&self.listeners).push((id, callback));
        self.added.fetch_add(1, Ordering::SeqCst);

        let listeners = self.listeners.clone();
        let removed = self.removed.clone();
        Box::new(move || {
            lock(&listeners).retain(|(lid, _)| *lid != id);
            removed.fetch_add(1, Ordering::SeqCst);
        })
    }
}

type RequestHook = Box<dyn Fn(usize) + Send + Sync>;

/// Scripted HTTP client that records every request.
#[derive(Default)]
pub struct MockHttp {
    script: Mutex<VecDeque<HttpResult<()>>>,
    requests: Mutex<Vec<MutationRequest>>,
    hook: Mutex<Option<RequestHook>>,
    latency: Mutex<Option<Duration>>,
}

impl MockHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(MockHttp::default())
    }

    /// Queues results for the next requests; later requests succeed.
    pub fn script(&self, results: impl IntoIterator<Item = HttpResult<()>>) {
        lock(&self.script).extend(results);
    }

    /// Runs before each response with the zero-based request index.
    pub fn on_request(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *lock(&self.hook) = Some(Box::new(hook));
    }

    /// Delays every response.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    pub fn requests(&self) -> Vec<MutationRequest> {
        lock(&self.requests).clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

impl HttpClient for MockHttp {
    fn execute<'a>(&'a self, request: &'a MutationRequest) -> BoxFuture<'a, HttpResult<()>> {
        let index = {
            let mut requests = lock(&self.requests);
            requests.push(request.clone());
            requests.len() - 1
        };
        if let Some(hook) = lock(&self.hook).as_ref() {
            hook(index);
        }
        let result = lock(&self.script).pop_front().unwrap_or(Ok(()));
        let latency = *lock(&self.latency);
        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}

/// Memory store that counts writes and can be made to fail.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    removes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingStore::default())
    }

    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.peek(key)
    }

    /// Writes a raw value without counting it.
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner.set_item(key, value).await.unwrap();
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for RecordingStore {
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
        Box::pin(async move {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("reads disabled".into()));
            }
            self.inner.get_item(key).await
        })
    }

    fn set_item<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("writes disabled".into()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_item(key, value).await
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            self.removes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove_item(key).await
        })
    }
}

/// Reporter that keeps every `(context, message)` pair.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingReporter::default())
    }

    pub fn reports(&self) -> Vec<(String, String)> {
        lock(&self.reports).clone()
    }

    pub fn contexts(&self) -> Vec<String> {
        self.reports().into_iter().map(|(c, _)| c).collect()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, context: &str, error: &dyn std::error::Error) {
        lock(&self.reports).push((context.to_string(), error.to_string()));
    }
}

/// Real cipher whose encryption can be switched off.
pub struct SwitchCipher {
    inner: ChaChaCipher,
    encrypt_fails: AtomicBool,
}

impl SwitchCipher {
    pub fn new() -> Arc<Self> {
        Arc::new(SwitchCipher {
            inner: test_cipher(),
            encrypt_fails: AtomicBool::new(false),
        })
    }

    pub fn fail_encrypt(&self, fail: bool) {
        self.encrypt_fails.store(fail, Ordering::SeqCst);
    }
}

impl Cipher for SwitchCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if self.encrypt_fails.load(Ordering::SeqCst) {
            return Err(CryptoError::Encrypt);
        }
        self.inner.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        self.inner.decrypt(ciphertext)
    }
}

/// Cipher over a fixed test key.
pub fn test_cipher() -> ChaChaCipher {
    ChaChaCipher::from_key(&[42u8; 32])
}
