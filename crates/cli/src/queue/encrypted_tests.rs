// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::queue::DEFAULT_QUEUE_KEY;
use crate::services::{CryptoError, DisabledCipher};
use crate::test_support::{test_cipher, RecordingReporter, RecordingStore, SwitchCipher};
use serde_json::json;

struct Fixture {
    store: Arc<RecordingStore>,
    cipher: Arc<SwitchCipher>,
    reporter: Arc<RecordingReporter>,
    queue: MutationQueue,
}

fn fixture() -> Fixture {
    let store = RecordingStore::new();
    let cipher = SwitchCipher::new();
    let reporter = RecordingReporter::new();
    let queue = MutationQueue::new(
        store.clone(),
        cipher.clone(),
        reporter.clone(),
        DEFAULT_QUEUE_KEY,
    );
    Fixture {
        store,
        cipher,
        reporter,
        queue,
    }
}

fn request(url: &str) -> MutationRequest {
    MutationRequest::post(url, json!({"title": "offline"}))
}

#[tokio::test]
async fn absent_key_is_empty() {
    let f = fixture();
    assert!(f.queue.get_queue().await.is_empty());
    assert!(f.reporter.reports().is_empty());
}

#[tokio::test]
async fn add_assigns_id_and_timestamp() {
    let f = fixture();
    let a = f.queue.add_to_queue(request("/api/a")).await.unwrap();
    let b = f.queue.add_to_queue(request("/api/b")).await.unwrap();

    assert_ne!(a.id, b.id);
    assert!(a.timestamp > 0);
    assert_eq!(a.attempts, 0);
    assert_eq!(a.request(), request("/api/a"));

    let ids: Vec<String> = f.queue.get_queue().await.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[tokio::test]
async fn stored_value_is_never_plaintext() {
    let f = fixture();
    f.queue.add_to_queue(request("/api/secret")).await.unwrap();

    let raw = f.store.peek(DEFAULT_QUEUE_KEY).unwrap();
    assert!(!raw.contains("/api/secret"));
    assert!(!raw.trim_start().starts_with('['));
    let json = test_cipher().decrypt(&raw).unwrap();
    assert!(json.contains("/api/secret"));
}

#[tokio::test]
async fn encrypt_failure_writes_nothing() {
    let f = fixture();
    f.queue.add_to_queue(request("/api/a")).await.unwrap();
    let writes = f.store.writes();
    let before = f.store.peek(DEFAULT_QUEUE_KEY);

    f.cipher.fail_encrypt(true);
    let err = f.queue.add_to_queue(request("/api/b")).await.unwrap_err();

    assert!(matches!(err, QueueError::Encrypt(_)));
    assert_eq!(f.store.writes(), writes);
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), before);
    assert_eq!(f.reporter.contexts(), vec!["queue encrypt"]);
}

#[tokio::test]
async fn without_a_key_nothing_is_queued() {
    let store = RecordingStore::new();
    let reporter = RecordingReporter::new();
    let queue = MutationQueue::new(
        store.clone(),
        Arc::new(DisabledCipher),
        reporter.clone(),
        DEFAULT_QUEUE_KEY,
    );

    assert!(queue.add_to_queue(request("/api/a")).await.is_err());
    assert_eq!(store.writes(), 0);
    assert_eq!(store.removes(), 0);
    assert_eq!(store.peek(DEFAULT_QUEUE_KEY), None);
}

#[tokio::test]
async fn without_a_key_an_existing_queue_is_kept() {
    let f = fixture();
    let queued = f.queue.add_to_queue(request("/api/a")).await.unwrap();
    let sealed = f.store.peek(DEFAULT_QUEUE_KEY);
    let (writes, removes) = (f.store.writes(), f.store.removes());

    let reporter = RecordingReporter::new();
    let keyless = MutationQueue::new(
        f.store.clone(),
        Arc::new(DisabledCipher),
        reporter.clone(),
        DEFAULT_QUEUE_KEY,
    );

    assert!(keyless.get_queue().await.is_empty());
    assert!(matches!(
        keyless.add_to_queue(request("/api/b")).await,
        Err(QueueError::Encrypt(CryptoError::Unavailable))
    ));
    assert!(keyless.remove_from_queue(&queued.id).await.is_err());
    assert!(keyless.record_failure(&queued.id).await.is_err());

    assert_eq!(f.store.writes(), writes);
    assert_eq!(f.store.removes(), removes);
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), sealed);
    assert_eq!(reporter.contexts(), vec!["queue read"]);

    assert_eq!(f.queue.get_queue().await, vec![queued]);
}

#[tokio::test]
async fn remove_filters_by_id() {
    let f = fixture();
    let a = f.queue.add_to_queue(request("/api/a")).await.unwrap();
    let b = f.queue.add_to_queue(request("/api/b")).await.unwrap();

    f.queue.remove_from_queue(&a.id).await.unwrap();
    let remaining = f.queue.get_queue().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b.id);

    assert!(matches!(
        f.queue.remove_from_queue(&a.id).await,
        Err(QueueError::NotFound(_))
    ));
}

#[tokio::test]
async fn corrupt_ciphertext_is_discarded_and_reported() {
    let f = fixture();
    f.store.seed(DEFAULT_QUEUE_KEY, "bm90IGEgcmVhbCBjaXBoZXJ0ZXh0").await;

    assert!(f.queue.get_queue().await.is_empty());
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), None);
    assert_eq!(f.reporter.contexts(), vec!["queue decode"]);
}

#[tokio::test]
async fn ciphertext_with_bad_json_is_discarded() {
    let f = fixture();
    let sealed = test_cipher().encrypt("{not json").unwrap();
    f.store.seed(DEFAULT_QUEUE_KEY, &sealed).await;

    assert!(f.queue.get_queue().await.is_empty());
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), None);
    assert_eq!(f.reporter.reports().len(), 1);
}

#[tokio::test]
async fn legacy_plaintext_is_migrated_once() {
    let f = fixture();
    let legacy = r#"  [{"id":"old-1","url":"/api/x","method":"POST","body":{"a":1},"timestamp":5}]"#;
    f.store.seed(DEFAULT_QUEUE_KEY, legacy).await;

    let first = f.queue.get_queue().await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "old-1");
    assert_eq!(first[0].attempts, 0);
    assert_eq!(f.store.writes(), 1);

    let raw = f.store.peek(DEFAULT_QUEUE_KEY).unwrap();
    assert!(!raw.contains("/api/x"));

    let second = f.queue.get_queue().await;
    assert_eq!(second, first);
    assert_eq!(f.store.writes(), 1);
}

#[tokio::test]
async fn legacy_plaintext_without_encryption_is_deleted() {
    let f = fixture();
    f.cipher.fail_encrypt(true);
    f.store
        .seed(
            DEFAULT_QUEUE_KEY,
            r#"[{"id":"x","url":"/api/x","method":"POST","timestamp":1}]"#,
        )
        .await;

    assert!(f.queue.get_queue().await.is_empty());
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), None);
    assert!(f
        .reporter
        .contexts()
        .contains(&"legacy queue migration".to_string()));
}

#[tokio::test]
async fn legacy_plaintext_that_fails_to_persist_is_deleted() {
    let f = fixture();
    f.store
        .seed(
            DEFAULT_QUEUE_KEY,
            r#"[{"id":"x","url":"/api/x","method":"POST","timestamp":1}]"#,
        )
        .await;
    f.store.fail_writes(true);

    assert!(f.queue.get_queue().await.is_empty());
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), None);
}

#[tokio::test]
async fn unparseable_legacy_array_is_discarded() {
    let f = fixture();
    f.store.seed(DEFAULT_QUEUE_KEY, "[1, 2").await;

    assert!(f.queue.get_queue().await.is_empty());
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), None);
    assert_eq!(f.reporter.contexts(), vec!["legacy queue decode"]);
}

#[tokio::test]
async fn storage_read_failure_does_not_overwrite() {
    let f = fixture();
    f.queue.add_to_queue(request("/api/a")).await.unwrap();
    let before = f.store.peek(DEFAULT_QUEUE_KEY);

    f.store.fail_reads(true);
    assert!(f.queue.get_queue().await.is_empty());
    assert!(matches!(
        f.queue.add_to_queue(request("/api/b")).await,
        Err(QueueError::Storage(_))
    ));
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), before);

    f.store.fail_reads(false);
    assert_eq!(f.queue.len().await, 1);
}

#[tokio::test]
async fn record_failure_persists_attempts() {
    let f = fixture();
    let a = f.queue.add_to_queue(request("/api/a")).await.unwrap();

    assert_eq!(f.queue.record_failure(&a.id).await.unwrap(), 1);
    assert_eq!(f.queue.record_failure(&a.id).await.unwrap(), 2);
    assert_eq!(f.queue.head().await.unwrap().attempts, 2);
}

#[tokio::test]
async fn dead_letter_moves_item_out_of_queue() {
    let f = fixture();
    let a = f.queue.add_to_queue(request("/api/a")).await.unwrap();
    let b = f.queue.add_to_queue(request("/api/b")).await.unwrap();

    let letter = f.queue.move_to_dead_letter(&a.id, "server error 503").await.unwrap();
    assert_eq!(letter.mutation.id, a.id);

    assert_eq!(f.queue.head().await.unwrap().id, b.id);
    let letters = f.queue.dead_letters().await;
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].reason, "server error 503");

    let raw = f.store.peek(f.queue.dead_letter_key()).unwrap();
    assert!(!raw.contains("/api/a"));
}

#[tokio::test]
async fn clear_removes_queue_and_dead_letters() {
    let f = fixture();
    let a = f.queue.add_to_queue(request("/api/a")).await.unwrap();
    f.queue.move_to_dead_letter(&a.id, "gone").await.unwrap();
    f.queue.add_to_queue(request("/api/b")).await.unwrap();

    f.queue.clear_queue().await.unwrap();
    assert_eq!(f.store.peek(DEFAULT_QUEUE_KEY), None);
    assert_eq!(f.store.peek("offline_queue_dead_letter"), None);
    assert!(f.queue.is_empty().await);
}

#[tokio::test]
async fn concurrent_adds_are_not_lost() {
    let f = fixture();
    let queue = Arc::new(f.queue);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .add_to_queue(request(&format!("/api/{i}")))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(queue.len().await, 16);
}
