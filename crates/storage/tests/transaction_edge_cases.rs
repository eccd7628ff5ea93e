//! Transaction conflict detection, isolation, and edge case tests.
//!
//! Covers the commit behaviors the contract leans on: insert-if-absent races
//! between two invocations, mixed conditional and unconditional operations,
//! abort isolation, and last-write-wins ordering inside one transaction.
//! These tests run against `MemoryBackend`.

#![allow(clippy::expect_used, clippy::panic)]

use bytes::Bytes;
use datashare_storage::{MemoryBackend, Selector, StorageBackend, StorageError};
use tokio::task::JoinSet;

// ============================================================================
// Conflict Detection
// ============================================================================

/// Two invocations creating the same key: the second commit must conflict.
#[tokio::test]
async fn test_two_transactions_insert_if_absent_conflict() {
    let backend = MemoryBackend::new();

    let mut txn_a = backend.transaction().await.expect("txn_a creation");
    txn_a.compare_and_set(b"d1".to_vec(), None, b"from-a".to_vec()).expect("txn_a CAS buffer");

    let mut txn_b = backend.transaction().await.expect("txn_b creation");
    txn_b.compare_and_set(b"d1".to_vec(), None, b"from-b".to_vec()).expect("txn_b CAS buffer");

    txn_a.commit().await.expect("first commit wins");

    let result_b = txn_b.commit().await;
    assert!(
        matches!(result_b, Err(StorageError::Conflict)),
        "second transaction should get Conflict, got: {result_b:?}"
    );

    let final_value = backend.get(b"d1").await.expect("final get");
    assert_eq!(final_value, Some(Bytes::from("from-a")));
}

/// Many tasks racing to create one key: exactly one succeeds.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_insert_if_absent_exactly_one_winner() {
    let backend = MemoryBackend::new();
    let mut tasks = JoinSet::new();

    for task in 0..16 {
        let backend = backend.clone();
        tasks.spawn(async move {
            let mut txn = backend.transaction().await.expect("begin");
            txn.compare_and_set(b"shared".to_vec(), None, format!("task-{task}").into_bytes())
                .expect("buffer");
            txn.commit().await
        });
    }

    let mut winners = 0;
    let mut conflicts = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.expect("task panicked") {
            Ok(()) => winners += 1,
            Err(StorageError::Conflict) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 15);
}

// ============================================================================
// Mixed Operations
// ============================================================================

/// A failed condition rolls back the unconditional writes buffered beside it.
#[tokio::test]
async fn test_mixed_transaction_cas_failure_rolls_back_unconditional() {
    let backend = MemoryBackend::new();
    backend.set(b"d1".to_vec(), b"published".to_vec()).await.expect("seed");
    backend.set(b"r1".to_vec(), b"pending".to_vec()).await.expect("seed");

    let mut txn = backend.transaction().await.expect("begin");
    txn.set(b"resp1".to_vec(), b"reply".to_vec());
    txn.delete(b"r1".to_vec());
    txn.compare_and_set(b"d1".to_vec(), None, b"overwrite".to_vec()).expect("buffer");

    let result = txn.commit().await;
    assert!(matches!(result, Err(StorageError::Conflict)), "got {result:?}");

    assert_eq!(backend.get(b"d1").await.expect("get"), Some(Bytes::from("published")));
    assert_eq!(backend.get(b"r1").await.expect("get"), Some(Bytes::from("pending")));
    assert_eq!(backend.get(b"resp1").await.expect("get"), None);
}

/// Within one transaction the last buffered operation on a key wins.
#[tokio::test]
async fn test_set_then_delete_same_key_deletes() {
    let backend = MemoryBackend::new();

    let mut txn = backend.transaction().await.expect("begin");
    txn.set(b"k".to_vec(), b"v".to_vec());
    txn.delete(b"k".to_vec());
    assert_eq!(txn.get(b"k").await.expect("get"), None);
    txn.commit().await.expect("commit");

    assert!(backend.is_empty());
}

/// An empty transaction commits as a no-op.
#[tokio::test]
async fn test_empty_transaction_commit_noop() {
    let backend = MemoryBackend::new();
    backend.set(b"k".to_vec(), b"v".to_vec()).await.expect("seed");

    let txn = backend.transaction().await.expect("begin");
    txn.commit().await.expect("empty commit");

    assert_eq!(backend.len(), 1);
}

// ============================================================================
// Isolation
// ============================================================================

/// Queries observe committed state only, even while a transaction is open.
#[tokio::test]
async fn test_query_does_not_see_pending_delete() {
    let backend = MemoryBackend::new();
    backend
        .set(b"r1".to_vec(), br#"{"docType":"request","datatxid":"d1"}"#.to_vec())
        .await
        .expect("seed");

    let mut txn = backend.transaction().await.expect("begin");
    txn.delete(b"r1".to_vec());

    let selector = Selector::new().field_eq("docType", "request");
    assert_eq!(backend.query(&selector).await.expect("query").len(), 1);

    txn.commit().await.expect("commit");
    assert!(backend.query(&selector).await.expect("query").is_empty());
}

/// Reads inside a transaction fall through to state committed after it began.
#[tokio::test]
async fn test_reads_are_not_snapshot_isolated() {
    let backend = MemoryBackend::new();
    let txn = backend.transaction().await.expect("begin");

    backend.set(b"late".to_vec(), b"v".to_vec()).await.expect("set");

    assert_eq!(txn.get(b"late").await.expect("get"), Some(Bytes::from("v")));
}
