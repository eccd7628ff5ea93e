//! Conformance test suite for [`StorageBackend`] implementations.
//!
//! The contract relies on a handful of ledger guarantees: absence is
//! `Ok(None)`, queries see only committed JSON objects, and transactions are
//! read-your-writes and all-or-nothing. Every adapter runs the same
//! functions against a fresh instance:
//!
//! ```no_run
//! use datashare_storage::{MemoryBackend, conformance};
//!
//! #[tokio::test]
//! async fn crud_get_returns_none_for_missing_key() {
//!     conformance::crud_get_returns_none_for_missing_key(&MemoryBackend::new()).await;
//! }
//! ```
//!
//! | Category | Contract aspect |
//! |----------|-----------------|
//! | CRUD | get/set/delete semantics |
//! | Query | selector conjunction, committed-only visibility |
//! | Transaction | read-your-writes, atomic commit, discard on drop |
//! | CAS | insert-if-absent and update-if-unchanged at commit |

use bytes::Bytes;

use crate::{
    assert_conflict, backend::StorageBackend, selector::Selector, testutil::json_entry,
};

// ============================================================================
// CRUD
// ============================================================================

/// `get` on a nonexistent key returns `Ok(None)`.
pub async fn crud_get_returns_none_for_missing_key<B: StorageBackend>(backend: &B) {
    let result = backend.get(b"nonexistent").await;
    assert!(result.is_ok(), "get should not error on missing key: {result:?}");
    assert_eq!(result.expect("checked above"), None, "missing key should return None");
}

/// `set` then `get` round-trips the value.
pub async fn crud_set_then_get_returns_value<B: StorageBackend>(backend: &B) {
    backend.set(b"k1".to_vec(), b"v1".to_vec()).await.expect("set should succeed");
    let val = backend.get(b"k1").await.expect("get should succeed");
    assert_eq!(val, Some(Bytes::from("v1")));
}

/// `set` on an existing key overwrites the value.
pub async fn crud_set_overwrites_existing<B: StorageBackend>(backend: &B) {
    backend.set(b"k1".to_vec(), b"original".to_vec()).await.expect("set");
    backend.set(b"k1".to_vec(), b"updated".to_vec()).await.expect("overwrite");
    let val = backend.get(b"k1").await.expect("get");
    assert_eq!(val, Some(Bytes::from("updated")));
}

/// `delete` on a nonexistent key is a silent no-op.
pub async fn crud_delete_nonexistent_is_noop<B: StorageBackend>(backend: &B) {
    let result = backend.delete(b"ghost").await;
    assert!(result.is_ok(), "delete of nonexistent key should not error: {result:?}");
}

/// `delete` removes a previously-set key.
pub async fn crud_delete_removes_key<B: StorageBackend>(backend: &B) {
    backend.set(b"k2".to_vec(), b"val".to_vec()).await.expect("set");
    backend.delete(b"k2").await.expect("delete");
    let val = backend.get(b"k2").await.expect("get after delete");
    assert_eq!(val, None, "key should be gone after delete");
}

// ============================================================================
// Query
// ============================================================================

/// A two-field selector returns only entries matching both fields.
pub async fn query_matches_conjunction<B: StorageBackend>(backend: &B) {
    backend
        .set(b"d1".to_vec(), json_entry(&[("docType", "data"), ("owner", "alice")]))
        .await
        .expect("set d1");
    backend
        .set(b"d2".to_vec(), json_entry(&[("docType", "data"), ("owner", "bob")]))
        .await
        .expect("set d2");
    backend
        .set(b"r1".to_vec(), json_entry(&[("docType", "request"), ("owner", "alice")]))
        .await
        .expect("set r1");

    let selector = Selector::new().field_eq("docType", "data").field_eq("owner", "alice");
    let hits = backend.query(&selector).await.expect("query");
    let keys: Vec<&[u8]> = hits.iter().map(|kv| kv.key.as_ref()).collect();
    assert_eq!(keys, vec![b"d1".as_slice()], "only d1 matches both predicates");
    assert_eq!(hits[0].value, Bytes::from(json_entry(&[("docType", "data"), ("owner", "alice")])));
}

/// A selector with no matches returns an empty result, not an error.
pub async fn query_without_matches_is_empty<B: StorageBackend>(backend: &B) {
    backend.set(b"d1".to_vec(), json_entry(&[("owner", "alice")])).await.expect("set");
    let hits = backend.query(&Selector::new().field_eq("owner", "nobody")).await.expect("query");
    assert!(hits.is_empty(), "expected no matches, got {hits:?}");
}

/// Values that are not JSON objects are skipped by queries.
pub async fn query_skips_non_json_values<B: StorageBackend>(backend: &B) {
    backend.set(b"raw".to_vec(), vec![0xff, 0x00, 0x01]).await.expect("set raw");
    backend.set(b"list".to_vec(), b"[1,2]".to_vec()).await.expect("set list");
    backend.set(b"obj".to_vec(), b"{}".to_vec()).await.expect("set obj");

    let hits = backend.query(&Selector::new()).await.expect("query");
    assert_eq!(hits.len(), 1, "only the JSON object should match: {hits:?}");
}

/// Deleted entries disappear from query results.
pub async fn query_excludes_deleted<B: StorageBackend>(backend: &B) {
    backend.set(b"r1".to_vec(), json_entry(&[("docType", "request")])).await.expect("set");
    backend.delete(b"r1").await.expect("delete");
    let hits = backend.query(&Selector::new().field_eq("docType", "request")).await.expect("query");
    assert!(hits.is_empty());
}

// ============================================================================
// Transaction
// ============================================================================

/// Reads inside a transaction see its own pending sets and deletes.
pub async fn txn_read_your_writes<B: StorageBackend>(backend: &B) {
    backend.set(b"existing".to_vec(), b"v".to_vec()).await.expect("seed");

    let mut txn = backend.transaction().await.expect("begin");
    txn.set(b"new".to_vec(), b"pending".to_vec());
    txn.delete(b"existing".to_vec());

    assert_eq!(txn.get(b"new").await.expect("get new"), Some(Bytes::from("pending")));
    assert_eq!(txn.get(b"existing").await.expect("get existing"), None);
}

/// Uncommitted writes are invisible outside the transaction.
pub async fn txn_isolated_until_commit<B: StorageBackend>(backend: &B) {
    let mut txn = backend.transaction().await.expect("begin");
    txn.set(b"k".to_vec(), b"v".to_vec());
    assert_eq!(backend.get(b"k").await.expect("get"), None);

    txn.commit().await.expect("commit");
    assert_eq!(backend.get(b"k").await.expect("get"), Some(Bytes::from("v")));
}

/// A set and a delete in one transaction land together.
pub async fn txn_commit_applies_set_and_delete<B: StorageBackend>(backend: &B) {
    backend.set(b"request".to_vec(), b"pending".to_vec()).await.expect("seed");

    let mut txn = backend.transaction().await.expect("begin");
    txn.set(b"response".to_vec(), b"done".to_vec());
    txn.delete(b"request".to_vec());
    txn.commit().await.expect("commit");

    assert_eq!(backend.get(b"request").await.expect("get"), None);
    assert_eq!(backend.get(b"response").await.expect("get"), Some(Bytes::from("done")));
}

/// Dropping a transaction without committing discards its writes.
pub async fn txn_drop_discards<B: StorageBackend>(backend: &B) {
    {
        let mut txn = backend.transaction().await.expect("begin");
        txn.set(b"k".to_vec(), b"v".to_vec());
    }
    assert_eq!(backend.get(b"k").await.expect("get"), None);
}

// ============================================================================
// CAS
// ============================================================================

/// Insert-if-absent succeeds on a fresh key.
pub async fn cas_insert_if_absent_succeeds<B: StorageBackend>(backend: &B) {
    let mut txn = backend.transaction().await.expect("begin");
    txn.compare_and_set(b"k".to_vec(), None, b"v".to_vec()).expect("buffer cas");
    txn.commit().await.expect("commit");
    assert_eq!(backend.get(b"k").await.expect("get"), Some(Bytes::from("v")));
}

/// Insert-if-absent fails when the key was committed meanwhile, applying nothing.
pub async fn cas_insert_if_absent_conflicts<B: StorageBackend>(backend: &B) {
    let mut txn = backend.transaction().await.expect("begin");
    txn.compare_and_set(b"k".to_vec(), None, b"mine".to_vec()).expect("buffer cas");
    txn.set(b"side".to_vec(), b"effect".to_vec());

    backend.set(b"k".to_vec(), b"theirs".to_vec()).await.expect("racing set");

    let result = txn.commit().await;
    assert_conflict!(result);
    assert_eq!(backend.get(b"k").await.expect("get"), Some(Bytes::from("theirs")));
    assert_eq!(backend.get(b"side").await.expect("get"), None);
}

/// Update-if-unchanged succeeds only against the exact expected bytes.
pub async fn cas_update_requires_exact_bytes<B: StorageBackend>(backend: &B) {
    backend.set(b"k".to_vec(), b"v1".to_vec()).await.expect("seed");

    let mut stale = backend.transaction().await.expect("begin");
    stale.compare_and_set(b"k".to_vec(), Some(b"v0".to_vec()), b"v2".to_vec()).expect("cas");
    let result = stale.commit().await;
    assert_conflict!(result);

    let mut fresh = backend.transaction().await.expect("begin");
    fresh.compare_and_set(b"k".to_vec(), Some(b"v1".to_vec()), b"v2".to_vec()).expect("cas");
    fresh.commit().await.expect("commit");
    assert_eq!(backend.get(b"k").await.expect("get"), Some(Bytes::from("v2")));
}

/// Runs every conformance check, each against a fresh backend from `make`.
pub async fn run_all<B, F>(make: F)
where
    B: StorageBackend,
    F: Fn() -> B,
{
    crud_get_returns_none_for_missing_key(&make()).await;
    crud_set_then_get_returns_value(&make()).await;
    crud_set_overwrites_existing(&make()).await;
    crud_delete_nonexistent_is_noop(&make()).await;
    crud_delete_removes_key(&make()).await;
    query_matches_conjunction(&make()).await;
    query_without_matches_is_empty(&make()).await;
    query_skips_non_json_values(&make()).await;
    query_excludes_deleted(&make()).await;
    txn_read_your_writes(&make()).await;
    txn_isolated_until_commit(&make()).await;
    txn_commit_applies_set_and_delete(&make()).await;
    txn_drop_discards(&make()).await;
    cas_insert_if_absent_succeeds(&make()).await;
    cas_insert_if_absent_conflicts(&make()).await;
    cas_update_requires_exact_bytes(&make()).await;
}
