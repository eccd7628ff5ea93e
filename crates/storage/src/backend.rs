//! Ledger adapter trait definition.
//!
//! [`StorageBackend`] is the boundary between contract logic and whatever
//! ledger host executes it. The host owns all state; the contract only sees:
//!
//! - **Point access**: get, set and delete by exact key
//! - **Rich queries**: attribute filters over JSON values via [`Selector`]
//! - **Transactions**: buffered writes committed as one unit
//!
//! Keys and values are bytes. Record encoding lives in the contract crate,
//! not in the backends.
//!
//! # Implementing a Backend
//!
//! 1. Implement the [`StorageBackend`] trait
//! 2. Implement a corresponding [`Transaction`] type
//! 3. Map host-specific errors to [`StorageError`](crate::StorageError)
//!
//! See [`MemoryBackend`](crate::MemoryBackend) for a reference implementation
//! and [`conformance`](crate::conformance) for the behavioral checks every
//! backend should pass.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{error::StorageResult, selector::Selector, transaction::Transaction, types::KeyValue};

/// Abstract ledger state for key-value operations and attribute queries.
///
/// # Key Operations
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get`](StorageBackend::get) | Retrieve a single value by key |
/// | [`set`](StorageBackend::set) | Store a key-value pair |
/// | [`delete`](StorageBackend::delete) | Remove a key |
/// | [`query`](StorageBackend::query) | Find entries matching a [`Selector`] |
/// | [`transaction`](StorageBackend::transaction) | Begin an atomic transaction |
/// | [`health_check`](StorageBackend::health_check) | Verify backend availability |
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use datashare_storage::{MemoryBackend, Selector, StorageBackend};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let backend = MemoryBackend::new();
/// backend.set(b"d1".to_vec(), br#"{"docType":"data","owner":"alice"}"#.to_vec()).await.unwrap();
///
/// let hits = backend.query(&Selector::new().field_eq("owner", "alice")).await.unwrap();
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].key, Bytes::from("d1"));
/// # });
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves a value by key.
    ///
    /// - `Ok(Some(bytes))` if the key exists
    /// - `Ok(None)` if the key doesn't exist
    /// - `Err(...)` on storage errors
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Stores a key-value pair, overwriting any existing value.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Deletes a key. Deleting an absent key is a no-op.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Returns every committed entry whose value matches `selector`.
    ///
    /// Only committed state is visible; writes pending in an open
    /// transaction are not. No ordering is guaranteed across backends, so
    /// callers must treat the result as a set.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn query(&self, selector: &Selector) -> StorageResult<Vec<KeyValue>>;

    /// Begins a new transaction.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn transaction(&self) -> StorageResult<Box<dyn Transaction>>;

    /// Checks that the backend can serve requests.
    #[must_use = "health check results indicate backend availability and must be inspected"]
    async fn health_check(&self) -> StorageResult<()>;
}
