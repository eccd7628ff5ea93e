//! Transaction trait for atomic ledger writes.
//!
//! A contract invocation runs against one [`Transaction`]: reads see the
//! invocation's own pending writes, and nothing becomes visible to other
//! invocations until [`commit`](Transaction::commit). Dropping a transaction
//! without committing discards every buffered write, which is how an
//! aborted invocation leaves the ledger untouched.
//!
//! # Example
//!
//! ```
//! use datashare_storage::{MemoryBackend, StorageBackend};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let backend = MemoryBackend::new();
//! backend.set(b"request-1".to_vec(), br#"{"docType":"request"}"#.to_vec()).await.unwrap();
//!
//! // Replace a request with its response in one commit.
//! let mut txn = backend.transaction().await.unwrap();
//! txn.set(b"response-1".to_vec(), br#"{"docType":"response"}"#.to_vec());
//! txn.delete(b"request-1".to_vec());
//! txn.commit().await.unwrap();
//!
//! assert!(backend.get(b"request-1").await.unwrap().is_none());
//! assert!(backend.get(b"response-1").await.unwrap().is_some());
//! # });
//! ```

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageResult;

/// Transaction handle for atomic multi-operation commits.
///
/// Sets, deletes and compare-and-set operations are buffered until
/// [`commit`](Transaction::commit), which applies them all or none.
#[async_trait]
pub trait Transaction: Send {
    /// Gets a value within the transaction.
    ///
    /// Pending writes take precedence over committed state:
    ///
    /// - `Ok(Some(bytes))` if the key holds a value
    /// - `Ok(None)` if the key is absent or was deleted in this transaction
    /// - `Err(...)` on storage errors
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Buffers a set operation.
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Buffers a delete operation. Deleting an absent key is a no-op at commit.
    fn delete(&mut self, key: Vec<u8>);

    /// Buffers a conditional set, checked at commit time.
    ///
    /// With `expected: None` the key must be absent when the transaction
    /// commits (insert-if-absent); with `Some(bytes)` it must hold exactly
    /// those bytes. A failed condition rejects the whole commit with
    /// [`StorageError::Conflict`](crate::StorageError::Conflict).
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be buffered.
    fn compare_and_set(
        &mut self,
        key: Vec<u8>,
        expected: Option<Vec<u8>>,
        new_value: Vec<u8>,
    ) -> StorageResult<()>;

    /// Commits all buffered operations atomically.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`](crate::StorageError::Conflict) if a compare-and-set
    ///   precondition no longer holds
    /// - [`StorageError::SizeLimitExceeded`](crate::StorageError::SizeLimitExceeded) if a
    ///   buffered write is too large
    /// - Other [`StorageError`](crate::StorageError) variants on backend failures
    ///
    /// On error nothing is applied.
    async fn commit(self: Box<Self>) -> StorageResult<()>;
}
