//! In-memory ledger backend.
//!
//! [`MemoryBackend`] implements [`StorageBackend`] over a [`BTreeMap`] so
//! contract logic can be exercised deterministically without a ledger host.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Rich queries**: [`Selector`] evaluation by scanning committed values
//! - **Transactions**: read-your-writes with all-or-nothing commit
//! - **Size limits**: optional [`SizeLimits`] enforced on every write path
//!
//! # Example
//!
//! ```
//! use datashare_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let backend = MemoryBackend::new();
//!
//!     backend.set(b"dataset".to_vec(), b"{}".to_vec()).await.unwrap();
//!     let value = backend.get(b"dataset").await.unwrap();
//!
//!     assert_eq!(value.unwrap().as_ref(), b"{}");
//! }
//! ```
//!
//! # Performance Characteristics
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | get | O(log n) |
//! | set | O(log n) |
//! | delete | O(log n) |
//! | query | O(n) JSON decodes |
//!
//! There is no secondary index; every query scans the whole key space.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use fail::fail_point;
use parking_lot::RwLock;

use crate::{
    backend::StorageBackend,
    error::{StorageError, StorageResult},
    selector::Selector,
    size_limits::SizeLimits,
    transaction::Transaction,
    types::KeyValue,
};

/// In-memory ledger state using [`BTreeMap`].
///
/// # Cloning
///
/// `MemoryBackend` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Bytes>>>,
    size_limits: Option<SizeLimits>,
}

impl MemoryBackend {
    /// Creates an empty backend with no size limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend that rejects writes exceeding `limits`.
    #[must_use]
    pub fn with_size_limits(limits: SizeLimits) -> Self {
        Self { data: Arc::default(), size_limits: Some(limits) }
    }

    /// Returns the number of committed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if no key is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns a copy of every committed entry in key order.
    ///
    /// Intended for tests that assert on the whole ledger state.
    #[must_use]
    pub fn snapshot(&self) -> Vec<KeyValue> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| KeyValue::new(Bytes::copy_from_slice(k), v.clone()))
            .collect()
    }

    fn check_write(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        match &self.size_limits {
            Some(limits) => limits.check_write(key, value),
            None => Ok(()),
        }
    }

    fn check_key(&self, key: &[u8]) -> StorageResult<()> {
        match &self.size_limits {
            Some(limits) => limits.check_key(key),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    #[tracing::instrument(skip_all, fields(key = %String::from_utf8_lossy(key)))]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        let data = self.data.read();
        Ok(data.get(key).cloned())
    }

    #[tracing::instrument(
        skip_all,
        fields(key = %String::from_utf8_lossy(&key), value_len = value.len())
    )]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.check_write(&key, &value)?;
        self.data.write().insert(key, Bytes::from(value));
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(key = %String::from_utf8_lossy(key)))]
    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.check_key(key)?;
        self.data.write().remove(key);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn query(&self, selector: &Selector) -> StorageResult<Vec<KeyValue>> {
        let data = self.data.read();
        let results: Vec<KeyValue> = data
            .iter()
            .filter(|(_, value)| selector.matches(value))
            .map(|(k, v)| KeyValue::new(Bytes::copy_from_slice(k), v.clone()))
            .collect();

        tracing::trace!(matches = results.len(), "query scanned {} keys", data.len());
        Ok(results)
    }

    #[tracing::instrument(skip_all)]
    async fn transaction(&self) -> StorageResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction::new(self.clone())))
    }

    #[tracing::instrument(skip_all)]
    async fn health_check(&self) -> StorageResult<()> {
        // Acquiring the read lock proves the store is not deadlocked.
        let _unused = self.data.read();
        Ok(())
    }
}

/// A compare-and-set operation to be verified at commit time.
#[derive(Debug, Clone)]
struct CasOperation {
    key: Vec<u8>,
    expected: Option<Vec<u8>>,
    new_value: Vec<u8>,
}

/// In-memory transaction implementation.
///
/// Buffers writes and deletes until commit. `pending_writes` maps a key to
/// `Some(value)` for a set and `None` for a delete; the last operation on a
/// key wins.
struct MemoryTransaction {
    backend: MemoryBackend,
    pending_writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    pending_cas: Vec<CasOperation>,
}

impl MemoryTransaction {
    fn new(backend: MemoryBackend) -> Self {
        Self { backend, pending_writes: BTreeMap::new(), pending_cas: Vec::new() }
    }

    fn validate_sizes(&self) -> StorageResult<()> {
        for cas in &self.pending_cas {
            self.backend.check_write(&cas.key, &cas.new_value)?;
        }
        for (key, value) in &self.pending_writes {
            match value {
                Some(v) => self.backend.check_write(key, v)?,
                None => self.backend.check_key(key)?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        if let Some(value) = self.pending_writes.get(key) {
            return Ok(value.as_ref().map(|v| Bytes::copy_from_slice(v)));
        }
        if let Some(cas) = self.pending_cas.iter().rev().find(|cas| cas.key == key) {
            return Ok(Some(Bytes::copy_from_slice(&cas.new_value)));
        }

        self.backend.get(key).await
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending_writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.pending_writes.insert(key, None);
    }

    fn compare_and_set(
        &mut self,
        key: Vec<u8>,
        expected: Option<Vec<u8>>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        self.pending_cas.push(CasOperation { key, expected, new_value });
        Ok(())
    }

    #[tracing::instrument(
        skip_all,
        fields(writes = self.pending_writes.len(), conditional = self.pending_cas.len())
    )]
    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.validate_sizes()?;

        fail_point!("memory-before-commit", |_| {
            Err(StorageError::connection("injected failure before memory commit"))
        });

        let mut data = self.backend.data.write();

        // Verify every condition before applying anything.
        for cas in &self.pending_cas {
            let current = data.get(&cas.key);
            let matches = match (&cas.expected, current) {
                (None, None) => true,
                (Some(expected), Some(current)) => expected.as_slice() == &current[..],
                _ => false,
            };

            if !matches {
                tracing::debug!(
                    key = %String::from_utf8_lossy(&cas.key),
                    "commit precondition failed"
                );
                return Err(StorageError::Conflict);
            }
        }

        for cas in self.pending_cas {
            data.insert(cas.key, Bytes::from(cas.new_value));
        }

        for (key, value) in self.pending_writes {
            match value {
                Some(v) => {
                    data.insert(key, Bytes::from(v));
                },
                None => {
                    data.remove(&key);
                },
            }
        }

        Ok(())
    }
}
