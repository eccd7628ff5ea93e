//! Common types used across storage operations.

use bytes::Bytes;

use crate::error::{StorageError, StorageResult};

/// Key-value pair returned from attribute queries.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use datashare_storage::KeyValue;
///
/// let kv = KeyValue::new(Bytes::from("dataset-1"), Bytes::from(r#"{"docType":"data"}"#));
/// assert_eq!(kv.key_str().unwrap(), "dataset-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The ledger key identifying this entry.
    pub key: Bytes,

    /// The raw value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    #[must_use]
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Returns the key as UTF-8.
    ///
    /// Contract keys are logical record names, so a non-UTF-8 key indicates
    /// state written by something other than the contract.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the key is not valid UTF-8.
    pub fn key_str(&self) -> StorageResult<&str> {
        std::str::from_utf8(&self.key)
            .map_err(|e| StorageError::serialization_with_source("ledger key is not UTF-8", e))
    }
}
