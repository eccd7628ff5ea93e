//! Helpers for tests that need a populated ledger.
//!
//! Only compiled with the `testutil` feature (or in this crate's own tests):
//!
//! ```toml
//! [dev-dependencies]
//! datashare-storage = { path = "../storage", features = ["testutil"] }
//! ```

use serde_json::{Map, Value};

use crate::{StorageBackend, memory::MemoryBackend};

/// Encodes a flat JSON object from `(field, value)` string pairs.
///
/// Fields come out sorted by name, as `serde_json` maps are ordered.
///
/// ```
/// use datashare_storage::testutil::json_entry;
///
/// let value = json_entry(&[("docType", "data"), ("owner", "alice")]);
/// assert_eq!(value, br#"{"docType":"data","owner":"alice"}"#.to_vec());
/// ```
#[must_use]
pub fn json_entry(fields: &[(&str, &str)]) -> Vec<u8> {
    let object: Map<String, Value> = fields
        .iter()
        .map(|(field, value)| ((*field).to_owned(), Value::String((*value).to_owned())))
        .collect();
    Value::Object(object).to_string().into_bytes()
}

/// Builds a [`MemoryBackend`] already holding `entries`.
///
/// # Panics
///
/// If a seed write is rejected.
pub async fn populated_backend<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> MemoryBackend
where
    K: Into<Vec<u8>>,
    V: Into<Vec<u8>>,
{
    let backend = MemoryBackend::new();
    for (key, value) in entries {
        backend.set(key.into(), value.into()).await.expect("seeding the memory backend");
    }
    backend
}

/// Asserts that an expression evaluates to `Err(StorageError::Conflict)`.
///
/// The expression is evaluated once, so it may consume a transaction:
///
/// ```no_run
/// // Requires the `testutil` feature.
/// use datashare_storage::{StorageError, StorageResult, assert_conflict};
///
/// let result: StorageResult<()> = Err(StorageError::Conflict);
/// assert_conflict!(result);
/// ```
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr $(,)?) => {{
        let outcome = $result;
        assert!(
            matches!(outcome, Err($crate::error::StorageError::Conflict)),
            "commit should have conflicted, got {outcome:?}",
        );
    }};
}
