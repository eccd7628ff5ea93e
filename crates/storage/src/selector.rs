//! Attribute filters for rich queries against the ledger's secondary index.
//!
//! A [`Selector`] is a conjunction of equality predicates over top-level
//! string fields of JSON object values. It is the only query shape the
//! contract needs (`docType` plus one more field), and it maps one-to-one
//! onto a CouchDB-style rich query:
//!
//! ```
//! use datashare_storage::Selector;
//!
//! let selector = Selector::new().field_eq("docType", "data").field_eq("owner", "alice");
//! assert_eq!(
//!     selector.to_query_string().unwrap(),
//!     r#"{"selector":{"docType":"data","owner":"alice"}}"#,
//! );
//! ```
//!
//! Values that are not JSON objects never match, so raw bytes stored by
//! other writers are skipped rather than failing the scan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StorageError, StorageResult};

/// Conjunction of field-equality predicates.
///
/// An empty selector matches every JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Selector {
    selector: BTreeMap<String, String>,
}

impl Selector {
    /// Creates a selector with no predicates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the predicate `field == value`.
    ///
    /// A later predicate on the same field replaces the earlier one.
    #[must_use]
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.selector.insert(field.into(), value.into());
        self
    }

    /// Returns the expected value for `field`, if constrained.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.selector.get(field).map(String::as_str)
    }

    /// Iterates over `(field, value)` predicates in field order.
    pub fn predicates(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selector.iter().map(|(field, value)| (field.as_str(), value.as_str()))
    }

    /// Returns `true` if no predicate has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selector.is_empty()
    }

    /// Evaluates the selector against a raw stored value.
    #[must_use]
    pub fn matches(&self, raw: &[u8]) -> bool {
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(fields)) => self.predicates().all(|(field, expected)| {
                matches!(fields.get(field), Some(Value::String(actual)) if actual == expected)
            }),
            _ => false,
        }
    }

    /// Renders the selector as a rich-query string for hosts that accept one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if encoding fails.
    pub fn to_query_string(&self) -> StorageResult<String> {
        serde_json::to_string(self)
            .map_err(|e| StorageError::serialization_with_source("failed to encode selector", e))
    }

    /// Parses a rich-query string produced by [`to_query_string`](Self::to_query_string).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the string is not a
    /// selector of string-valued equality predicates.
    pub fn from_query_string(query: &str) -> StorageResult<Self> {
        serde_json::from_str(query)
            .map_err(|e| StorageError::serialization_with_source("invalid selector", e))
    }
}
