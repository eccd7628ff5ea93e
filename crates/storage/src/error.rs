//! Storage error types and result alias.
//!
//! Every ledger adapter maps its internal failures onto [`StorageError`] so
//! that contract code can reason about one error vocabulary regardless of
//! which host it runs against.
//!
//! # Error Types
//!
//! - [`StorageError::NotFound`] - Key does not exist where the caller required it
//! - [`StorageError::Conflict`] - A commit precondition no longer holds
//! - [`StorageError::Connection`] - The host ledger could not be reached
//! - [`StorageError::Serialization`] - A value or query could not be encoded or decoded
//! - [`StorageError::Internal`] - Backend-specific internal errors
//! - [`StorageError::Timeout`] - Operation exceeded time limit
//! - [`StorageError::SizeLimitExceeded`] - A key or value is larger than allowed
//!
//! # Example
//!
//! ```
//! use datashare_storage::{StorageError, StorageResult};
//!
//! fn lookup(key: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::not_found(key))
//! }
//!
//! assert!(lookup("dataset-1").is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during ledger storage operations.
///
/// Errors preserve their source chain via `#[source]`, so a failure reported
/// by a contract invocation can still be traced back to the adapter call that
/// produced it.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The requested key was not found.
    ///
    /// Plain reads report absence as `Ok(None)`; this variant is reserved for
    /// operations that require the key to exist.
    #[error("Key not found: {key}")]
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// A transaction precondition failed at commit time.
    ///
    /// Raised when a buffered compare-and-set no longer matches the committed
    /// state, e.g. two invocations racing to create the same key.
    #[error("Transaction conflict")]
    Conflict,

    /// Connection or network error reaching the ledger host.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// A value or query could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal storage backend error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("Operation timeout")]
    Timeout,

    /// A key or value exceeded the configured [`SizeLimits`](crate::SizeLimits).
    #[error("{kind} size {actual} exceeds limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Which part of the entry was too large (`"key"` or `"value"`).
        kind: String,
        /// Actual size in bytes.
        actual: usize,
        /// Configured maximum in bytes.
        limit: usize,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict() -> Self {
        Self::Conflict
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `SizeLimitExceeded` error.
    #[must_use]
    pub fn size_limit_exceeded(kind: impl Into<String>, actual: usize, limit: usize) -> Self {
        Self::SizeLimitExceeded { kind: kind.into(), actual, limit }
    }

    /// Returns `true` when retrying the same invocation may succeed.
    ///
    /// Only transport-level failures are transient. A [`Conflict`](Self::Conflict)
    /// means the ledger state changed underneath the invocation, so the host
    /// must re-execute it from scratch rather than replay the commit.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

/// Errors raised while validating configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric setting was below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending setting.
        field: &'static str,
        /// Smallest accepted value.
        min: String,
        /// Value that was supplied.
        value: String,
    },
}
