//! Contract error types.
//!
//! Every error is terminal for the invocation that raised it: the contract
//! never retries or recovers locally, and the host discards the invocation's
//! writes. Ledger absence is only an error where the operation says so
//! (`showDataInfo`); referential lookups treat a missing key as a value.

use datashare_storage::{ConfigError, StorageError};
use thiserror::Error;

/// Result type alias for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Errors returned by contract operations and the invocation dispatcher.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContractError {
    /// Wrong argument count or an empty required argument.
    #[error("{message}")]
    InvalidArgument {
        /// Description of the offending argument.
        message: String,
    },

    /// A create-only write found the key already occupied.
    #[error("This data already exists: {key}")]
    AlreadyExists {
        /// The occupied key.
        key: String,
    },

    /// A direct read found no value under the key.
    #[error("Record does not exist: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// An index query failed; partial results were discarded.
    #[error("Query failed: {message}")]
    QueryFailed {
        /// What the query was doing when it failed.
        message: String,
        /// Underlying adapter error, when there is one.
        #[source]
        source: Option<StorageError>,
    },

    /// A ledger read or write failed for a reason other than absence.
    #[error("Ledger error: {0}")]
    Adapter(#[source] StorageError),

    /// Resolving a request could not retire it; nothing was committed.
    #[error("Failed to delete request: {key}")]
    DeleteFailed {
        /// Key of the request that could not be retired.
        key: String,
        /// Underlying adapter error.
        #[source]
        source: StorageError,
    },

    /// A record could not be encoded for storage.
    #[error("Failed to encode record: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The invocation named a function the contract does not export.
    #[error("Received unknown function invocation: {function}")]
    UnknownFunction {
        /// The requested function name.
        function: String,
    },

    /// The contract configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ContractError {
    /// Creates an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Creates an `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a `QueryFailed` error wrapping an adapter failure.
    #[must_use]
    pub fn query_failed(message: impl Into<String>, source: StorageError) -> Self {
        Self::QueryFailed { message: message.into(), source: Some(source) }
    }

    /// Creates a `QueryFailed` error with no adapter cause.
    #[must_use]
    pub fn query_rejected(message: impl Into<String>) -> Self {
        Self::QueryFailed { message: message.into(), source: None }
    }

    /// Returns `true` if retrying the whole invocation may succeed.
    ///
    /// Only transient adapter failures qualify; every other error is a
    /// property of the arguments or of the ledger state.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Adapter(source) | Self::DeleteFailed { source, .. } => source.is_transient(),
            Self::QueryFailed { source: Some(source), .. } => source.is_transient(),
            _ => false,
        }
    }
}

impl From<StorageError> for ContractError {
    fn from(err: StorageError) -> Self {
        Self::Adapter(err)
    }
}
