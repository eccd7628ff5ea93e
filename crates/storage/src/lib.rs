//! Ledger adapter abstraction for the data-sharing contract.
//!
//! This crate provides the [`StorageBackend`] trait that the contract uses for
//! every read and write. The ledger host owns the state; the contract receives
//! a backend explicitly on each call and never holds state of its own.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Invocation Dispatcher                     │
//! │        (function name + positional string arguments)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  datashare-contract                         │
//! │   publish │ inspect │ list pending │ request │ resolve      │
//! │        (record model, validation, query composition)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  datashare-storage                          │
//! │              StorageBackend trait                           │
//! │       (get, set, delete, query, transaction)                │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryBackend│          host ledger adapter                 │
//! │   (testing)  │        (provided by the host)                │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use datashare_storage::{MemoryBackend, Selector, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::new();
//!
//!     let mut txn = backend.transaction().await?;
//!     txn.set(b"d1".to_vec(), br#"{"docType":"data","owner":"alice"}"#.to_vec());
//!     txn.commit().await?;
//!
//!     let owned = backend.query(&Selector::new().field_eq("owner", "alice")).await?;
//!     assert_eq!(owned.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables [`testutil`] helpers and the [`conformance`] suite.
//! - **`failpoints`**: Activates `fail` injection sites (`memory-before-commit`).

#![deny(unsafe_code)]

pub mod backend;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod memory;
pub mod selector;
pub mod size_limits;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod transaction;
pub mod types;

pub use backend::StorageBackend;
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use selector::Selector;
pub use size_limits::{DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, SizeLimits};
pub use transaction::Transaction;
pub use types::KeyValue;
