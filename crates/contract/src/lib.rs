//! Permissioned data-sharing contract.
//!
//! Parties publish metadata records describing datasets they own, other
//! parties request access to a specific record, and owners resolve pending
//! requests. All state lives in a ledger reached through
//! [`datashare_storage::StorageBackend`]; the contract itself is stateless.
//!
//! # Record lifecycle
//!
//! ```text
//!   publishData ──► Data      (create-only, never updated)
//!   requestData ──► Request   (pending while its key exists)
//! handleRequest ──► Response  (terminal) + Request deleted, in one commit
//! ```
//!
//! # Entry points
//!
//! - [`DataSharingContract::invoke`] for host dispatch by function name
//! - the typed methods on [`DataSharingContract`] for direct use
//!
//! # Example
//!
//! ```
//! use datashare_contract::{DataSharingContract, Record};
//! use datashare_storage::MemoryBackend;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let ledger = MemoryBackend::new();
//! let contract = DataSharingContract::default();
//!
//! contract.publish_data(&ledger, "d1", "s3://bucket/d1", "2024-05-01", "12:00", "alice").await?;
//! contract.request_data(&ledger, "r1", "d1", "bob").await?;
//! contract.handle_request(&ledger, "resp1", "r1", "approved").await?;
//!
//! let raw = contract.show_data_info(&ledger, "resp1").await?;
//! assert!(matches!(Record::decode(&raw), Ok(Record::Response(_))));
//! assert!(contract.show_data_info(&ledger, "r1").await.is_err());
//! # Ok::<(), datashare_contract::ContractError>(())
//! # }).unwrap();
//! ```

#![deny(unsafe_code)]

mod args;
pub mod config;
mod contract;
pub mod error;
mod invoke;
pub mod query;
pub mod record;

pub use config::ContractConfig;
pub use contract::DataSharingContract;
pub use error::{ContractError, ContractResult};
pub use invoke::Function;
pub use query::PendingRequest;
pub use record::{DataRecord, Record, RecordKind, RequestRecord, ResponseRecord};
