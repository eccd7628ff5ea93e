//! Contract operations.
//!
//! Every operation receives the ledger explicitly, runs inside one
//! transaction and commits only on success. An early return drops the
//! transaction, which discards whatever it buffered.

use bytes::Bytes;
use datashare_storage::{StorageBackend, StorageError};

use crate::{
    args::require_non_empty,
    config::ContractConfig,
    error::{ContractError, ContractResult},
    query::{self, PendingRequest},
    record::{DataRecord, Record, RecordKind, RequestRecord, ResponseRecord, canonical},
};

/// What a key currently holds, as seen through a transaction.
enum Lookup {
    Missing,
    Found(Record),
    /// A value that is not a contract record.
    Opaque,
}

impl Lookup {
    fn kind(&self) -> Option<RecordKind> {
        match self {
            Self::Found(record) => Some(record.kind()),
            Self::Missing | Self::Opaque => None,
        }
    }
}

fn classify(raw: Option<Bytes>) -> Lookup {
    match raw {
        None => Lookup::Missing,
        Some(raw) => Record::decode(&raw).map_or(Lookup::Opaque, Lookup::Found),
    }
}

fn encode(record: &Record) -> ContractResult<Vec<u8>> {
    record.encode().map_err(ContractError::Serialization)
}

/// Rejects writes that would overwrite a published dataset.
fn reject_dataset_overwrite(existing: &Lookup, name: &str) -> ContractResult<()> {
    if existing.kind() == Some(RecordKind::Data) {
        tracing::debug!(key = name, "write would overwrite a published dataset");
        return Err(ContractError::already_exists(name));
    }
    Ok(())
}

/// Whether `name` holds a dataset in committed state.
///
/// Consulted after a commit conflict on `name`, when a publish may have
/// landed between the read and the commit.
async fn published_since<B: StorageBackend + ?Sized>(ledger: &B, name: &str) -> bool {
    match ledger.get(name.as_bytes()).await {
        Ok(raw) => classify(raw).kind() == Some(RecordKind::Data),
        Err(_) => false,
    }
}

/// The data-sharing contract.
///
/// Holds only configuration; all state lives in the ledger passed to each
/// call, so one instance can serve any number of ledgers.
///
/// ```
/// use datashare_contract::DataSharingContract;
/// use datashare_storage::MemoryBackend;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let ledger = MemoryBackend::new();
/// let contract = DataSharingContract::default();
///
/// contract.publish_data(&ledger, "d1", "census extract", "2024-01-01", "09:00", "Alice").await?;
/// contract.request_data(&ledger, "r1", "d1", "bob").await?;
///
/// let pending = contract.show_pending_requests(&ledger, "ALICE").await?;
/// assert_eq!(pending.len(), 1);
/// assert_eq!(pending[0].record.requestor, "bob");
/// # Ok::<(), datashare_contract::ContractError>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataSharingContract {
    config: ContractConfig,
}

impl DataSharingContract {
    /// Creates a contract with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Config`] if `config` fails validation.
    pub fn new(config: ContractConfig) -> ContractResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Instantiation hook. Touches no state.
    #[tracing::instrument(skip(self))]
    pub fn init(&self) -> ContractResult<()> {
        tracing::debug!("contract instantiated");
        Ok(())
    }

    /// Publishes a Data record under `name`.
    ///
    /// `date`, `time` and `owner` are lowercased; `content` is stored as
    /// given. Publishing is create-only: the key must be absent when the
    /// invocation reads it and still absent when it commits.
    ///
    /// # Errors
    ///
    /// - [`ContractError::InvalidArgument`] if any argument is empty
    /// - [`ContractError::AlreadyExists`] if `name` already holds a value
    /// - [`ContractError::Adapter`] on ledger failures
    #[tracing::instrument(skip(self, ledger, content))]
    pub async fn publish_data<B: StorageBackend + ?Sized>(
        &self,
        ledger: &B,
        name: &str,
        content: &str,
        date: &str,
        time: &str,
        owner: &str,
    ) -> ContractResult<()> {
        require_non_empty(name, 0, "name")?;
        require_non_empty(content, 1, "content")?;
        require_non_empty(date, 2, "date")?;
        require_non_empty(time, 3, "time")?;
        require_non_empty(owner, 4, "owner")?;

        let mut txn = ledger.transaction().await?;
        if txn.get(name.as_bytes()).await?.is_some() {
            tracing::debug!("dataset already published");
            return Err(ContractError::already_exists(name));
        }

        let record = Record::from(
            DataRecord::builder()
                .name(name)
                .content(content)
                .date(date)
                .time(time)
                .owner(owner)
                .build(),
        );
        txn.compare_and_set(name.as_bytes().to_vec(), None, encode(&record)?)?;

        match txn.commit().await {
            Ok(()) => {
                tracing::debug!("dataset published");
                Ok(())
            },
            Err(StorageError::Conflict) => {
                tracing::debug!("dataset published concurrently");
                Err(ContractError::already_exists(name))
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the raw stored bytes under `name`, whatever the record kind.
    ///
    /// # Errors
    ///
    /// - [`ContractError::InvalidArgument`] if `name` is empty
    /// - [`ContractError::NotFound`] if nothing is stored under `name`
    /// - [`ContractError::Adapter`] on ledger failures
    #[tracing::instrument(skip(self, ledger))]
    pub async fn show_data_info<B: StorageBackend + ?Sized>(
        &self,
        ledger: &B,
        name: &str,
    ) -> ContractResult<Bytes> {
        require_non_empty(name, 0, "name")?;

        let txn = ledger.transaction().await?;
        txn.get(name.as_bytes()).await?.ok_or_else(|| ContractError::not_found(name))
    }

    /// Lists the pending requests against every dataset `owner` has published.
    ///
    /// `owner` is lowercased before matching. No datasets, or no requests,
    /// yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`ContractError::InvalidArgument`] if `owner` is empty
    /// - [`ContractError::QueryFailed`] if any index query fails, a match is
    ///   not a request, or the listing exceeds
    ///   [`max_pending_results`](ContractConfig::max_pending_results)
    #[tracing::instrument(skip(self, ledger))]
    pub async fn show_pending_requests<B: StorageBackend + ?Sized>(
        &self,
        ledger: &B,
        owner: &str,
    ) -> ContractResult<Vec<PendingRequest>> {
        require_non_empty(owner, 0, "owner")?;

        let owner = canonical(owner);
        let pending =
            query::pending_requests(ledger, &owner, self.config.max_pending_results()).await?;
        tracing::debug!(count = pending.len(), "listed pending requests");
        Ok(pending)
    }

    /// Records a request by `requestor` for the dataset at `data_ref`.
    ///
    /// Writes with upsert semantics under `name`, conditioned on `name`
    /// still holding what this invocation read. A missing `data_ref` is
    /// logged and tolerated unless
    /// [`strict_references`](ContractConfig::strict_references) is set.
    ///
    /// # Errors
    ///
    /// - [`ContractError::InvalidArgument`] if any argument is empty
    /// - [`ContractError::AlreadyExists`] if `name` holds a published dataset,
    ///   including one published before this invocation commits
    /// - [`ContractError::NotFound`] under strict references, if `data_ref`
    ///   does not hold a dataset
    /// - [`ContractError::Adapter`] on ledger failures, or a conflict when
    ///   `name` changed to something other than a dataset
    #[tracing::instrument(skip(self, ledger))]
    pub async fn request_data<B: StorageBackend + ?Sized>(
        &self,
        ledger: &B,
        name: &str,
        data_ref: &str,
        requestor: &str,
    ) -> ContractResult<()> {
        require_non_empty(name, 0, "name")?;
        require_non_empty(data_ref, 1, "dataRef")?;
        require_non_empty(requestor, 2, "requestor")?;

        let mut txn = ledger.transaction().await?;
        let observed = txn.get(name.as_bytes()).await?;
        reject_dataset_overwrite(&classify(observed.clone()), name)?;

        let target = classify(txn.get(data_ref.as_bytes()).await?);
        if target.kind() != Some(RecordKind::Data) {
            if self.config.strict_references() {
                tracing::debug!("request targets a missing dataset");
                return Err(ContractError::not_found(data_ref));
            }
            tracing::debug!(data_ref, "requested dataset does not exist");
        }

        let record = Record::from(
            RequestRecord::builder().name(name).data_ref(data_ref).requestor(requestor).build(),
        );
        txn.compare_and_set(
            name.as_bytes().to_vec(),
            observed.map(|raw| raw.to_vec()),
            encode(&record)?,
        )?;

        match txn.commit().await {
            Ok(()) => {
                tracing::debug!("request recorded");
                Ok(())
            },
            Err(StorageError::Conflict) => {
                if published_since(ledger, name).await {
                    tracing::debug!("dataset published concurrently");
                    return Err(ContractError::already_exists(name));
                }
                Err(StorageError::Conflict.into())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves the request at `request_ref` with `reply`.
    ///
    /// Stores a Response under `name` and deletes the request in one
    /// commit: either both happen or neither does. The Response write is
    /// conditioned on `name` still holding what this invocation read. A
    /// missing request is logged and tolerated unless
    /// [`strict_references`](ContractConfig::strict_references) is set.
    ///
    /// # Errors
    ///
    /// - [`ContractError::InvalidArgument`] if any argument is empty,
    ///   `name == request_ref`, or `request_ref` holds something other than
    ///   a request
    /// - [`ContractError::AlreadyExists`] if `name` holds a published dataset,
    ///   including one published before this invocation commits
    /// - [`ContractError::NotFound`] under strict references, if
    ///   `request_ref` is missing
    /// - [`ContractError::DeleteFailed`] if the commit fails for any other
    ///   reason
    #[tracing::instrument(skip(self, ledger, reply))]
    pub async fn handle_request<B: StorageBackend + ?Sized>(
        &self,
        ledger: &B,
        name: &str,
        request_ref: &str,
        reply: &str,
    ) -> ContractResult<()> {
        require_non_empty(name, 0, "name")?;
        require_non_empty(request_ref, 1, "requestRef")?;
        require_non_empty(reply, 2, "reply")?;

        if name == request_ref {
            return Err(ContractError::invalid_argument(
                "response name must differ from the request it resolves",
            ));
        }

        let mut txn = ledger.transaction().await?;
        let observed = txn.get(name.as_bytes()).await?;
        reject_dataset_overwrite(&classify(observed.clone()), name)?;

        match classify(txn.get(request_ref.as_bytes()).await?) {
            Lookup::Found(Record::Request(_)) => {},
            Lookup::Missing if self.config.strict_references() => {
                tracing::debug!("resolving a missing request");
                return Err(ContractError::not_found(request_ref));
            },
            Lookup::Missing => {
                tracing::debug!(request_ref, "resolved request does not exist");
            },
            Lookup::Found(other) => {
                return Err(ContractError::invalid_argument(format!(
                    "{request_ref} holds a {} record, not a request",
                    other.kind()
                )));
            },
            Lookup::Opaque => {
                return Err(ContractError::invalid_argument(format!(
                    "{request_ref} does not hold a request"
                )));
            },
        }

        let record = Record::from(
            ResponseRecord::builder().name(name).request_ref(request_ref).reply(reply).build(),
        );
        txn.compare_and_set(
            name.as_bytes().to_vec(),
            observed.map(|raw| raw.to_vec()),
            encode(&record)?,
        )?;
        txn.delete(request_ref.as_bytes().to_vec());

        match txn.commit().await {
            Ok(()) => {
                tracing::debug!("request resolved");
                Ok(())
            },
            Err(source) => {
                if matches!(source, StorageError::Conflict) && published_since(ledger, name).await {
                    tracing::debug!("dataset published concurrently");
                    return Err(ContractError::already_exists(name));
                }
                tracing::debug!(error = %source, "request resolution not committed");
                Err(ContractError::DeleteFailed { key: request_ref.to_owned(), source })
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use datashare_storage::MemoryBackend;

    use super::*;

    async fn published() -> (DataSharingContract, MemoryBackend) {
        let ledger = MemoryBackend::new();
        let contract = DataSharingContract::default();
        contract
            .publish_data(&ledger, "d1", "Trial Data", "2024-Feb-02", "NOON", "Alice")
            .await
            .unwrap();
        (contract, ledger)
    }

    #[tokio::test]
    async fn test_publish_normalizes_at_write() {
        let (contract, ledger) = published().await;
        let raw = contract.show_data_info(&ledger, "d1").await.unwrap();
        let Record::Data(data) = Record::decode(&raw).unwrap() else {
            panic!("expected a data record");
        };
        assert_eq!(data.date, "2024-feb-02");
        assert_eq!(data.time, "noon");
        assert_eq!(data.owner, "alice");
        assert_eq!(data.content, "Trial Data");
    }

    #[tokio::test]
    async fn test_show_returns_stored_bytes_unchanged() {
        let ledger = MemoryBackend::new();
        ledger.set(b"legacy".to_vec(), b"opaque bytes".to_vec()).await.unwrap();
        let raw = DataSharingContract::default().show_data_info(&ledger, "legacy").await.unwrap();
        assert_eq!(raw.as_ref(), b"opaque bytes");
    }

    #[tokio::test]
    async fn test_request_cannot_overwrite_dataset() {
        let (contract, ledger) = published().await;
        let err = contract.request_data(&ledger, "d1", "d1", "bob").await.unwrap_err();
        assert!(matches!(err, ContractError::AlreadyExists { ref key } if key == "d1"));
    }

    #[tokio::test]
    async fn test_request_upserts() {
        let (contract, ledger) = published().await;
        contract.request_data(&ledger, "r1", "d1", "bob").await.unwrap();
        contract.request_data(&ledger, "r1", "d1", "carol").await.unwrap();

        let raw = contract.show_data_info(&ledger, "r1").await.unwrap();
        let Record::Request(request) = Record::decode(&raw).unwrap() else {
            panic!("expected a request record");
        };
        assert_eq!(request.requestor, "carol");
    }

    #[tokio::test]
    async fn test_resolve_rejects_self_reference() {
        let (contract, ledger) = published().await;
        contract.request_data(&ledger, "r1", "d1", "bob").await.unwrap();
        let err = contract.handle_request(&ledger, "r1", "r1", "ok").await.unwrap_err();
        assert!(matches!(err, ContractError::InvalidArgument { .. }));
        assert!(contract.show_data_info(&ledger, "r1").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_refuses_opaque_values() {
        let ledger = MemoryBackend::new();
        ledger.set(b"blob".to_vec(), b"not a record".to_vec()).await.unwrap();
        let err = DataSharingContract::default()
            .handle_request(&ledger, "resp", "blob", "ok")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::InvalidArgument { .. }));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_new_validates_config() {
        let config: ContractConfig =
            serde_json::from_str(r#"{"max_pending_results": 0}"#).unwrap();
        assert!(matches!(DataSharingContract::new(config), Err(ContractError::Config(_))));
    }

    #[test]
    fn test_init_is_a_no_op() {
        assert!(DataSharingContract::default().init().is_ok());
    }
}
