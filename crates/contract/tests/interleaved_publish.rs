//! Upserts must not replace a dataset published while they were in flight.
//!
//! `InterleavingLedger` commits one extra write straight to the backend
//! just before the invocation's own commit, modelling another invocation
//! that committed between this one's read and its commit.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use datashare_contract::{
    ContractError, DataRecord, DataSharingContract, Record, RecordKind, RequestRecord,
};
use datashare_storage::{
    KeyValue, MemoryBackend, Selector, StorageBackend, StorageError, StorageResult, Transaction,
};
use parking_lot::Mutex;

type Interloper = Arc<Mutex<Option<(Vec<u8>, Vec<u8>)>>>;

struct InterleavingLedger {
    inner: MemoryBackend,
    interloper: Interloper,
}

impl InterleavingLedger {
    fn new(inner: MemoryBackend, key: &str, record: impl Into<Record>) -> Self {
        let value = record.into().encode().unwrap();
        Self { inner, interloper: Arc::new(Mutex::new(Some((key.as_bytes().to_vec(), value)))) }
    }
}

struct InterleavedTransaction {
    inner: tokio::sync::Mutex<Box<dyn Transaction>>,
    backend: MemoryBackend,
    interloper: Interloper,
}

#[async_trait]
impl StorageBackend for InterleavingLedger {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn query(&self, selector: &Selector) -> StorageResult<Vec<KeyValue>> {
        self.inner.query(selector).await
    }

    async fn transaction(&self) -> StorageResult<Box<dyn Transaction>> {
        Ok(Box::new(InterleavedTransaction {
            inner: tokio::sync::Mutex::new(self.inner.transaction().await?),
            backend: self.inner.clone(),
            interloper: Arc::clone(&self.interloper),
        }))
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl Transaction for InterleavedTransaction {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        self.inner.lock().await.get(key).await
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.inner.get_mut().set(key, value);
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.inner.get_mut().delete(key);
    }

    fn compare_and_set(
        &mut self,
        key: Vec<u8>,
        expected: Option<Vec<u8>>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        self.inner.get_mut().compare_and_set(key, expected, new_value)
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let Self { inner, backend, interloper } = *self;
        let interleaved = interloper.lock().take();
        if let Some((key, value)) = interleaved {
            backend.set(key, value).await?;
        }
        inner.into_inner().commit().await
    }
}

fn dataset(name: &str) -> DataRecord {
    DataRecord::builder()
        .name(name)
        .content("published meanwhile")
        .date("2024-01-01")
        .time("00:00")
        .owner("mallory")
        .build()
}

async fn stored_kind(ledger: &MemoryBackend, key: &str) -> RecordKind {
    let raw = ledger.get(key.as_bytes()).await.unwrap().expect("key present");
    Record::decode(&raw).unwrap().kind()
}

#[tokio::test]
async fn request_loses_to_a_dataset_published_before_its_commit() {
    let contract = DataSharingContract::default();
    let ledger = InterleavingLedger::new(MemoryBackend::new(), "x", dataset("x"));

    let err = contract.request_data(&ledger, "x", "d0", "bob").await.unwrap_err();
    assert!(matches!(err, ContractError::AlreadyExists { ref key } if key == "x"), "got {err:?}");
    assert_eq!(stored_kind(&ledger.inner, "x").await, RecordKind::Data);
    assert_eq!(ledger.inner.len(), 1);
}

#[tokio::test]
async fn response_loses_to_a_dataset_published_before_its_commit() {
    let contract = DataSharingContract::default();
    let inner = MemoryBackend::new();
    contract.publish_data(&inner, "d1", "dataset", "2024-01-01", "00:00", "alice").await.unwrap();
    contract.request_data(&inner, "r1", "d1", "bob").await.unwrap();
    let ledger = InterleavingLedger::new(inner, "resp", dataset("resp"));

    let err = contract.handle_request(&ledger, "resp", "r1", "ok").await.unwrap_err();
    assert!(
        matches!(err, ContractError::AlreadyExists { ref key } if key == "resp"),
        "got {err:?}"
    );
    assert_eq!(stored_kind(&ledger.inner, "resp").await, RecordKind::Data);
    assert_eq!(stored_kind(&ledger.inner, "r1").await, RecordKind::Request);
}

#[tokio::test]
async fn other_interleaved_writes_surface_as_conflicts() {
    let contract = DataSharingContract::default();
    let interleaved = RequestRecord::builder().name("r1").data_ref("d1").requestor("carol").build();
    let ledger = InterleavingLedger::new(MemoryBackend::new(), "r1", interleaved.clone());

    let err = contract.request_data(&ledger, "r1", "d1", "bob").await.unwrap_err();
    assert!(matches!(err, ContractError::Adapter(StorageError::Conflict)), "got {err:?}");

    let raw = ledger.inner.get(b"r1").await.unwrap().unwrap();
    assert_eq!(Record::decode(&raw).unwrap(), Record::from(interleaved));
}

#[tokio::test]
async fn upsert_succeeds_once_nothing_interleaves() {
    let contract = DataSharingContract::default();
    let ledger = InterleavingLedger::new(MemoryBackend::new(), "elsewhere", dataset("elsewhere"));

    contract.request_data(&ledger, "r1", "elsewhere", "bob").await.unwrap();
    contract.request_data(&ledger, "r1", "elsewhere", "carol").await.unwrap();

    let raw = ledger.inner.get(b"r1").await.unwrap().unwrap();
    let Record::Request(request) = Record::decode(&raw).unwrap() else {
        unreachable!("r1 holds a request");
    };
    assert_eq!(request.requestor, "carol");
}
