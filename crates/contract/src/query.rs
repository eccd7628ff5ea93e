//! Query composition and the pending-request join.
//!
//! Listing the pending requests for an owner is a two-stage join over the
//! ledger's attribute index:
//!
//! 1. every Data record with `owner = <owner>`
//! 2. for each of those keys, every Request with `datatxid = <key>`
//!
//! Both stages read committed state. Selectors are typed values rendered by
//! the adapter, so owner strings never need escaping here.

use datashare_storage::{KeyValue, Selector, StorageBackend};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ContractError, ContractResult},
    record::{DATA_REF_FIELD, KIND_FIELD, OWNER_FIELD, Record, RecordKind, RequestRecord},
};

/// Selector for every Data record owned by `owner`.
///
/// `owner` is matched as given; callers lowercase it first.
#[must_use]
pub fn data_owned_by(owner: &str) -> Selector {
    Selector::new()
        .field_eq(KIND_FIELD, RecordKind::Data.as_str())
        .field_eq(OWNER_FIELD, owner)
}

/// Selector for every Request targeting the Data record at `data_ref`.
#[must_use]
pub fn requests_for(data_ref: &str) -> Selector {
    Selector::new()
        .field_eq(KIND_FIELD, RecordKind::Request.as_str())
        .field_eq(DATA_REF_FIELD, data_ref)
}

/// One entry of a pending-request listing.
///
/// Serializes as `{"Key": "<request key>", "Record": {<stored request>}}`,
/// with the record carrying its `docType` tag exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Ledger key of the request.
    #[serde(rename = "Key")]
    pub key: String,

    /// The decoded request.
    #[serde(rename = "Record", with = "tagged_request")]
    pub record: RequestRecord,
}

mod tagged_request {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

    use crate::record::{Record, RecordKind, RequestRecord};

    #[derive(Serialize)]
    struct Tagged<'a> {
        #[serde(rename = "docType")]
        kind: RecordKind,
        #[serde(flatten)]
        record: &'a RequestRecord,
    }

    pub(super) fn serialize<S: Serializer>(
        record: &RequestRecord,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Tagged { kind: RecordKind::Request, record }.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<RequestRecord, D::Error> {
        match Record::deserialize(deserializer)? {
            Record::Request(request) => Ok(request),
            other => Err(D::Error::custom(format!(
                "expected a request record, found {}",
                other.kind()
            ))),
        }
    }
}

/// Runs the two-stage join for `owner`.
///
/// Results are grouped by dataset in index order; within and across
/// datasets no ordering is promised. Any query failure or undecodable match
/// aborts the whole listing, and exceeding `limit` fails rather than
/// truncating.
#[tracing::instrument(skip(ledger))]
pub(crate) async fn pending_requests<B: StorageBackend + ?Sized>(
    ledger: &B,
    owner: &str,
    limit: Option<usize>,
) -> ContractResult<Vec<PendingRequest>> {
    let datasets = ledger
        .query(&data_owned_by(owner))
        .await
        .map_err(|e| ContractError::query_failed(format!("listing datasets owned by {owner}"), e))?;

    tracing::debug!(datasets = datasets.len(), "resolved owned datasets");

    let mut pending = Vec::new();
    for dataset in &datasets {
        let data_ref = dataset
            .key_str()
            .map_err(|e| ContractError::query_failed("dataset key is not UTF-8", e))?;

        let hits = ledger.query(&requests_for(data_ref)).await.map_err(|e| {
            ContractError::query_failed(format!("listing requests for {data_ref}"), e)
        })?;

        for hit in hits {
            pending.push(decode_pending(&hit)?);
        }

        if let Some(limit) = limit
            && pending.len() > limit
        {
            tracing::debug!(limit, "pending request listing exceeds limit");
            return Err(ContractError::query_rejected(format!(
                "more than {limit} pending requests for {owner}"
            )));
        }
    }

    Ok(pending)
}

fn decode_pending(hit: &KeyValue) -> ContractResult<PendingRequest> {
    let key = hit
        .key_str()
        .map_err(|e| ContractError::query_failed("request key is not UTF-8", e))?
        .to_owned();

    match Record::decode(&hit.value) {
        Ok(Record::Request(record)) => Ok(PendingRequest { key, record }),
        Ok(other) => Err(ContractError::query_rejected(format!(
            "index returned a {} record for request {key}",
            other.kind()
        ))),
        Err(e) => Err(ContractError::query_rejected(format!("undecodable request {key}: {e}"))),
    }
}
