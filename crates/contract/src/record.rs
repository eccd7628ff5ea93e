//! Record model: the three entity shapes stored in the ledger.
//!
//! All records share one key space, so each value carries a `docType`
//! discriminator and a generic scan can tell them apart without a schema
//! registry. Decoding reads the tag first and then the kind-specific fields.
//!
//! Stored JSON keeps the field names used by existing deployments:
//!
//! ```text
//! {"docType":"data","name":"d1","content":"...","date":"...","time":"...","owner":"alice"}
//! {"docType":"request","name":"r1","datatxid":"d1","requestor":"bob"}
//! {"docType":"response","name":"resp1","requesttxid":"r1","reply":"ok"}
//! ```
//!
//! Case normalization happens when a record is built, never when it is read.

use std::fmt;

use serde::{Deserialize, Serialize};

/// JSON field holding the record discriminator.
pub const KIND_FIELD: &str = "docType";

/// JSON field holding a Data record's owner.
pub const OWNER_FIELD: &str = "owner";

/// JSON field holding a Request's reference to the Data record it targets.
pub const DATA_REF_FIELD: &str = "datatxid";

/// Lowercases an identity or timestamp component for storage.
pub(crate) fn canonical(value: &str) -> String {
    value.to_lowercase()
}

/// Discriminator of a stored [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A published dataset description.
    Data,
    /// A pending access request.
    Request,
    /// A resolution of a request.
    Response,
}

impl RecordKind {
    /// Returns the value stored in the `docType` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published dataset description. Immutable once stored.
///
/// ```
/// use datashare_contract::record::DataRecord;
///
/// let data = DataRecord::builder()
///     .name("genome-2024")
///     .content("s3://bucket/genome")
///     .date("2024-JAN-01")
///     .time("10:00AM")
///     .owner("Alice")
///     .build();
///
/// assert_eq!(data.owner, "alice");
/// assert_eq!(data.date, "2024-jan-01");
/// assert_eq!(data.content, "s3://bucket/genome");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct DataRecord {
    /// Ledger key of this record.
    #[builder(into)]
    pub name: String,

    /// Free-form description of, or pointer to, the dataset. Stored verbatim.
    #[builder(into)]
    pub content: String,

    /// Publication date, lowercased.
    #[builder(with = |date: impl AsRef<str>| canonical(date.as_ref()))]
    pub date: String,

    /// Publication time, lowercased.
    #[builder(with = |time: impl AsRef<str>| canonical(time.as_ref()))]
    pub time: String,

    /// Owning identity, lowercased. Indexed for ownership queries.
    #[builder(with = |owner: impl AsRef<str>| canonical(owner.as_ref()))]
    pub owner: String,
}

/// A pending request for access to a Data record.
///
/// Its presence under its key is its state; resolving it deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct RequestRecord {
    /// Ledger key of this request.
    #[builder(into)]
    pub name: String,

    /// Key of the requested Data record. Not required to exist.
    #[serde(rename = "datatxid")]
    #[builder(into)]
    pub data_ref: String,

    /// Requesting identity, lowercased.
    #[builder(with = |requestor: impl AsRef<str>| canonical(requestor.as_ref()))]
    pub requestor: String,
}

/// The owner's decision on a request. Terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct ResponseRecord {
    /// Ledger key of this response.
    #[builder(into)]
    pub name: String,

    /// Key of the request this response resolved.
    #[serde(rename = "requesttxid")]
    #[builder(into)]
    pub request_ref: String,

    /// Decision payload, stored verbatim.
    #[builder(into)]
    pub reply: String,
}

/// Any record stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "docType", rename_all = "lowercase")]
pub enum Record {
    /// See [`DataRecord`].
    Data(DataRecord),
    /// See [`RequestRecord`].
    Request(RequestRecord),
    /// See [`ResponseRecord`].
    Response(ResponseRecord),
}

impl Record {
    /// Returns the record's discriminator.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Data(_) => RecordKind::Data,
            Self::Request(_) => RecordKind::Request,
            Self::Response(_) => RecordKind::Response,
        }
    }

    /// Returns the ledger key the record is stored under.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Data(data) => &data.name,
            Self::Request(request) => &request.name,
            Self::Response(response) => &response.name,
        }
    }

    /// Encodes the record as stored JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes stored JSON bytes.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not JSON, the `docType` tag is missing or
    /// unknown, or a kind-specific field is missing.
    pub fn decode(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

impl From<DataRecord> for Record {
    fn from(data: DataRecord) -> Self {
        Self::Data(data)
    }
}

impl From<RequestRecord> for Record {
    fn from(request: RequestRecord) -> Self {
        Self::Request(request)
    }
}

impl From<ResponseRecord> for Record {
    fn from(response: ResponseRecord) -> Self {
        Self::Response(response)
    }
}
