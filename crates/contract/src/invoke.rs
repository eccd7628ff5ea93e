//! Invocation dispatcher.
//!
//! The host delivers a function name and positional string arguments and
//! expects a byte payload back. [`DataSharingContract::invoke`] checks arity,
//! routes to the typed operation and encodes its result.

use std::{fmt, str::FromStr};

use bytes::Bytes;
use datashare_storage::StorageBackend;

use crate::{
    args::{Arity, check_arity, positional},
    contract::DataSharingContract,
    error::{ContractError, ContractResult},
};

/// Functions the contract exports, by invocation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `init`
    Init,
    /// `publishData(name, content, date, time, owner)`
    PublishData,
    /// `showDataInfo(name)`
    ShowDataInfo,
    /// `showPendingRequests(owner)`
    ShowPendingRequests,
    /// `requestData(name, dataRef, requestor)`
    RequestData,
    /// `handleRequest(name, requestRef, reply)`
    HandleRequest,
}

impl Function {
    /// Every exported function.
    pub const ALL: [Self; 6] = [
        Self::Init,
        Self::PublishData,
        Self::ShowDataInfo,
        Self::ShowPendingRequests,
        Self::RequestData,
        Self::HandleRequest,
    ];

    /// Returns the invocation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PublishData => "publishData",
            Self::ShowDataInfo => "showDataInfo",
            Self::ShowPendingRequests => "showPendingRequests",
            Self::RequestData => "requestData",
            Self::HandleRequest => "handleRequest",
        }
    }

    // `init` ignores whatever the host passes.
    const fn arity(self) -> Arity {
        match self {
            Self::Init => Arity::AtLeast(0),
            Self::PublishData => Arity::Exact(5),
            Self::ShowDataInfo => Arity::Exact(1),
            Self::ShowPendingRequests => Arity::AtLeast(1),
            Self::RequestData | Self::HandleRequest => Arity::Exact(3),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Function {
    type Err = ContractError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|function| function.name() == name)
            .ok_or_else(|| ContractError::UnknownFunction { function: name.to_owned() })
    }
}

impl DataSharingContract {
    /// Dispatches one invocation.
    ///
    /// Returns an empty payload for writes, the stored bytes for
    /// `showDataInfo`, and a JSON array of `{"Key", "Record"}` objects for
    /// `showPendingRequests`.
    ///
    /// ```
    /// use datashare_contract::DataSharingContract;
    /// use datashare_storage::MemoryBackend;
    ///
    /// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
    /// let ledger = MemoryBackend::new();
    /// let contract = DataSharingContract::default();
    /// let args = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    ///
    /// contract.invoke(&ledger, "publishData", &args(&["d1", "notes", "d", "t", "alice"])).await?;
    /// contract.invoke(&ledger, "requestData", &args(&["r1", "d1", "bob"])).await?;
    ///
    /// let payload = contract.invoke(&ledger, "showPendingRequests", &args(&["alice"])).await?;
    /// assert_eq!(
    ///     std::str::from_utf8(&payload).unwrap(),
    ///     r#"[{"Key":"r1","Record":{"docType":"request","name":"r1","datatxid":"d1","requestor":"bob"}}]"#,
    /// );
    /// # Ok::<(), datashare_contract::ContractError>(())
    /// # }).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::UnknownFunction`] for an unexported name,
    /// [`ContractError::InvalidArgument`] for a wrong argument count, and
    /// otherwise whatever the routed operation returns.
    #[tracing::instrument(skip(self, ledger, args), fields(args = args.len()))]
    pub async fn invoke<B: StorageBackend + ?Sized>(
        &self,
        ledger: &B,
        function: &str,
        args: &[String],
    ) -> ContractResult<Bytes> {
        let result = self.dispatch(ledger, function, args).await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "invocation rejected");
        }
        result
    }

    async fn dispatch<B: StorageBackend + ?Sized>(
        &self,
        ledger: &B,
        function: &str,
        args: &[String],
    ) -> ContractResult<Bytes> {
        let function: Function = function.parse()?;
        check_arity(args, function.arity())?;

        match function {
            Function::Init => {
                self.init()?;
                Ok(Bytes::new())
            },
            Function::PublishData => {
                let [name, content, date, time, owner] = positional(args, function.arity(), [
                    "name", "content", "date", "time", "owner",
                ])?;
                self.publish_data(ledger, name, content, date, time, owner).await?;
                Ok(Bytes::new())
            },
            Function::ShowDataInfo => {
                let [name] = positional(args, function.arity(), ["name"])?;
                self.show_data_info(ledger, name).await
            },
            Function::ShowPendingRequests => {
                let [owner] = positional(args, function.arity(), ["owner"])?;
                let pending = self.show_pending_requests(ledger, owner).await?;
                serde_json::to_vec(&pending).map(Bytes::from).map_err(ContractError::Serialization)
            },
            Function::RequestData => {
                let [name, data_ref, requestor] =
                    positional(args, function.arity(), ["name", "dataRef", "requestor"])?;
                self.request_data(ledger, name, data_ref, requestor).await?;
                Ok(Bytes::new())
            },
            Function::HandleRequest => {
                let [name, request_ref, reply] =
                    positional(args, function.arity(), ["name", "requestRef", "reply"])?;
                self.handle_request(ledger, name, request_ref, reply).await?;
                Ok(Bytes::new())
            },
        }
    }
}
