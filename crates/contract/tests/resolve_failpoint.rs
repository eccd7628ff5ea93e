#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Commit-failure injection through the in-memory backend.
//!
//! Requires the `failpoints` feature:
//! ```bash
//! cargo test -p datashare-contract --features failpoints --test resolve_failpoint
//! ```

use datashare_contract::{ContractError, DataSharingContract};
use datashare_storage::MemoryBackend;

#[tokio::test]
async fn injected_commit_failure_keeps_request_pending() {
    let scenario = fail::FailScenario::setup();

    let contract = DataSharingContract::default();
    let ledger = MemoryBackend::new();
    contract.publish_data(&ledger, "d1", "dataset", "2024-01-01", "00:00", "alice").await.unwrap();
    contract.request_data(&ledger, "r1", "d1", "bob").await.unwrap();

    fail::cfg("memory-before-commit", "return").expect("failed to configure fail point");
    let err = contract.handle_request(&ledger, "resp1", "r1", "denied").await.unwrap_err();
    fail::remove("memory-before-commit");

    assert!(matches!(err, ContractError::DeleteFailed { .. }), "got {err:?}");
    assert!(contract.show_data_info(&ledger, "r1").await.is_ok());
    assert!(contract.show_data_info(&ledger, "resp1").await.is_err());

    contract.handle_request(&ledger, "resp1", "r1", "denied").await.expect("retry succeeds");
    assert!(contract.show_data_info(&ledger, "r1").await.is_err());

    scenario.teardown();
}
