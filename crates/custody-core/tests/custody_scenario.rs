//! End-to-end custody scenario against a file-backed ledger.
//!
//! A case is opened, two evidence hashes are attached, the case is handed
//! to the forensics lab, and the full trail is replayed, including after
//! the ledger file is closed and reopened.

use std::collections::HashSet;

use custody_core::case::{CaseContract, CaseError, CaseStatus, CustodianPolicy};
use custody_core::config::CustodyConfig;
use custody_core::context::{ClientIdentity, TxContext, TxTimestamp};
use custody_core::history::{HistoryOrder, HistoryRecord};
use custody_core::ledger::SqliteVersionStore;
use tempfile::TempDir;

const T0: i64 = 1_704_067_200;

fn org1(tx_id: &str, offset: i64) -> TxContext {
    TxContext::new(
        tx_id,
        TxTimestamp::from_seconds(T0 + offset),
        ClientIdentity::new("Org1", "appUser"),
    )
}

#[test]
fn burglary_case_chain_of_custody() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger").join("custody.db");

    {
        let contract = CaseContract::new(SqliteVersionStore::open(&path).unwrap());

        let created = contract
            .create_case(&org1("tx-create", 0), "CASE-1", "burglary")
            .unwrap();
        assert_eq!(created.case_id, "CASE-1");
        assert_eq!(created.description, "burglary");
        assert_eq!(created.status, CaseStatus::Open);
        assert!(created.evidence_list.is_empty());
        assert_eq!(created.current_custodian, "Org1");

        contract
            .add_evidence(&org1("tx-ev-a", 60), "CASE-1", "hash-a")
            .unwrap();
        let with_b = contract
            .add_evidence(&org1("tx-ev-b", 120), "CASE-1", "hash-b")
            .unwrap();
        assert_eq!(with_b.evidence_list, vec!["hash-a", "hash-b"]);

        let moved = contract
            .transfer_custody(&org1("tx-transfer", 180), "CASE-1", "Forensics_Lab")
            .unwrap();
        assert_eq!(moved.current_custodian, "Forensics_Lab");
        assert_eq!(moved.evidence_list, vec!["hash-a", "hash-b"]);
    }

    // Reopen the same file: the trail is durable.
    let contract = CaseContract::new(SqliteVersionStore::open(&path).unwrap());
    let history = contract.case_history("CASE-1").unwrap();

    assert_eq!(history.len(), 4);
    let tx_ids: Vec<_> = history.iter().map(|e| e.tx_id.as_str()).collect();
    assert_eq!(tx_ids, ["tx-create", "tx-ev-a", "tx-ev-b", "tx-transfer"]);
    assert_eq!(tx_ids.iter().collect::<HashSet<_>>().len(), 4);
    assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let snapshots: Vec<_> = history
        .iter()
        .map(|e| e.record.as_case().unwrap())
        .collect();
    assert!(snapshots[0].evidence_list.is_empty());
    assert_eq!(snapshots[1].evidence_list, vec!["hash-a"]);
    assert_eq!(snapshots[2].evidence_list, vec!["hash-a", "hash-b"]);
    assert_eq!(snapshots[3].current_custodian, "Forensics_Lab");
    assert!(snapshots.iter().all(|s| s.timestamp == "2024-01-01T00:00:00.000Z"));

    let newest = contract
        .case_history_ordered("CASE-1", HistoryOrder::NewestFirst)
        .unwrap();
    assert_eq!(newest[0].tx_id, "tx-transfer");

    assert_eq!(contract.store().open_cursors(), 0);
    assert_eq!(contract.store().stats().unwrap().version_count, 4);
}

#[test]
fn configured_allow_list_governs_transfers() {
    let config = CustodyConfig::from_toml(
        r#"
        [custody]
        policy = "allow_list"
        allowed_custodians = ["Forensics_Lab", "District_Court"]
        "#,
    )
    .unwrap();
    assert_ne!(config.custodian_policy(), CustodianPolicy::Permissive);

    let store = SqliteVersionStore::in_memory()
        .unwrap()
        .with_history_batch_size(config.ledger.history_batch_size);
    let contract = CaseContract::new(store).with_custodian_policy(config.custodian_policy());

    contract
        .create_case(&org1("tx-1", 0), "CASE-7", "fraud")
        .unwrap();
    let err = contract
        .transfer_custody(&org1("tx-2", 1), "CASE-7", "Pawn_Shop")
        .unwrap_err();
    assert!(matches!(err, CaseError::CustodianNotAllowed { .. }));

    contract
        .transfer_custody(&org1("tx-3", 2), "CASE-7", "District_Court")
        .unwrap();
    assert_eq!(contract.case_history("CASE-7").unwrap().len(), 2);
}

#[test]
fn history_json_matches_wire_shape() {
    let contract = CaseContract::new(SqliteVersionStore::in_memory().unwrap());
    contract
        .create_case(&org1("tx-1", 0), "CASE-1", "burglary")
        .unwrap();

    let payload = contract
        .invoke(
            &org1("tx-q", 5),
            "getCaseHistory",
            &["CASE-1".to_string()],
        )
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

    assert_eq!(value[0]["txId"], "tx-1");
    assert_eq!(value[0]["timestamp"]["seconds"], T0);
    assert_eq!(value[0]["record"]["caseId"], "CASE-1");
    assert_eq!(value[0]["record"]["docType"], "case");

    let entries: Vec<custody_core::history::HistoryEntry> =
        serde_json::from_value(value).unwrap();
    assert!(matches!(entries[0].record, HistoryRecord::Case(_)));
}
