//! Tests for history reconstruction.

use super::*;
use crate::case::CaseContract;
use crate::context::{ClientIdentity, TxContext};
use crate::ledger::{HistoryCursor, LedgerError, SqliteVersionStore, VersionedValue};

fn ctx(tx_id: &str, seconds: i64) -> TxContext {
    TxContext::new(
        tx_id,
        TxTimestamp::from_seconds(seconds),
        ClientIdentity::new("Org1", "officer-1"),
    )
}

/// Store whose history cursor fails after yielding `fail_after` versions.
struct FailingHistoryStore {
    inner: SqliteVersionStore,
    fail_after: usize,
}

impl VersionStore for FailingHistoryStore {
    fn get_state(&self, key: &str) -> Result<Option<VersionedValue>, LedgerError> {
        self.inner.get_state(key)
    }

    fn put_state(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
        tx_id: &str,
        timestamp: TxTimestamp,
    ) -> Result<u64, LedgerError> {
        self.inner
            .put_state(key, expected_version, value, tx_id, timestamp)
    }

    fn history_for_key<'a>(&'a self, key: &str) -> Result<HistoryCursor<'a>, LedgerError> {
        let fail_after = self.fail_after;
        let cursor = self.inner.history_for_key(key)?;
        Ok(Box::new(cursor.enumerate().map(move |(i, item)| {
            if i == fail_after {
                Err(LedgerError::LockPoisoned)
            } else {
                item
            }
        })))
    }
}

#[test]
fn test_unknown_case_has_empty_history() {
    let store = SqliteVersionStore::in_memory().unwrap();

    let history = get_case_history(&store, "NEVER-CREATED").unwrap();
    assert!(history.is_empty());
    assert_eq!(store.open_cursors(), 0);
}

#[test]
fn test_history_follows_commit_order() {
    let contract = CaseContract::new(SqliteVersionStore::in_memory().unwrap());
    contract
        .create_case(&ctx("tx-1", 100), "CASE-1", "burglary")
        .unwrap();
    contract
        .add_evidence(&ctx("tx-2", 200), "CASE-1", "hash-a")
        .unwrap();
    contract
        .transfer_custody(&ctx("tx-3", 300), "CASE-1", "Forensics_Lab")
        .unwrap();

    let history = get_case_history(contract.store(), "CASE-1").unwrap();
    let tx_ids: Vec<_> = history.iter().map(|e| e.tx_id.as_str()).collect();
    assert_eq!(tx_ids, vec!["tx-1", "tx-2", "tx-3"]);

    let seconds: Vec<_> = history.iter().map(|e| e.timestamp.seconds).collect();
    assert_eq!(seconds, vec![100, 200, 300]);

    let last = history[2].record.as_case().unwrap();
    assert_eq!(last.current_custodian, "Forensics_Lab");
    assert_eq!(last.evidence_list, vec!["hash-a"]);
}

#[test]
fn test_newest_first_reverses() {
    let contract = CaseContract::new(SqliteVersionStore::in_memory().unwrap());
    contract.create_case(&ctx("tx-1", 1), "CASE-1", "d").unwrap();
    contract.add_evidence(&ctx("tx-2", 2), "CASE-1", "e").unwrap();

    let history =
        get_case_history_ordered(contract.store(), "CASE-1", HistoryOrder::NewestFirst).unwrap();
    assert_eq!(history[0].tx_id, "tx-2");
    assert_eq!(history[1].tx_id, "tx-1");
}

#[test]
fn test_unparseable_versions_kept_as_raw_text() {
    let store = SqliteVersionStore::in_memory().unwrap();
    let contract = CaseContract::new(&store);
    contract.create_case(&ctx("tx-1", 1), "CASE-1", "d").unwrap();

    // A legacy writer put a non-case payload on the same key.
    store
        .put_state("CASE-1", Some(1), b"legacy: not json", "tx-legacy", TxTimestamp::from_seconds(2))
        .unwrap();
    store
        .put_state(
            "CASE-1",
            Some(2),
            br#"{"docType":"exhibit","label":"knife"}"#,
            "tx-foreign",
            TxTimestamp::from_seconds(3),
        )
        .unwrap();

    let history = get_case_history(&store, "CASE-1").unwrap();
    assert_eq!(history.len(), 3);
    assert!(history[0].record.as_case().is_some());
    assert_eq!(
        history[1].record,
        HistoryRecord::Raw("legacy: not json".to_string())
    );
    assert_eq!(
        history[2].record,
        HistoryRecord::Raw(r#"{"docType":"exhibit","label":"knife"}"#.to_string())
    );
}

#[test]
fn test_invalid_utf8_payload_is_decoded_lossily() {
    let store = SqliteVersionStore::in_memory().unwrap();
    store
        .put_state("CASE-1", None, &[0x66, 0x6f, 0xff], "tx-1", TxTimestamp::from_seconds(1))
        .unwrap();

    let history = get_case_history(&store, "CASE-1").unwrap();
    assert_eq!(history[0].record, HistoryRecord::Raw("fo\u{fffd}".to_string()));
}

#[test]
fn test_read_error_releases_cursor() {
    let store = FailingHistoryStore {
        inner: SqliteVersionStore::in_memory().unwrap(),
        fail_after: 1,
    };
    let contract = CaseContract::new(&store);
    contract.create_case(&ctx("tx-1", 1), "CASE-1", "d").unwrap();
    contract.add_evidence(&ctx("tx-2", 2), "CASE-1", "e").unwrap();

    let err = get_case_history(&store, "CASE-1").unwrap_err();
    assert!(matches!(err, CaseError::Ledger(LedgerError::LockPoisoned)));
    assert_eq!(store.inner.open_cursors(), 0);
}

#[test]
fn test_history_wire_format() {
    let contract = CaseContract::new(SqliteVersionStore::in_memory().unwrap());
    contract
        .create_case(&ctx("tx-1", 1_704_067_200), "CASE-1", "burglary")
        .unwrap();

    let history = get_case_history(contract.store(), "CASE-1").unwrap();
    let json: serde_json::Value = serde_json::to_value(&history).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "txId": "tx-1",
            "timestamp": {"seconds": 1_704_067_200, "nanos": 0},
            "record": {
                "caseId": "CASE-1",
                "description": "burglary",
                "timestamp": "2024-01-01T00:00:00.000Z",
                "currentCustodian": "Org1",
                "status": "OPEN",
                "evidenceList": [],
                "docType": "case"
            }
        }])
    );

    let parsed: Vec<HistoryEntry> = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, history);
}
