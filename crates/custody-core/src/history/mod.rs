//! Case history reconstruction.
//!
//! Walks a case key's version chain and turns every version into a
//! [`HistoryEntry`]. The walk is read-only and never commits a version.
//!
//! Versions that do not parse as a case document (legacy or foreign
//! payloads sharing the key) are kept as raw text rather than aborting the
//! trace. A key that was never written has an empty history.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::case::{CaseAsset, CaseError};
use crate::context::TxTimestamp;
use crate::ledger::{KeyModification, VersionStore};

#[cfg(test)]
mod tests;

/// Snapshot carried by a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryRecord {
    /// The version parsed as a case document.
    Case(CaseAsset),
    /// The version's payload, decoded as text, when it is not a case.
    Raw(String),
}

impl HistoryRecord {
    /// The parsed case, if this version was one.
    #[must_use]
    pub const fn as_case(&self) -> Option<&CaseAsset> {
        match self {
            Self::Case(asset) => Some(asset),
            Self::Raw(_) => None,
        }
    }
}

/// One version of a case, as seen by an auditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Transaction that committed this version.
    pub tx_id: String,
    /// That transaction's deterministic timestamp.
    pub timestamp: TxTimestamp,
    /// The snapshot written by that transaction.
    pub record: HistoryRecord,
}

impl HistoryEntry {
    fn from_modification(case_id: &str, modification: KeyModification) -> Self {
        let record = match CaseAsset::from_bytes(case_id, &modification.value) {
            Ok(asset) => HistoryRecord::Case(asset),
            Err(err) => {
                warn!(
                    case_id,
                    tx_id = %modification.tx_id,
                    version = modification.version,
                    error = %err,
                    "history entry is not a case document, keeping raw payload"
                );
                HistoryRecord::Raw(String::from_utf8_lossy(&modification.value).into_owned())
            },
        };

        Self {
            tx_id: modification.tx_id,
            timestamp: modification.timestamp,
            record,
        }
    }
}

/// Order in which history entries are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryOrder {
    /// Storage order: creation first.
    #[default]
    OldestFirst,
    /// Display order: most recent first.
    NewestFirst,
}

/// Reconstructs a case's history, oldest version first.
///
/// # Errors
///
/// Returns an error if the version chain cannot be read. Unparseable
/// payloads are not errors.
pub fn get_case_history<S>(store: &S, case_id: &str) -> Result<Vec<HistoryEntry>, CaseError>
where
    S: VersionStore + ?Sized,
{
    get_case_history_ordered(store, case_id, HistoryOrder::OldestFirst)
}

/// Reconstructs a case's history in the requested order.
///
/// The store cursor is released when this function returns, on success and
/// on every error path.
///
/// # Errors
///
/// Returns an error if the version chain cannot be read.
pub fn get_case_history_ordered<S>(
    store: &S,
    case_id: &str,
    order: HistoryOrder,
) -> Result<Vec<HistoryEntry>, CaseError>
where
    S: VersionStore + ?Sized,
{
    let cursor = store
        .history_for_key(case_id)
        .map_err(|e| CaseError::from_ledger(case_id, e))?;

    let mut entries = Vec::new();
    for modification in cursor {
        let modification = modification.map_err(|e| CaseError::from_ledger(case_id, e))?;
        entries.push(HistoryEntry::from_modification(case_id, modification));
    }

    if order == HistoryOrder::NewestFirst {
        entries.reverse();
    }
    debug!(case_id, entries = entries.len(), "reconstructed history");
    Ok(entries)
}
