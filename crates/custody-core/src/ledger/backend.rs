//! Storage seam between the state machine and the versioned store.

use super::storage::LedgerError;
use crate::context::TxTimestamp;

/// The latest version of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    /// Per-key version number, starting at 1.
    pub version: u64,
    /// Stored payload.
    pub value: Vec<u8>,
}

/// One entry of a key's version chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
    /// Transaction that wrote this version.
    pub tx_id: String,
    /// Deterministic timestamp of that transaction.
    pub timestamp: TxTimestamp,
    /// Per-key version number, starting at 1.
    pub version: u64,
    /// Stored payload, verbatim.
    pub value: Vec<u8>,
}

/// A one-shot cursor over a key's version chain, oldest version first.
///
/// Store-side resources held by the cursor are released when it is dropped,
/// whether it was exhausted, abandoned early, or stopped on an error.
pub type HistoryCursor<'a> = Box<dyn Iterator<Item = Result<KeyModification, LedgerError>> + 'a>;

/// A replicated key-value store that keeps every version of every key.
pub trait VersionStore {
    /// Reads the latest version of `key`, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn get_state(&self, key: &str) -> Result<Option<VersionedValue>, LedgerError>;

    /// Appends a new version of `key`.
    ///
    /// `expected_version` is the head version the caller based its write on,
    /// or `None` if the caller observed no version. The write is atomic:
    /// either the new version is committed and its number returned, or
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Conflict`] if the head of `key` is not
    ///   `expected_version`.
    /// - [`LedgerError::DuplicateTransaction`] if `tx_id` already committed a
    ///   version.
    fn put_state(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
        tx_id: &str,
        timestamp: TxTimestamp,
    ) -> Result<u64, LedgerError>;

    /// Opens a cursor over every version of `key`, oldest first.
    ///
    /// A key that was never written yields an empty cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be opened.
    fn history_for_key<'a>(&'a self, key: &str) -> Result<HistoryCursor<'a>, LedgerError>;
}

impl<S: VersionStore + ?Sized> VersionStore for &S {
    fn get_state(&self, key: &str) -> Result<Option<VersionedValue>, LedgerError> {
        (**self).get_state(key)
    }

    fn put_state(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
        tx_id: &str,
        timestamp: TxTimestamp,
    ) -> Result<u64, LedgerError> {
        (**self).put_state(key, expected_version, value, tx_id, timestamp)
    }

    fn history_for_key<'a>(&'a self, key: &str) -> Result<HistoryCursor<'a>, LedgerError> {
        (**self).history_for_key(key)
    }
}
