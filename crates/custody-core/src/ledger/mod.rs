//! Versioned key store for the custody ledger.
//!
//! Every write to a key is kept as an immutable version. The store answers
//! three questions and nothing else:
//!
//! - what is the latest version of a key ([`VersionStore::get_state`]),
//! - append the next version of a key, failing if somebody else got there
//!   first ([`VersionStore::put_state`]),
//! - walk every version of a key from oldest to newest
//!   ([`VersionStore::history_for_key`]).
//!
//! # Concurrency
//!
//! `put_state` takes the version the caller read. If the key's head has
//! moved since, the write is rejected with [`LedgerError::Conflict`] and
//! nothing is committed. Two read-modify-write cycles against the same prior
//! version can therefore never both land.
//!
//! # Example
//!
//! ```rust
//! use custody_core::context::TxTimestamp;
//! use custody_core::ledger::{SqliteVersionStore, VersionStore};
//!
//! # fn example() -> Result<(), custody_core::ledger::LedgerError> {
//! let store = SqliteVersionStore::in_memory()?;
//! let ts = TxTimestamp::from_seconds(1_700_000_000);
//!
//! let v1 = store.put_state("CASE-1", None, b"first", "tx-1", ts)?;
//! let v2 = store.put_state("CASE-1", Some(v1), b"second", "tx-2", ts)?;
//! assert_eq!(v2, 2);
//!
//! let versions: Vec<_> = store.history_for_key("CASE-1")?.collect::<Result<_, _>>()?;
//! assert_eq!(versions.len(), 2);
//! # Ok(())
//! # }
//! ```

mod backend;
mod storage;


pub use backend::{HistoryCursor, KeyModification, VersionStore, VersionedValue};
pub use storage::{
    DEFAULT_HISTORY_BATCH_SIZE, LedgerError, SqliteHistoryCursor, SqliteVersionStore, StoreStats,
};
