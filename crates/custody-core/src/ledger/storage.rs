//! `SQLite`-backed versioned store.
//!
//! Versions live in a single append-only table keyed by `(key, version)`.
//! WAL mode lets history readers proceed while a writer holds the lock.
//! UPDATE and DELETE are rejected by triggers, so a committed version can
//! never be rewritten.

// SQLite hands back i64 for row ids and versions, but they are always
// non-negative.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use thiserror::Error;
use tracing::{debug, warn};

use super::backend::{HistoryCursor, KeyModification, VersionStore, VersionedValue};
use crate::context::TxTimestamp;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Number of versions fetched per round trip while walking a history.
pub const DEFAULT_HISTORY_BATCH_SIZE: u64 = 64;

/// Column named by `SQLite` when the `tx_id` uniqueness constraint fails.
const TX_ID_CONSTRAINT: &str = "key_versions.tx_id";

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key's head moved between the caller's read and its write.
    #[error("write conflict on key {key}: expected head {expected:?}, found {actual:?}")]
    Conflict {
        /// The contended key.
        key: String,
        /// Head version the writer based its update on.
        expected: Option<u64>,
        /// Head version actually present at commit time.
        actual: Option<u64>,
    },

    /// A transaction id was reused.
    #[error("transaction {tx_id} has already been committed")]
    DuplicateTransaction {
        /// The reused transaction id.
        tx_id: String,
    },

    /// The connection mutex was poisoned by a panicking writer.
    #[error("store connection lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// Whether resubmitting the whole transaction against fresh state can
    /// succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Counts describing the store's contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of versions across all keys.
    pub version_count: u64,
    /// Number of distinct keys.
    pub key_count: u64,
    /// Highest global sequence id (0 if empty).
    pub max_seq_id: u64,
}

/// The versioned store backed by `SQLite`.
pub struct SqliteVersionStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
    open_cursors: Arc<AtomicUsize>,
    history_batch_size: u64,
}

impl SqliteVersionStore {
    /// Opens or creates a store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!(path = %path.display(), "opened version store");

        Ok(Self::from_connection(conn, Some(path.to_path_buf())))
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self::from_connection(conn, None))
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            open_cursors: Arc::new(AtomicUsize::new(0)),
            history_batch_size: DEFAULT_HISTORY_BATCH_SIZE,
        }
    }

    /// Sets how many versions a history cursor fetches per round trip.
    ///
    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_history_batch_size(mut self, batch_size: u64) -> Self {
        self.history_batch_size = batch_size.max(1);
        self
    }

    /// Path of the backing database, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of history cursors that are currently open.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Gets statistics about the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<StoreStats, LedgerError> {
        let conn = self.lock()?;

        let (version_count, key_count, max_seq_id): (i64, i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT key), MAX(seq_id) FROM key_versions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(StoreStats {
            version_count: version_count as u64,
            key_count: key_count as u64,
            max_seq_id: max_seq_id.unwrap_or(0) as u64,
        })
    }

    /// Verifies that WAL mode is enabled.
    ///
    /// In-memory databases always report `memory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal mode cannot be queried.
    pub fn verify_wal_mode(&self) -> Result<bool, LedgerError> {
        let conn = self.lock()?;
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    fn head_version(&self, key: &str) -> Result<Option<u64>, LedgerError> {
        let conn = self.lock()?;
        let head: Option<i64> = conn.query_row(
            "SELECT MAX(version) FROM key_versions WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(head.map(|v| v as u64))
    }

    /// Reads up to `limit` versions of `key` in `[from_version, to_version]`.
    fn read_versions(
        &self,
        key: &str,
        from_version: u64,
        to_version: u64,
        limit: u64,
    ) -> Result<Vec<KeyModification>, LedgerError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare_cached(
            "SELECT tx_id, tx_seconds, tx_nanos, version, value
             FROM key_versions
             WHERE key = ?1 AND version >= ?2 AND version <= ?3
             ORDER BY version ASC
             LIMIT ?4",
        )?;

        let versions = stmt
            .query_map(
                params![key, from_version as i64, to_version as i64, limit as i64],
                |row| {
                    Ok(KeyModification {
                        tx_id: row.get(0)?,
                        timestamp: TxTimestamp::new(row.get(1)?, row.get(2)?),
                        version: row.get::<_, i64>(3)? as u64,
                        value: row.get(4)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(versions)
    }
}

impl VersionStore for SqliteVersionStore {
    fn get_state(&self, key: &str) -> Result<Option<VersionedValue>, LedgerError> {
        let conn = self.lock()?;

        let latest = conn
            .query_row(
                "SELECT version, value FROM key_versions
                 WHERE key = ?1
                 ORDER BY version DESC
                 LIMIT 1",
                params![key],
                |row| {
                    Ok(VersionedValue {
                        version: row.get::<_, i64>(0)? as u64,
                        value: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(latest)
    }

    fn put_state(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
        tx_id: &str,
        timestamp: TxTimestamp,
    ) -> Result<u64, LedgerError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let replayed: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM key_versions WHERE tx_id = ?1)",
            params![tx_id],
            |row| row.get(0),
        )?;
        if replayed {
            return Err(LedgerError::DuplicateTransaction {
                tx_id: tx_id.to_string(),
            });
        }

        let head: Option<i64> = tx.query_row(
            "SELECT MAX(version) FROM key_versions WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        let head = head.map(|v| v as u64);
        if head != expected_version {
            warn!(key, ?expected_version, actual = ?head, tx_id, "rejecting stale write");
            return Err(LedgerError::Conflict {
                key: key.to_string(),
                expected: expected_version,
                actual: head,
            });
        }

        let next_version = expected_version.map_or(1, |v| v + 1);
        tx.execute(
            "INSERT INTO key_versions (key, version, tx_id, tx_seconds, tx_nanos, value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                next_version as i64,
                tx_id,
                timestamp.seconds,
                timestamp.nanos,
                value,
            ],
        )
        .map_err(|err| {
            classify_insert_error(err, key, expected_version, next_version, tx_id)
        })?;
        tx.commit()?;

        debug!(key, version = next_version, tx_id, "committed version");
        Ok(next_version)
    }

    fn history_for_key<'a>(&'a self, key: &str) -> Result<HistoryCursor<'a>, LedgerError> {
        Ok(Box::new(SqliteHistoryCursor::open(self, key)?))
    }
}

/// Maps a failed version insert to the store error it stands for.
///
/// Another connection to the same file can win the race between the checks
/// and the insert. A unique violation on `tx_id` means that connection
/// committed the same transaction; any other constraint violation means it
/// took this version number.
fn classify_insert_error(
    err: rusqlite::Error,
    key: &str,
    expected_version: Option<u64>,
    next_version: u64,
    tx_id: &str,
) -> LedgerError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, ref message)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let on_tx_id = message
                .as_deref()
                .is_some_and(|m| m.contains(TX_ID_CONSTRAINT));
            if on_tx_id {
                LedgerError::DuplicateTransaction {
                    tx_id: tx_id.to_string(),
                }
            } else {
                LedgerError::Conflict {
                    key: key.to_string(),
                    expected: expected_version,
                    actual: Some(next_version),
                }
            }
        },
        other => LedgerError::Database(other),
    }
}

/// Decrements the store's open-cursor count when dropped.
struct CursorLease {
    open_cursors: Arc<AtomicUsize>,
}

impl CursorLease {
    fn acquire(open_cursors: &Arc<AtomicUsize>) -> Self {
        open_cursors.fetch_add(1, Ordering::SeqCst);
        Self {
            open_cursors: Arc::clone(open_cursors),
        }
    }
}

impl Drop for CursorLease {
    fn drop(&mut self) {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}

/// History cursor over a [`SqliteVersionStore`].
///
/// The version range is pinned when the cursor opens: versions committed
/// while the walk is in progress are not observed.
pub struct SqliteHistoryCursor<'a> {
    store: &'a SqliteVersionStore,
    key: String,
    next_version: u64,
    last_version: u64,
    buffer: VecDeque<KeyModification>,
    exhausted: bool,
    _lease: CursorLease,
}

impl<'a> SqliteHistoryCursor<'a> {
    /// Opens a cursor over every version of `key` committed so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the key's head cannot be read.
    pub fn open(store: &'a SqliteVersionStore, key: &str) -> Result<Self, LedgerError> {
        let head = store.head_version(key)?;
        Ok(Self {
            store,
            key: key.to_string(),
            next_version: 1,
            last_version: head.unwrap_or(0),
            buffer: VecDeque::new(),
            exhausted: head.is_none(),
            _lease: CursorLease::acquire(&store.open_cursors),
        })
    }

    fn fill(&mut self) -> Result<(), LedgerError> {
        let batch = self.store.read_versions(
            &self.key,
            self.next_version,
            self.last_version,
            self.store.history_batch_size,
        )?;
        match batch.last() {
            Some(last) => self.next_version = last.version + 1,
            None => self.exhausted = true,
        }
        if self.next_version > self.last_version {
            self.exhausted = true;
        }
        self.buffer.extend(batch);
        Ok(())
    }
}

impl Iterator for SqliteHistoryCursor<'_> {
    type Item = Result<KeyModification, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
