//! Case state machine error types.

use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors that can occur while executing a case transaction.
///
/// Every error is terminal for the transaction that raised it: nothing is
/// committed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaseError {
    /// A case with this id already has a version.
    #[error("the case {case_id} already exists")]
    AlreadyExists {
        /// The existing case id.
        case_id: String,
    },

    /// No version exists for this case id.
    #[error("{case_id} does not exist")]
    NotFound {
        /// The missing case id.
        case_id: String,
    },

    /// A concurrent transaction committed a newer version first.
    ///
    /// The whole transaction may be resubmitted against fresh state.
    #[error("conflicting write on case {case_id}, retry with fresh state")]
    Conflict {
        /// The contended case id.
        case_id: String,
        /// The underlying store error.
        #[source]
        source: LedgerError,
    },

    /// A stored version could not be parsed as a case document.
    #[error("malformed case data for {case_id}: {reason}")]
    MalformedData {
        /// The affected case id.
        case_id: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A transaction argument failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Custody transfer to a target outside the configured allow-list.
    #[error("custodian '{custodian}' is not an allowed transfer target")]
    CustodianNotAllowed {
        /// The rejected custodian.
        custodian: String,
    },

    /// The transaction timestamp cannot be rendered as ISO-8601.
    #[error("transaction timestamp {seconds}s is out of range")]
    InvalidTimestamp {
        /// Seconds since the Unix epoch.
        seconds: i64,
    },

    /// No transaction function with this name.
    #[error("unknown transaction function: {function}")]
    UnknownFunction {
        /// The requested function name.
        function: String,
    },

    /// Wrong number of string arguments for a transaction function.
    #[error("{function} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// The invoked function.
        function: &'static str,
        /// Required argument count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store failure other than a write conflict.
    #[error("ledger error: {0}")]
    Ledger(#[source] LedgerError),
}

impl CaseError {
    /// Whether resubmitting the transaction with fresh state can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Wraps a store error, lifting write conflicts into
    /// [`CaseError::Conflict`].
    pub(crate) fn from_ledger(case_id: &str, err: LedgerError) -> Self {
        if err.is_conflict() {
            Self::Conflict {
                case_id: case_id.to_string(),
                source: err,
            }
        } else {
            Self::Ledger(err)
        }
    }
}
