//! Transaction submission.
//!
//! The submitter proposes the transaction id and timestamp; the contract
//! never reads a clock. A commit that loses a race is resubmitted with a
//! fresh context, up to the configured number of retries.

use std::time::{SystemTime, UNIX_EPOCH};

use custody_core::case::CaseError;
use custody_core::context::{ClientIdentity, TxContext, TxTimestamp};
use tracing::{debug, warn};

/// Builds transaction contexts for one client identity and resubmits on
/// conflict.
#[derive(Debug, Clone)]
pub struct Submitter {
    identity: ClientIdentity,
    max_conflict_retries: u32,
}

impl Submitter {
    /// Creates a submitter for `identity`.
    #[must_use]
    pub const fn new(identity: ClientIdentity, max_conflict_retries: u32) -> Self {
        Self {
            identity,
            max_conflict_retries,
        }
    }

    /// The identity every context is issued under.
    #[must_use]
    pub const fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// A fresh context: random transaction id, current time.
    #[must_use]
    pub fn context(&self) -> TxContext {
        TxContext::new(
            format!("tx-{}", uuid::Uuid::new_v4()),
            now(),
            self.identity.clone(),
        )
    }

    /// Runs `op` with a fresh context, retrying while it reports a conflict.
    ///
    /// Returns the last error once the retry budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the final conflict.
    pub fn submit<T, F>(&self, mut op: F) -> Result<T, CaseError>
    where
        F: FnMut(&TxContext) -> Result<T, CaseError>,
    {
        let mut attempt = 0;
        loop {
            let ctx = self.context();
            debug!(tx_id = ctx.tx_id(), attempt, "submitting");
            match op(&ctx) {
                Err(err) if err.is_retryable() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    warn!(
                        tx_id = ctx.tx_id(),
                        attempt,
                        max = self.max_conflict_retries,
                        error = %err,
                        "conflicting commit, resubmitting"
                    );
                },
                result => return result,
            }
        }
    }
}

fn now() -> TxTimestamp {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    TxTimestamp::new(
        i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        i32::try_from(elapsed.subsec_nanos()).unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use custody_core::ledger::LedgerError;

    use super::*;

    fn conflict() -> CaseError {
        CaseError::Conflict {
            case_id: "CASE-1".to_string(),
            source: LedgerError::Conflict {
                key: "CASE-1".to_string(),
                expected: Some(1),
                actual: Some(2),
            },
        }
    }

    fn submitter(retries: u32) -> Submitter {
        Submitter::new(ClientIdentity::new("Org1", "appUser"), retries)
    }

    #[test]
    fn test_contexts_are_unique() {
        let submitter = submitter(0);
        let a = submitter.context();
        let b = submitter.context();
        assert_ne!(a.tx_id(), b.tx_id());
        assert!(a.tx_id().starts_with("tx-"));
        assert_eq!(a.identity().org_id(), "Org1");
        assert!(a.timestamp().seconds > 0);
    }

    #[test]
    fn test_retries_until_success() {
        let mut seen = Vec::new();
        let result = submitter(3).submit(|ctx| {
            seen.push(ctx.tx_id().to_string());
            if seen.len() < 3 { Err(conflict()) } else { Ok(seen.len()) }
        });

        assert_eq!(result.unwrap(), 3);
        seen.dedup();
        assert_eq!(seen.len(), 3, "each attempt gets a fresh transaction id");
    }

    #[test]
    fn test_gives_up_after_budget() {
        let mut attempts = 0;
        let result: Result<(), _> = submitter(2).submit(|_| {
            attempts += 1;
            Err(conflict())
        });

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_does_not_retry_terminal_errors() {
        let mut attempts = 0;
        let result: Result<(), _> = submitter(5).submit(|_| {
            attempts += 1;
            Err(CaseError::NotFound {
                case_id: "CASE-404".to_string(),
            })
        });

        assert!(matches!(result, Err(CaseError::NotFound { .. })));
        assert_eq!(attempts, 1);
    }
}
