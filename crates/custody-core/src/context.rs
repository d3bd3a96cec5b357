//! Transaction execution context.
//!
//! Every mutating operation receives a [`TxContext`] built once by the
//! submitter and reused verbatim by every replica that executes the
//! transaction. The context carries the three values the state machine is
//! not allowed to invent on its own:
//!
//! - the transaction identifier,
//! - the agreed transaction timestamp (the deterministic clock),
//! - the identity of the invoking organization.
//!
//! Nothing in this crate reads the local wall clock or generates ids.

use std::fmt;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Transaction timestamp agreed by all replicas.
///
/// Serialized as `{"seconds": .., "nanos": ..}`, which is the shape history
/// entries carry on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxTimestamp {
    /// Whole seconds since the Unix epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds, `0..1_000_000_000`.
    pub nanos: i32,
}

impl TxTimestamp {
    /// Creates a timestamp from its components.
    #[must_use]
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Creates a timestamp with zero sub-second precision.
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Renders the timestamp as an ISO-8601 UTC string with millisecond
    /// precision, e.g. `2024-01-01T00:00:00.000Z`.
    ///
    /// Only whole seconds participate; sub-second nanos are dropped so the
    /// rendering is stable regardless of how precisely the submitter
    /// stamped the proposal.
    ///
    /// Returns `None` when the seconds value is outside the range chrono
    /// can represent.
    #[must_use]
    pub fn to_iso8601(&self) -> Option<String> {
        DateTime::from_timestamp(self.seconds, 0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl fmt::Display for TxTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Identity of the client that submitted a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    org_id: String,
    client_id: String,
}

impl ClientIdentity {
    /// Creates a new identity for `client_id` enrolled under `org_id`.
    #[must_use]
    pub fn new(org_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            client_id: client_id.into(),
        }
    }

    /// Identifier of the invoking organization.
    #[must_use]
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Identifier of the individual client within the organization.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// Context for a single transaction invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    tx_id: String,
    timestamp: TxTimestamp,
    identity: ClientIdentity,
}

impl TxContext {
    /// Creates a context from values proposed by the submitter.
    #[must_use]
    pub fn new(tx_id: impl Into<String>, timestamp: TxTimestamp, identity: ClientIdentity) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp,
            identity,
        }
    }

    /// Transaction identifier.
    #[must_use]
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Deterministic transaction timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> TxTimestamp {
        self.timestamp
    }

    /// Identity of the invoking client.
    #[must_use]
    pub const fn identity(&self) -> &ClientIdentity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601_uses_millisecond_utc() {
        let ts = TxTimestamp::from_seconds(1_704_067_200);
        assert_eq!(ts.to_iso8601().as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_iso8601_ignores_nanos() {
        let whole = TxTimestamp::new(1_704_067_200, 0);
        let fractional = TxTimestamp::new(1_704_067_200, 999_999_999);
        assert_eq!(whole.to_iso8601(), fractional.to_iso8601());
    }

    #[test]
    fn test_iso8601_out_of_range() {
        assert!(TxTimestamp::from_seconds(i64::MAX).to_iso8601().is_none());
    }

    #[test]
    fn test_timestamp_wire_shape() {
        let json = serde_json::to_string(&TxTimestamp::new(10, 5)).unwrap();
        assert_eq!(json, r#"{"seconds":10,"nanos":5}"#);
    }

    #[test]
    fn test_context_accessors() {
        let ctx = TxContext::new(
            "tx-1",
            TxTimestamp::from_seconds(42),
            ClientIdentity::new("Org1", "officer-7"),
        );
        assert_eq!(ctx.tx_id(), "tx-1");
        assert_eq!(ctx.timestamp().seconds, 42);
        assert_eq!(ctx.identity().org_id(), "Org1");
        assert_eq!(ctx.identity().client_id(), "officer-7");
    }
}
