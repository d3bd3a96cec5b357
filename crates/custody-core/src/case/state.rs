//! Case asset data model.
//!
//! A [`CaseAsset`] is an immutable value: each operation builds the next
//! version from the previous one instead of mutating it in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::CaseError;

/// Lifecycle marker of a case.
///
/// Only [`CaseStatus::Open`] is produced today; further states are reserved
/// for future transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum CaseStatus {
    /// The case is under investigation.
    Open,
}

impl CaseStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            other => Err(CaseError::InvalidArgument {
                field: "status",
                reason: format!("unknown case status '{other}'"),
            }),
        }
    }
}

/// Discriminator tag for documents sharing the store with other asset kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// A case record.
    #[default]
    Case,
}

/// A case record as stored at one version.
///
/// Field order matches the stored document so serialization is
/// byte-for-byte stable across replicas. Fields this version does not know
/// are kept in [`CaseAsset::extra`] and written back unchanged, so a
/// document extended by a newer writer survives every transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAsset {
    /// Unique, immutable case key.
    pub case_id: String,
    /// Free-text summary, set at creation.
    pub description: String,
    /// Creation time (ISO-8601), taken from the creating transaction.
    pub timestamp: String,
    /// Entity currently responsible for the case.
    pub current_custodian: String,
    /// Lifecycle marker.
    pub status: CaseStatus,
    /// Evidence identifiers in attachment order.
    pub evidence_list: Vec<String>,
    /// Always [`DocType::Case`].
    pub doc_type: DocType,
    /// Unrecognized fields, serialized after the known ones in key order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CaseAsset {
    /// Builds the first version of a case.
    #[must_use]
    pub fn open(
        case_id: impl Into<String>,
        description: impl Into<String>,
        custodian: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            description: description.into(),
            timestamp: timestamp.into(),
            current_custodian: custodian.into(),
            status: CaseStatus::Open,
            evidence_list: Vec::new(),
            doc_type: DocType::Case,
            extra: Map::new(),
        }
    }

    /// Returns the next version with `evidence_id` appended.
    ///
    /// Repeated identifiers are kept; each attachment is its own audit
    /// event.
    #[must_use]
    pub fn with_evidence(&self, evidence_id: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.evidence_list.push(evidence_id.into());
        next
    }

    /// Returns the next version held by `custodian`.
    #[must_use]
    pub fn with_custodian(&self, custodian: impl Into<String>) -> Self {
        Self {
            current_custodian: custodian.into(),
            ..self.clone()
        }
    }

    /// Serializes the asset to its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CaseError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses an asset from its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::MalformedData`] if the bytes are not a case
    /// document.
    pub fn from_bytes(case_id: &str, bytes: &[u8]) -> Result<Self, CaseError> {
        serde_json::from_slice(bytes).map_err(|e| CaseError::MalformedData {
            case_id: case_id.to_string(),
            reason: e.to_string(),
        })
    }
}
