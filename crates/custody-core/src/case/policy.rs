//! Custody transfer policy.
//!
//! Transfers are permissive by default: any identifier is accepted and the
//! caller is responsible for offering sensible targets. Deployments that
//! want the ledger itself to enforce the target set configure an
//! allow-list instead. The policy must be identical on every replica.

use std::collections::BTreeSet;

use super::error::CaseError;

/// Which custodians a case may be transferred to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CustodianPolicy {
    /// Accept any custodian identifier.
    #[default]
    Permissive,
    /// Accept only the listed custodians.
    AllowList(BTreeSet<String>),
}

impl CustodianPolicy {
    /// Builds an allow-list policy.
    #[must_use]
    pub fn allow_list<I, S>(custodians: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowList(custodians.into_iter().map(Into::into).collect())
    }

    /// Whether `custodian` is an acceptable transfer target.
    #[must_use]
    pub fn permits(&self, custodian: &str) -> bool {
        match self {
            Self::Permissive => true,
            Self::AllowList(allowed) => allowed.contains(custodian),
        }
    }

    /// Checks `custodian` against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::CustodianNotAllowed`] if the policy rejects it.
    pub fn check(&self, custodian: &str) -> Result<(), CaseError> {
        if self.permits(custodian) {
            Ok(())
        } else {
            Err(CaseError::CustodianNotAllowed {
                custodian: custodian.to_string(),
            })
        }
    }
}
