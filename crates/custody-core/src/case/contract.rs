//! Case transaction functions.
//!
//! Each mutating function is one read-modify-write against a single key:
//!
//! 1. read the latest version (and remember its version number),
//! 2. validate preconditions,
//! 3. build the next [`CaseAsset`] with a pure transformation,
//! 4. append it, conditional on the head still being the version read.
//!
//! Step 4 fails with [`CaseError::Conflict`] if another transaction
//! committed in between. No function retries on its own; the submitter
//! decides whether to resubmit with fresh state.

use tracing::{debug, info};

use super::error::CaseError;
use super::policy::CustodianPolicy;
use super::state::CaseAsset;
use crate::context::TxContext;
use crate::history::{self, HistoryEntry, HistoryOrder};
use crate::ledger::{VersionStore, VersionedValue};

/// Names of the transaction functions accepted by [`CaseContract::invoke`].
pub mod functions {
    /// No-op bootstrap hook.
    pub const INIT_LEDGER: &str = "initLedger";
    /// Create a new case.
    pub const CREATE_CASE: &str = "createCase";
    /// Attach an evidence identifier.
    pub const ADD_EVIDENCE: &str = "addEvidence";
    /// Hand the case to another custodian.
    pub const TRANSFER_CUSTODY: &str = "transferCustody";
    /// Existence check.
    pub const CASE_EXISTS: &str = "caseExists";
    /// Latest snapshot.
    pub const READ_CASE: &str = "readCase";
    /// Full version history.
    pub const GET_CASE_HISTORY: &str = "getCaseHistory";

    /// Every function name, in declaration order.
    pub const ALL: [&str; 7] = [
        INIT_LEDGER,
        CREATE_CASE,
        ADD_EVIDENCE,
        TRANSFER_CUSTODY,
        CASE_EXISTS,
        READ_CASE,
        GET_CASE_HISTORY,
    ];

    /// Whether the function only reads state.
    #[must_use]
    pub fn is_query(function: &str) -> bool {
        matches!(function, CASE_EXISTS | READ_CASE | GET_CASE_HISTORY)
    }
}

/// The case contract: transaction functions bound to a versioned store.
#[derive(Debug)]
pub struct CaseContract<S> {
    store: S,
    custodian_policy: CustodianPolicy,
}

impl<S: VersionStore> CaseContract<S> {
    /// Creates a contract with the permissive custodian policy.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            custodian_policy: CustodianPolicy::default(),
        }
    }

    /// Replaces the custodian policy.
    #[must_use]
    pub fn with_custodian_policy(mut self, policy: CustodianPolicy) -> Self {
        self.custodian_policy = policy;
        self
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The active custodian policy.
    #[must_use]
    pub const fn custodian_policy(&self) -> &CustodianPolicy {
        &self.custodian_policy
    }

    /// Bootstrap hook. Writes nothing.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other transaction functions.
    pub fn init_ledger(&self, ctx: &TxContext) -> Result<(), CaseError> {
        debug!(tx_id = ctx.tx_id(), "init ledger");
        Ok(())
    }

    /// Creates a case owned by the invoking organization.
    ///
    /// The creation timestamp is the transaction's agreed timestamp, so
    /// every replica produces the same document.
    ///
    /// # Errors
    ///
    /// - [`CaseError::InvalidArgument`] if `case_id` is empty.
    /// - [`CaseError::AlreadyExists`] if the case has any version.
    /// - [`CaseError::InvalidTimestamp`] if the transaction timestamp cannot
    ///   be rendered.
    /// - [`CaseError::Conflict`] if a concurrent create won.
    pub fn create_case(
        &self,
        ctx: &TxContext,
        case_id: &str,
        description: &str,
    ) -> Result<CaseAsset, CaseError> {
        validate_case_id(case_id)?;
        if self.case_exists(case_id)? {
            return Err(CaseError::AlreadyExists {
                case_id: case_id.to_string(),
            });
        }

        let ts = ctx.timestamp();
        let timestamp = ts
            .to_iso8601()
            .ok_or(CaseError::InvalidTimestamp { seconds: ts.seconds })?;
        let asset = CaseAsset::open(case_id, description, ctx.identity().org_id(), timestamp);

        let version = self.commit(ctx, None, &asset)?;
        info!(
            case_id,
            tx_id = ctx.tx_id(),
            version,
            custodian = %asset.current_custodian,
            "case created"
        );
        Ok(asset)
    }

    /// Appends `evidence_id` to the case's evidence list.
    ///
    /// # Errors
    ///
    /// - [`CaseError::NotFound`] if the case has no version.
    /// - [`CaseError::MalformedData`] if the latest version is not a case.
    /// - [`CaseError::Conflict`] if a concurrent transaction committed first.
    pub fn add_evidence(
        &self,
        ctx: &TxContext,
        case_id: &str,
        evidence_id: &str,
    ) -> Result<CaseAsset, CaseError> {
        let (base, current) = self.load(case_id)?;
        let next = current.with_evidence(evidence_id);

        let version = self.commit(ctx, Some(base), &next)?;
        info!(
            case_id,
            tx_id = ctx.tx_id(),
            version,
            evidence_id,
            evidence_count = next.evidence_list.len(),
            "evidence attached"
        );
        Ok(next)
    }

    /// Hands the case to `new_custodian`.
    ///
    /// The target is checked against the configured [`CustodianPolicy`];
    /// the default policy accepts any identifier.
    ///
    /// # Errors
    ///
    /// - [`CaseError::NotFound`] if the case has no version.
    /// - [`CaseError::CustodianNotAllowed`] if the policy rejects the target.
    /// - [`CaseError::MalformedData`] if the latest version is not a case.
    /// - [`CaseError::Conflict`] if a concurrent transaction committed first.
    pub fn transfer_custody(
        &self,
        ctx: &TxContext,
        case_id: &str,
        new_custodian: &str,
    ) -> Result<CaseAsset, CaseError> {
        let (base, current) = self.load(case_id)?;
        self.custodian_policy.check(new_custodian)?;
        let next = current.with_custodian(new_custodian);

        let version = self.commit(ctx, Some(base), &next)?;
        info!(
            case_id,
            tx_id = ctx.tx_id(),
            version,
            from = %current.current_custodian,
            to = new_custodian,
            "custody transferred"
        );
        Ok(next)
    }

    /// Whether the case has at least one version.
    ///
    /// # Errors
    ///
    /// Returns an error if `case_id` is empty or the store read fails.
    pub fn case_exists(&self, case_id: &str) -> Result<bool, CaseError> {
        validate_case_id(case_id)?;
        let latest = self
            .store
            .get_state(case_id)
            .map_err(|e| CaseError::from_ledger(case_id, e))?;
        Ok(latest.is_some())
    }

    /// Reads the latest snapshot of a case.
    ///
    /// # Errors
    ///
    /// - [`CaseError::NotFound`] if the case has no version.
    /// - [`CaseError::MalformedData`] if the latest version is not a case.
    pub fn read_case(&self, case_id: &str) -> Result<CaseAsset, CaseError> {
        self.load(case_id).map(|(_, asset)| asset)
    }

    /// Reconstructs the case's full version history, oldest first.
    ///
    /// A case that never existed has an empty history.
    ///
    /// # Errors
    ///
    /// Returns an error if the version chain cannot be read.
    pub fn case_history(&self, case_id: &str) -> Result<Vec<HistoryEntry>, CaseError> {
        self.case_history_ordered(case_id, HistoryOrder::OldestFirst)
    }

    /// Reconstructs the case's full version history in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if the version chain cannot be read.
    pub fn case_history_ordered(
        &self,
        case_id: &str,
        order: HistoryOrder,
    ) -> Result<Vec<HistoryEntry>, CaseError> {
        validate_case_id(case_id)?;
        history::get_case_history_ordered(&self.store, case_id, order)
    }

    /// Invokes a transaction function by name with string arguments.
    ///
    /// Returns the JSON payload the function produces: the case document for
    /// create/update/read, `true`/`false` for existence checks, the history
    /// array for history queries, and an empty payload for `initLedger`.
    ///
    /// # Errors
    ///
    /// - [`CaseError::UnknownFunction`] for an unrecognized name.
    /// - [`CaseError::ArgumentCount`] if the arity does not match.
    /// - Any error of the invoked function.
    pub fn invoke(
        &self,
        ctx: &TxContext,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, CaseError> {
        debug!(function, tx_id = ctx.tx_id(), argc = args.len(), "invoke");
        match function {
            functions::INIT_LEDGER => {
                arity::<0>(functions::INIT_LEDGER, args)?;
                self.init_ledger(ctx)?;
                Ok(Vec::new())
            },
            functions::CREATE_CASE => {
                let [case_id, description] = arity::<2>(functions::CREATE_CASE, args)?;
                self.create_case(ctx, case_id, description)?.to_bytes()
            },
            functions::ADD_EVIDENCE => {
                let [case_id, evidence_id] = arity::<2>(functions::ADD_EVIDENCE, args)?;
                self.add_evidence(ctx, case_id, evidence_id)?.to_bytes()
            },
            functions::TRANSFER_CUSTODY => {
                let [case_id, custodian] = arity::<2>(functions::TRANSFER_CUSTODY, args)?;
                self.transfer_custody(ctx, case_id, custodian)?.to_bytes()
            },
            functions::CASE_EXISTS => {
                let [case_id] = arity::<1>(functions::CASE_EXISTS, args)?;
                Ok(serde_json::to_vec(&self.case_exists(case_id)?)?)
            },
            functions::READ_CASE => {
                let [case_id] = arity::<1>(functions::READ_CASE, args)?;
                self.read_case(case_id)?.to_bytes()
            },
            functions::GET_CASE_HISTORY => {
                let [case_id] = arity::<1>(functions::GET_CASE_HISTORY, args)?;
                Ok(serde_json::to_vec(&self.case_history(case_id)?)?)
            },
            other => Err(CaseError::UnknownFunction {
                function: other.to_string(),
            }),
        }
    }

    /// Reads and parses the latest version, returning its version number.
    fn load(&self, case_id: &str) -> Result<(u64, CaseAsset), CaseError> {
        validate_case_id(case_id)?;
        let latest = self
            .store
            .get_state(case_id)
            .map_err(|e| CaseError::from_ledger(case_id, e))?;

        let Some(VersionedValue { version, value }) = latest else {
            return Err(CaseError::NotFound {
                case_id: case_id.to_string(),
            });
        };
        if value.is_empty() {
            return Err(CaseError::MalformedData {
                case_id: case_id.to_string(),
                reason: format!("version {version} has an empty payload"),
            });
        }

        let asset = CaseAsset::from_bytes(case_id, &value)?;
        debug!(case_id, version, "loaded case");
        Ok((version, asset))
    }

    fn commit(
        &self,
        ctx: &TxContext,
        base_version: Option<u64>,
        asset: &CaseAsset,
    ) -> Result<u64, CaseError> {
        let bytes = asset.to_bytes()?;
        self.store
            .put_state(
                &asset.case_id,
                base_version,
                &bytes,
                ctx.tx_id(),
                ctx.timestamp(),
            )
            .map_err(|e| CaseError::from_ledger(&asset.case_id, e))
    }
}

fn validate_case_id(case_id: &str) -> Result<(), CaseError> {
    if case_id.is_empty() {
        return Err(CaseError::InvalidArgument {
            field: "caseId",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn arity<'a, const N: usize>(
    function: &'static str,
    args: &'a [String],
) -> Result<&'a [String; N], CaseError> {
    <&[String; N]>::try_from(args).map_err(|_| CaseError::ArgumentCount {
        function,
        expected: N,
        actual: args.len(),
    })
}
