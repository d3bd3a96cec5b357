//! CLI command implementations.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (validation, missing case, storage, etc.)
//! - 2: Conflicting commit persisted after every retry

pub mod case;
pub mod history;
pub mod submit;

use custody_core::case::{CaseContract, CaseError};
use custody_core::config::CustodyConfig;
use custody_core::context::ClientIdentity;
use custody_core::ledger::{LedgerError, SqliteVersionStore};
use serde::{Deserialize, Serialize};

use self::submit::Submitter;

/// Exit codes for custody commands.
pub mod exit_codes {
    /// Success exit code.
    pub const SUCCESS: u8 = 0;
    /// General error exit code.
    pub const ERROR: u8 = 1;
    /// Conflict retries exhausted.
    pub const CONFLICT: u8 = 2;
}

/// An open ledger plus the identity submitting against it.
pub struct Session {
    contract: CaseContract<SqliteVersionStore>,
    submitter: Submitter,
    json: bool,
}

impl Session {
    /// Opens the ledger named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger file cannot be opened.
    pub fn open(config: &CustodyConfig, json: bool) -> Result<Self, LedgerError> {
        let store = SqliteVersionStore::open(&config.ledger.path)?
            .with_history_batch_size(config.ledger.history_batch_size);
        let contract = CaseContract::new(store).with_custodian_policy(config.custodian_policy());
        let identity = ClientIdentity::new(
            config.identity.org_id.clone(),
            config.identity.client_id.clone(),
        );

        Ok(Self {
            contract,
            submitter: Submitter::new(identity, config.client.max_conflict_retries),
            json,
        })
    }

    /// The case contract bound to the ledger.
    #[must_use]
    pub const fn contract(&self) -> &CaseContract<SqliteVersionStore> {
        &self.contract
    }

    /// The transaction submitter.
    #[must_use]
    pub const fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    /// Whether output is JSON.
    #[must_use]
    pub const fn json(&self) -> bool {
        self.json
    }
}

/// Error payload for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Output an error in the appropriate format.
fn output_error(json_output: bool, code: &str, message: &str, exit_code: u8) -> u8 {
    if json_output {
        let error = ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        };
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&error).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        eprintln!("Error: {message}");
    }
    exit_code
}

/// Machine-readable code for a case error.
const fn error_code(error: &CaseError) -> &'static str {
    match error {
        CaseError::AlreadyExists { .. } => "already_exists",
        CaseError::NotFound { .. } => "not_found",
        CaseError::Conflict { .. } => "conflict",
        CaseError::MalformedData { .. } => "malformed_data",
        CaseError::InvalidArgument { .. } => "invalid_argument",
        CaseError::CustodianNotAllowed { .. } => "custodian_not_allowed",
        CaseError::InvalidTimestamp { .. } => "invalid_timestamp",
        CaseError::UnknownFunction { .. } => "unknown_function",
        CaseError::ArgumentCount { .. } => "argument_count",
        CaseError::Serialization(_) => "serialization",
        _ => "ledger",
    }
}

/// Reports a case error and returns the matching exit code.
fn handle_case_error(json_output: bool, error: &CaseError) -> u8 {
    let exit_code = if error.is_retryable() {
        exit_codes::CONFLICT
    } else {
        exit_codes::ERROR
    };
    output_error(json_output, error_code(error), &error.to_string(), exit_code)
}

/// Prints a value as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> u8 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            exit_codes::SUCCESS
        },
        Err(e) => output_error(true, "serialization", &e.to_string(), exit_codes::ERROR),
    }
}
