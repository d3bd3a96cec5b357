//! Case CLI commands.
//!
//! - `custody init`
//! - `custody create-case <id> <description>`
//! - `custody add-evidence <id> (<evidence-id> | --file <path>)`
//! - `custody transfer-custody <id> <custodian>`
//! - `custody exists <id>`
//! - `custody show <id>`

use std::fs;
use std::io::Read;
use std::path::Path;

use custody_core::case::CaseAsset;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Session, exit_codes, handle_case_error, output_error, print_json};

/// Prefix recorded in front of file digests.
pub const SHA256_PREFIX: &str = "sha256:";

/// Response for `custody exists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExistsResponse {
    /// The queried case.
    pub case_id: String,
    /// Whether it has any version.
    pub exists: bool,
}

/// Where an evidence identifier comes from.
#[derive(Debug, Clone, Copy)]
pub enum EvidenceSource<'a> {
    /// Recorded verbatim.
    Id(&'a str),
    /// Hashed, and recorded as `sha256:<hex>`.
    File(&'a Path),
}

/// Runs the no-op bootstrap function, creating the ledger file if needed.
pub fn init(session: &Session) -> u8 {
    let ctx = session.submitter().context();
    match session.contract().init_ledger(&ctx) {
        Ok(()) => {
            if !session.json() {
                println!(
                    "Ledger ready for {}",
                    session.submitter().identity().org_id()
                );
            }
            exit_codes::SUCCESS
        },
        Err(e) => handle_case_error(session.json(), &e),
    }
}

/// Opens a new case owned by the configured organization.
pub fn create(session: &Session, case_id: &str, description: &str) -> u8 {
    let result = session
        .submitter()
        .submit(|ctx| session.contract().create_case(ctx, case_id, description));
    report_asset(session, result, "Created")
}

/// Attaches an evidence identifier, or a file's SHA-256 digest.
pub fn add_evidence(session: &Session, case_id: &str, source: EvidenceSource<'_>) -> u8 {
    let evidence_id = match source {
        EvidenceSource::Id(id) => id.to_string(),
        EvidenceSource::File(path) => match hash_file(path) {
            Ok(digest) => digest,
            Err(message) => {
                return output_error(session.json(), "io", &message, exit_codes::ERROR);
            },
        },
    };

    let result = session
        .submitter()
        .submit(|ctx| session.contract().add_evidence(ctx, case_id, &evidence_id));
    report_asset(session, result, "Evidence attached to")
}

/// Hands a case to another custodian.
pub fn transfer(session: &Session, case_id: &str, custodian: &str) -> u8 {
    let result = session
        .submitter()
        .submit(|ctx| session.contract().transfer_custody(ctx, case_id, custodian));
    report_asset(session, result, "Transferred")
}

/// Reports whether a case exists.
pub fn exists(session: &Session, case_id: &str) -> u8 {
    match session.contract().case_exists(case_id) {
        Ok(exists) if session.json() => print_json(&ExistsResponse {
            case_id: case_id.to_string(),
            exists,
        }),
        Ok(exists) => {
            println!("{exists}");
            exit_codes::SUCCESS
        },
        Err(e) => handle_case_error(session.json(), &e),
    }
}

/// Prints the latest snapshot of a case.
pub fn show(session: &Session, case_id: &str) -> u8 {
    report_asset(session, session.contract().read_case(case_id), "Case")
}

fn report_asset(
    session: &Session,
    result: Result<CaseAsset, custody_core::case::CaseError>,
    verb: &str,
) -> u8 {
    match result {
        Ok(asset) if session.json() => print_json(&asset),
        Ok(asset) => {
            println!("{verb} {}", asset.case_id);
            print_asset(&asset);
            exit_codes::SUCCESS
        },
        Err(e) => handle_case_error(session.json(), &e),
    }
}

/// Prints an asset as aligned text.
pub(super) fn print_asset(asset: &CaseAsset) {
    println!("  Description:  {}", asset.description);
    println!("  Created:      {}", asset.timestamp);
    println!("  Custodian:    {}", asset.current_custodian);
    println!("  Status:       {}", asset.status);
    if asset.evidence_list.is_empty() {
        println!("  Evidence:     (none)");
    } else {
        println!("  Evidence:");
        for (i, evidence) in asset.evidence_list.iter().enumerate() {
            println!("    {}. {evidence}", i + 1);
        }
    }
}

/// Hashes a file's contents as `sha256:<hex>`.
///
/// # Errors
///
/// Returns a message if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let mut file = fs::File::open(path)
        .map_err(|err| format!("failed to open {} for hashing: {err}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|err| format!("failed to read {} for hashing: {err}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{SHA256_PREFIX}{}", hex::encode(hasher.finalize())))
}
