//! Case state machine.
//!
//! A case is created once, then only ever gains evidence or changes hands.
//! Every transition commits exactly one new version of the case key; a
//! failed transition commits nothing.
//!
//! # State Machine
//!
//! ```text
//!   (none) --createCase--> OPEN
//!    OPEN  --addEvidence--> OPEN  (evidence list grows by one)
//!    OPEN  --transferCustody--> OPEN  (custodian replaced)
//! ```
//!
//! # Invariants
//!
//! - `caseId` has at most one creating version; a second create is rejected.
//! - `evidenceList` only grows, and its order is the attachment order.
//! - `timestamp` is fixed by the creating transaction.
//! - No version is ever overwritten or deleted.
//!
//! # Example
//!
//! ```rust
//! use custody_core::case::CaseContract;
//! use custody_core::context::{ClientIdentity, TxContext, TxTimestamp};
//! use custody_core::ledger::SqliteVersionStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let contract = CaseContract::new(SqliteVersionStore::in_memory()?);
//! let identity = ClientIdentity::new("Org1", "officer-1");
//! let ctx = TxContext::new("tx-1", TxTimestamp::from_seconds(1_704_067_200), identity);
//!
//! let case = contract.create_case(&ctx, "CASE-1", "burglary")?;
//! assert_eq!(case.current_custodian, "Org1");
//! assert_eq!(case.timestamp, "2024-01-01T00:00:00.000Z");
//! # Ok(())
//! # }
//! ```

mod contract;
mod error;
mod policy;
mod state;


pub use contract::{CaseContract, functions};
pub use error::CaseError;
pub use policy::CustodianPolicy;
pub use state::{CaseAsset, CaseStatus, DocType};
