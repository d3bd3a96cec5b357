//! # custody-core
//!
//! Chain-of-custody case ledger.
//!
//! A *case* is a record whose every change is kept forever. Organizations
//! open cases, attach evidence identifiers, and hand cases to other
//! custodians; auditors replay the full trail of who held a case and what
//! was attached when.
//!
//! - [`ledger`]: append-only versioned key store with optimistic
//!   concurrency
//! - [`context`]: transaction context (id, agreed timestamp, invoker)
//! - [`case`]: the case state machine and its transaction functions
//! - [`history`]: version-by-version reconstruction of a case
//! - [`config`]: TOML configuration for deployments and clients
//!
//! ## Example
//!
//! ```rust
//! use custody_core::case::CaseContract;
//! use custody_core::context::{ClientIdentity, TxContext, TxTimestamp};
//! use custody_core::ledger::SqliteVersionStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let contract = CaseContract::new(SqliteVersionStore::in_memory()?);
//! let org1 = ClientIdentity::new("Org1", "officer-1");
//!
//! let ctx = TxContext::new("tx-1", TxTimestamp::from_seconds(1_704_067_200), org1.clone());
//! contract.create_case(&ctx, "CASE-1", "burglary")?;
//!
//! let ctx = TxContext::new("tx-2", TxTimestamp::from_seconds(1_704_070_800), org1);
//! contract.transfer_custody(&ctx, "CASE-1", "Forensics_Lab")?;
//!
//! let history = contract.case_history("CASE-1")?;
//! assert_eq!(history.len(), 2);
//! assert_eq!(history[1].tx_id, "tx-2");
//! # Ok(())
//! # }
//! ```

pub mod case;
pub mod config;
pub mod context;
pub mod history;
pub mod ledger;
