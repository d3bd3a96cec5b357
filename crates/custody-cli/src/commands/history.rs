//! `custody history <id> [--newest-first]`.

use custody_core::history::{HistoryEntry, HistoryOrder, HistoryRecord};

use super::case::print_asset;
use super::{Session, exit_codes, handle_case_error, print_json};

/// Prints every version of a case.
pub fn run(session: &Session, case_id: &str, newest_first: bool) -> u8 {
    let order = if newest_first {
        HistoryOrder::NewestFirst
    } else {
        HistoryOrder::OldestFirst
    };

    match session.contract().case_history_ordered(case_id, order) {
        Ok(entries) if session.json() => print_json(&entries),
        Ok(entries) if entries.is_empty() => {
            println!("No history for {case_id}");
            exit_codes::SUCCESS
        },
        Ok(entries) => {
            for entry in &entries {
                print_entry(entry);
            }
            exit_codes::SUCCESS
        },
        Err(e) => handle_case_error(session.json(), &e),
    }
}

fn print_entry(entry: &HistoryEntry) {
    let when = entry
        .timestamp
        .to_iso8601()
        .unwrap_or_else(|| entry.timestamp.to_string());
    println!("{}  {when}", entry.tx_id);
    match &entry.record {
        HistoryRecord::Case(asset) => print_asset(asset),
        HistoryRecord::Raw(raw) => println!("  (unparsed) {raw}"),
    }
}
