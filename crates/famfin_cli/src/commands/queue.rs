//! Queue command implementation.

use super::open_store;
use famfin_protocol::QueueEntry;
use std::path::Path;

/// Runs the queue command.
pub fn run(path: &Path, parked_only: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let entries = if parked_only {
        store.list_parked()
    } else {
        store.list_queue()
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            if entries.is_empty() {
                println!("Queue is empty");
            }
            for entry in &entries {
                println!("{}", describe(entry));
            }
        }
    }
    Ok(())
}

/// One-line summary of an entry.
pub fn describe(entry: &QueueEntry) -> String {
    let state = if entry.synced {
        "synced"
    } else if entry.parked {
        "parked"
    } else {
        "pending"
    };
    let mut line = format!(
        "#{:<5} {:<7} {} {:<11} {}",
        entry.seq,
        state,
        entry.mutation.action(),
        entry.mutation.kind(),
        entry.mutation.target_id()
    );
    if entry.attempts > 0 {
        line.push_str(&format!(" attempts={}", entry.attempts));
    }
    if let Some(error) = &entry.last_error {
        line.push_str(&format!(" error={error:?}"));
    }
    line
}
