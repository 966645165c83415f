//! Status command implementation.

use super::open_store;
use famfin_store::LocalStore;
use serde::Serialize;
use std::path::Path;

/// Store statistics.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Journal path.
    pub path: String,
    /// Journal size in bytes.
    pub journal_bytes: u64,
    /// Configured quota in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
    /// Cached transactions.
    pub transactions: usize,
    /// Cached accounts.
    pub accounts: usize,
    /// Cached categories.
    pub categories: usize,
    /// All queue entries.
    pub queued: usize,
    /// Entries awaiting replay.
    pub pending: usize,
    /// Parked entries.
    pub parked: usize,
    /// Families with cached rows.
    pub families: Vec<String>,
}

impl StatusReport {
    /// Collects the report from an open store.
    pub fn collect(path: &Path, store: &LocalStore) -> Self {
        let stats = store.stats();
        Self {
            path: path.display().to_string(),
            journal_bytes: stats.journal_bytes,
            quota_bytes: store.storage_estimate().quota,
            transactions: stats.transactions,
            accounts: stats.accounts,
            categories: stats.categories,
            queued: stats.queued,
            pending: stats.pending,
            parked: stats.parked,
            families: store.families(),
        }
    }
}

/// Runs the status command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let report = StatusReport::collect(path, &store);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &StatusReport) {
    println!("Journal: {}", report.path);
    match report.quota_bytes {
        Some(quota) => println!("  Size:  {} / {} bytes", report.journal_bytes, quota),
        None => println!("  Size:  {} bytes", report.journal_bytes),
    }
    println!();
    println!("Cache:");
    println!("  Transactions: {}", report.transactions);
    println!("  Accounts:     {}", report.accounts);
    println!("  Categories:   {}", report.categories);
    if !report.families.is_empty() {
        println!("  Families:     {}", report.families.join(", "));
    }
    println!();
    println!("Queue:");
    println!("  Entries: {}", report.queued);
    println!("  Pending: {}", report.pending);
    println!("  Parked:  {}", report.parked);
}
