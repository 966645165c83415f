//! Cache command implementation.

use super::open_store;
use famfin_protocol::{EntityKind, Record};
use famfin_store::LocalStore;
use std::path::Path;

/// Returns a family's cached records, optionally of one kind.
pub fn collect(store: &LocalStore, family_id: &str, kind: Option<EntityKind>) -> Vec<Record> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    };
    kinds
        .into_iter()
        .flat_map(|kind| store.get_all_by_family(kind, family_id))
        .collect()
}

/// Runs the cache command.
pub fn run(
    path: &Path,
    family_id: &str,
    kind: Option<EntityKind>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let records = collect(&store, family_id, kind);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => {
            println!("Family {}: {} record(s)", family_id, records.len());
            for record in &records {
                println!("  {}", summarize(record));
            }
        }
    }
    Ok(())
}

fn summarize(record: &Record) -> String {
    match record {
        Record::Transaction(t) => format!(
            "transaction {} {} {:?} {} account={} category={}",
            t.id, t.date, t.transaction_type, t.amount, t.account_id, t.category_id
        ),
        Record::Account(a) => format!(
            "account     {} {:?} {:?} balance={}",
            a.id, a.name, a.account_type, a.balance
        ),
        Record::Category(c) => format!(
            "category    {} {:?} {:?}",
            c.id, c.name, c.category_type
        ),
    }
}
