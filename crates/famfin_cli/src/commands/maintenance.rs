//! Clear, purge, compact and requeue commands.

use super::open_store;
use std::path::Path;

/// Drops cached data of one family, or all data including the queue.
pub fn clear(path: &Path, family_id: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let pending = store.pending_count();
    let ok = match family_id {
        Some(family_id) => store.clear_family(family_id),
        None => store.clear(),
    };
    if !ok {
        return Err("Clear failed; see log".into());
    }

    match family_id {
        Some(family_id) => println!("Cleared cached records of family {family_id}"),
        None if pending > 0 => {
            println!("Cleared all data ({pending} unsynced mutation(s) discarded)")
        }
        None => println!("Cleared all data"),
    }
    Ok(())
}

/// Removes synced queue entries.
pub fn purge(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let purged = store.purge_synced();
    println!("Purged {purged} synced entr{}", if purged == 1 { "y" } else { "ies" });
    Ok(())
}

/// Rewrites the journal as one snapshot frame.
pub fn compact(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let before = store.storage_estimate().used;
    if !store.compact() {
        return Err("Compaction failed; see log".into());
    }
    let after = store.storage_estimate().used;

    println!("Compacted journal at {:?}", path);
    println!("  Size before: {} bytes", before);
    println!("  Size after:  {} bytes", after);
    println!(
        "  Space saved: {} bytes ({:.1}%)",
        before.saturating_sub(after),
        if before > 0 {
            (before.saturating_sub(after) as f64 / before as f64) * 100.0
        } else {
            0.0
        }
    );
    Ok(())
}

/// Returns parked entries to the queue.
pub fn requeue(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let count = store.requeue_parked();
    println!("Requeued {count} parked entr{}", if count == 1 { "y" } else { "ies" });
    Ok(())
}
