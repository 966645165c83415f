//! Replay command implementation.
//!
//! Copies the journal into memory and drains the queue against an
//! [`InMemoryRemote`], so the file is never modified.

use famfin_storage::{FileBackend, InMemoryBackend, StorageBackend};
use famfin_store::{LocalStore, StoreConfig};
use famfin_sync_engine::{
    Connectivity, InMemoryRemote, RemoteCall, SyncConfig, SyncEngine, SyncOutcome,
};
use std::path::Path;
use std::sync::Arc;

/// What a dry-run pass sent and how it ended.
#[derive(Debug)]
pub struct ReplayReport {
    /// Calls in the order the remote received them.
    pub calls: Vec<RemoteCall>,
    /// The pass outcome.
    pub outcome: SyncOutcome,
    /// Entries still pending afterwards.
    pub remaining: usize,
}

/// Runs one pass over `store` against a fresh in-memory remote.
pub fn dry_run(store: LocalStore) -> Result<ReplayReport, Box<dyn std::error::Error>> {
    let store = Arc::new(store);
    let remote = Arc::new(InMemoryRemote::new());
    let engine = SyncEngine::new(
        SyncConfig::default(),
        Arc::clone(&store),
        Arc::clone(&remote),
        Connectivity::new(true),
    );
    let outcome = engine.sync_all()?;
    Ok(ReplayReport {
        calls: remote.calls(),
        outcome,
        remaining: store.pending_count(),
    })
}

/// Runs the replay command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No journal found at {:?}", path).into());
    }
    let bytes = {
        let file = FileBackend::open(path)?;
        let size = file.size()?;
        file.read_at(0, size as usize)?
    };
    let store = LocalStore::open(
        Box::new(InMemoryBackend::with_data(bytes)),
        StoreConfig::default(),
    )?;

    let report = dry_run(store)?;
    println!("Replayed against in-memory backend (journal unchanged)");
    for call in &report.calls {
        match &call.id {
            Some(id) => println!("  {} {} {}", call.method, call.kind, id),
            None => println!("  {} {}", call.method, call.kind),
        }
    }
    println!();
    println!("  Synced:    {}", report.outcome.synced);
    println!("  Remapped:  {}", report.outcome.remapped);
    println!("  Failed:    {}", report.outcome.errors.len());
    println!("  Remaining: {}", report.remaining);
    for error in &report.outcome.errors {
        println!("  ! {error}");
    }
    Ok(())
}
