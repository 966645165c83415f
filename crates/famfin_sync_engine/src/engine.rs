//! The synchronization engine.

use crate::config::SyncConfig;
use crate::connectivity::Connectivity;
use crate::error::{SyncError, SyncResult};
use crate::remote::{into_result, RemoteApi};
use chrono::{DateTime, Utc};
use famfin_protocol::{is_provisional, Mutation, QueueEntry, Record};
use famfin_store::LocalStore;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The engine's pass state.
///
/// `Idle → Running → (Succeeded | PartialFailure) → Idle`. The settled
/// states are recorded in [`SyncStats::last_pass`]; [`SyncEngine::state`]
/// returns to `Idle` as soon as the busy flag is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No pass is running.
    Idle,
    /// A pass is draining the queue.
    Running,
    /// The last pass replayed every entry.
    Succeeded,
    /// The last pass left at least one entry failed.
    PartialFailure,
}

/// Result of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// True if no entry failed.
    pub success: bool,
    /// One message per failed entry, in seq order.
    pub errors: Vec<String>,
    /// Entries confirmed by the remote.
    pub synced: usize,
    /// Provisional ids replaced by server ids.
    pub remapped: usize,
    /// Entries parked by this pass.
    pub parked: usize,
    /// Synced entries dropped at the end of the pass.
    pub purged: usize,
    /// Wall time of the pass.
    pub duration: Duration,
}

/// Snapshot for status indicators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Connectivity state.
    pub is_online: bool,
    /// Entries waiting for a pass.
    pub pending_items: usize,
    /// Completion time of the last pass.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Whether a pass is running.
    pub sync_in_progress: bool,
}

/// Statistics about sync passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of passes completed.
    pub passes_completed: u64,
    /// Total number of entries confirmed.
    pub entries_synced: u64,
    /// Total number of failed entry attempts.
    pub entries_failed: u64,
    /// Total number of entries parked.
    pub entries_parked: u64,
    /// Total number of provisional ids remapped.
    pub ids_remapped: u64,
    /// Settled state of the last pass.
    pub last_pass: Option<SyncState>,
    /// Completion time of the last pass.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// First error of the last pass.
    pub last_error: Option<String>,
}

/// Releases the busy flag when a pass ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Replays the durable queue against the remote API.
///
/// # Invariants
///
/// - At most one pass runs at a time (atomic busy flag)
/// - Entries are replayed one at a time in ascending seq
/// - A failed entry stays queued and does not stop the pass
/// - Only synced entries are purged
pub struct SyncEngine<R: RemoteApi> {
    config: SyncConfig,
    store: Arc<LocalStore>,
    remote: Arc<R>,
    connectivity: Connectivity,
    busy: AtomicBool,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<R: RemoteApi> SyncEngine<R> {
    /// Creates a new engine.
    pub fn new(
        config: SyncConfig,
        store: Arc<LocalStore>,
        remote: Arc<R>,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            config,
            store,
            remote,
            connectivity,
            busy: AtomicBool::new(false),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true while a pass holds the busy flag.
    pub fn is_syncing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Returns the status shown by indicators.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            is_online: self.connectivity.is_online(),
            pending_items: self.store.pending_count(),
            last_sync_time: self.stats.read().last_sync_time,
            sync_in_progress: self.is_syncing(),
        }
    }

    /// Runs a pass on explicit request.
    ///
    /// # Errors
    ///
    /// [`SyncError::Offline`] while offline, [`SyncError::PassInProgress`]
    /// if a pass is running.
    pub fn force_sync_now(&self) -> SyncResult<SyncOutcome> {
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        info!("manual sync requested");
        self.sync_all()
    }

    /// Drains the queue once.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Offline`] or [`SyncError::PassInProgress`]
    /// without touching the queue. Entry failures are not errors; they are
    /// listed in the outcome.
    pub fn sync_all(&self) -> SyncResult<SyncOutcome> {
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::PassInProgress);
        }
        let _busy = BusyGuard(&self.busy);

        *self.state.write() = SyncState::Running;
        let outcome = self.run_pass();
        let settled = if outcome.success {
            SyncState::Succeeded
        } else {
            SyncState::PartialFailure
        };

        {
            let mut stats = self.stats.write();
            stats.passes_completed += 1;
            stats.entries_synced += outcome.synced as u64;
            stats.entries_failed += outcome.errors.len() as u64;
            stats.entries_parked += outcome.parked as u64;
            stats.ids_remapped += outcome.remapped as u64;
            stats.last_pass = Some(settled);
            stats.last_sync_time = Some(Utc::now());
            stats.last_error = outcome.errors.first().cloned();
        }
        *self.state.write() = SyncState::Idle;

        info!(
            synced = outcome.synced,
            failed = outcome.errors.len(),
            remapped = outcome.remapped,
            parked = outcome.parked,
            elapsed_ms = outcome.duration.as_millis() as u64,
            "sync pass finished"
        );
        Ok(outcome)
    }

    fn run_pass(&self) -> SyncOutcome {
        let start = Instant::now();
        let mut outcome = SyncOutcome::default();

        let seqs: Vec<u64> = self.store.list_unsynced().iter().map(|e| e.seq).collect();
        if seqs.is_empty() {
            debug!("no pending queue entries");
            outcome.success = true;
            outcome.duration = start.elapsed();
            return outcome;
        }
        debug!(pending = seqs.len(), "replaying queue");

        for seq in seqs {
            // Re-read: a remap earlier in this pass may have rewritten it.
            let Some(entry) = self.store.queue_entry(seq) else {
                continue;
            };
            if !entry.is_pending() {
                continue;
            }

            match self.replay(&entry) {
                Ok(remapped) => {
                    outcome.synced += 1;
                    if remapped {
                        outcome.remapped += 1;
                    }
                }
                Err(e) => {
                    let message = format!(
                        "failed to sync {} {}: {}",
                        entry.mutation.kind(),
                        entry.mutation.action(),
                        e
                    );
                    let park = self.config.retry.should_park(entry.attempts + 1);
                    warn!(seq, attempts = entry.attempts + 1, park, "{message}");
                    self.store.record_failure(seq, &message, park);
                    if park {
                        outcome.parked += 1;
                    }
                    outcome.errors.push(message);
                }
            }
        }

        outcome.purged = self.store.purge_synced();
        outcome.success = outcome.errors.is_empty();
        outcome.duration = start.elapsed();
        outcome
    }

    /// Replays one entry. Returns true if a provisional id was remapped.
    fn replay(&self, entry: &QueueEntry) -> SyncResult<bool> {
        if let Some(id) = entry.mutation.unresolved_reference() {
            return Err(SyncError::UnresolvedProvisional { id: id.to_string() });
        }

        match &entry.mutation {
            Mutation::Create { record } => {
                let kind = record.kind();
                let draft = record.to_draft();
                let response =
                    self.remote
                        .create(record.family_id(), record.created_by(), &draft)?;
                let server = into_result(response)?
                    .filter(|r| !r.id().is_empty() && !is_provisional(r.id()))
                    .ok_or(SyncError::MissingServerId { kind })?;
                let local_id = record.id();
                if !is_provisional(local_id) {
                    self.confirm(entry.seq, Some(server))?;
                    return Ok(false);
                }

                let server_id = server.id().to_string();
                if !self.store.confirm_create(entry.seq, server, local_id) {
                    return Err(SyncError::store_rejected("confirm_create"));
                }
                debug!(%kind, provisional = local_id, server = %server_id, "remapped id");
                Ok(true)
            }
            Mutation::Update { id, patch } => {
                let response = self.remote.update(patch.kind(), id, patch)?;
                let updated = into_result(response)?;
                self.confirm(entry.seq, updated)?;
                Ok(false)
            }
            Mutation::Delete { kind, id } => {
                let response = self.remote.delete(*kind, id)?;
                into_result(response)?;
                self.confirm(entry.seq, None)?;
                Ok(false)
            }
        }
    }

    fn confirm(&self, seq: u64, server_record: Option<Record>) -> SyncResult<()> {
        if self.store.mark_synced(seq, server_record) {
            debug!(seq, "entry synced");
            Ok(())
        } else {
            Err(SyncError::store_rejected("mark_synced"))
        }
    }
}
