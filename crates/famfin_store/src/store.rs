//! The local durable store.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::frame::Frame;
use crate::journal::Journal;
use crate::op::StoreOp;
use crate::state::StoreState;
use chrono::{DateTime, Utc};
use famfin_protocol::{EntityKind, Mutation, QueueEntry, Record, RecordPatch};
use famfin_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::RwLock;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// A cache change staged together with a queue entry.
#[derive(Debug, Clone)]
pub enum LocalChange {
    /// Upsert a record.
    Put(Record),
    /// Read-modify-write a cached record; skipped if it is not cached.
    Patch {
        /// Target record.
        id: String,
        /// Changed fields.
        patch: RecordPatch,
        /// Modification time stamped on the record.
        now: DateTime<Utc>,
    },
    /// Remove a record.
    Delete {
        /// Table.
        kind: EntityKind,
        /// Record id.
        id: String,
    },
}

/// Journal usage against the configured quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    /// Bytes used by the journal.
    pub used: u64,
    /// Configured quota, if any.
    pub quota: Option<u64>,
}

/// Row and queue counts, as shown by maintenance tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Cached transactions.
    pub transactions: usize,
    /// Cached accounts.
    pub accounts: usize,
    /// Cached categories.
    pub categories: usize,
    /// Queue entries of any state.
    pub queued: usize,
    /// Entries waiting for a pass.
    pub pending: usize,
    /// Dead-lettered entries.
    pub parked: usize,
    /// Journal size in bytes.
    pub journal_bytes: u64,
}

struct Inner {
    journal: Journal,
    state: StoreState,
}

impl Inner {
    fn compact(&mut self) -> StoreResult<(u64, u64)> {
        let before = self.journal.size()?;
        let bytes = Frame::Snapshot(self.state.snapshot()).encode()?;
        self.journal.replace(&bytes)?;
        Ok((before, bytes.len() as u64))
    }

    fn ensure_capacity(&mut self, additional: u64, quota: Option<u64>) -> StoreResult<()> {
        let Some(quota) = quota else {
            return Ok(());
        };
        if self.journal.size()? + additional <= quota {
            return Ok(());
        }
        self.compact()?;
        let required = self.journal.size()? + additional;
        if required > quota {
            return Err(StoreError::QuotaExceeded { required, quota });
        }
        Ok(())
    }
}

/// Cached domain records plus the durable mutation queue.
///
/// Every change is one CRC-checked journal frame, applied to the in-memory
/// image only after the frame was written. Opening replays the journal.
///
/// Table and queue operations never fail from the caller's point of view:
/// storage faults are logged and reported as `false`, `None` or an empty
/// result. Only [`LocalStore::open`] and [`LocalStore::stage_offline`]
/// return errors.
pub struct LocalStore {
    inner: RwLock<Inner>,
    config: StoreConfig,
}

impl LocalStore {
    /// Opens a store over `backend`, replaying its journal.
    ///
    /// A torn or corrupt tail is truncated; the frames before it survive.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or truncated.
    pub fn open(backend: Box<dyn StorageBackend>, config: StoreConfig) -> StoreResult<Self> {
        let mut journal = Journal::new(backend, config.sync_on_write);
        let replay = journal.replay()?;

        if replay.has_torn_tail() {
            warn!(
                valid_len = replay.valid_len,
                total_len = replay.total_len,
                cause = ?replay.tail_error,
                "truncating damaged journal tail"
            );
            journal.truncate(replay.valid_len)?;
        }

        let mut state = StoreState::default();
        for frame in &replay.frames {
            state.apply_frame(frame);
        }

        info!(
            frames = replay.frames.len(),
            queued = state.queue().count(),
            next_seq = state.next_seq(),
            "local store opened"
        );

        Ok(Self {
            inner: RwLock::new(Inner { journal, state }),
            config,
        })
    }

    /// Opens an ephemeral in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(Box::new(InMemoryBackend::new()), StoreConfig::default())
    }

    /// Opens a file-backed store, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Fails with a lock error if another process holds the journal.
    pub fn open_file(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let backend = FileBackend::open_with_create_dirs(path)?;
        Self::open(Box::new(backend), config)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Builds ops against the current state, journals them as one frame and
    /// applies them. Nothing is written if `build` fails or yields no ops.
    fn commit<T>(
        &self,
        build: impl FnOnce(&StoreState) -> StoreResult<(Vec<StoreOp>, T)>,
    ) -> StoreResult<T> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let (ops, value) = build(&inner.state)?;
        if ops.is_empty() {
            return Ok(value);
        }

        let frame = Frame::Ops(ops);
        let bytes = frame.encode()?;
        inner.ensure_capacity(bytes.len() as u64, self.config.quota_bytes)?;
        inner.journal.append(&bytes)?;
        inner.state.apply_frame(&frame);

        if inner.journal.size()? > self.config.compact_threshold {
            match inner.compact() {
                Ok((before, after)) => debug!(before, after, "journal compacted"),
                Err(e) => warn!(error = %e, "journal compaction failed"),
            }
        }
        Ok(value)
    }

    fn write(&self, ops: Vec<StoreOp>) -> StoreResult<()> {
        self.commit(|_| Ok((ops, ())))
    }

    /// Upserts a record.
    pub fn put(&self, record: &Record) -> bool {
        self.bulk_put(std::slice::from_ref(record))
    }

    /// Upserts records in one frame.
    pub fn bulk_put(&self, records: &[Record]) -> bool {
        if records.is_empty() {
            return true;
        }
        absorb(
            "bulk_put",
            self.write(vec![StoreOp::Put {
                records: records.to_vec(),
            }]),
        )
        .is_some()
    }

    /// Returns a cached record.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.inner.read().state.table(kind).get(id).cloned()
    }

    /// Returns every cached record of a family, ordered by id.
    pub fn get_all_by_family(&self, kind: EntityKind, family_id: &str) -> Vec<Record> {
        self.inner.read().state.table(kind).family(family_id)
    }

    /// Removes a record; absent ids are a no-op.
    pub fn delete(&self, kind: EntityKind, id: &str) -> bool {
        absorb(
            "delete",
            self.commit(|state| {
                let ops = if state.table(kind).get(id).is_some() {
                    vec![StoreOp::Delete {
                        kind,
                        id: id.to_string(),
                    }]
                } else {
                    Vec::new()
                };
                Ok((ops, ()))
            }),
        )
        .is_some()
    }

    /// Removes every record of a family from one table.
    pub fn delete_all_by_family(&self, kind: EntityKind, family_id: &str) -> bool {
        absorb(
            "delete_all_by_family",
            self.write(vec![StoreOp::DeleteFamily {
                kind,
                family_id: family_id.to_string(),
            }]),
        )
        .is_some()
    }

    /// Replaces a cache partition with authoritative rows.
    ///
    /// Rows under provisional ids are kept so unsynced offline creates
    /// survive a refresh. Rows of another kind or family are rejected.
    pub fn replace_partition(&self, kind: EntityKind, family_id: &str, records: Vec<Record>) -> bool {
        let result = records
            .iter()
            .find(|r| r.kind() != kind || r.family_id() != family_id)
            .map_or(Ok(()), |stray| {
                Err(StoreError::ForeignRecord {
                    id: stray.id().to_string(),
                    kind,
                    family_id: family_id.to_string(),
                })
            })
            .and_then(|()| {
                self.write(vec![StoreOp::ReplacePartition {
                    kind,
                    family_id: family_id.to_string(),
                    records,
                }])
            });
        absorb("replace_partition", result).is_some()
    }

    /// Removes all cached records of a family from every table.
    pub fn clear_family(&self, family_id: &str) -> bool {
        let ops = EntityKind::ALL
            .into_iter()
            .map(|kind| StoreOp::DeleteFamily {
                kind,
                family_id: family_id.to_string(),
            })
            .collect();
        absorb("clear_family", self.write(ops)).is_some()
    }

    /// Removes every table row and queue entry.
    pub fn clear(&self) -> bool {
        absorb("clear", self.write(vec![StoreOp::ClearAll])).is_some()
    }

    /// Applies a patch to a cached record and stamps `updated_at`.
    ///
    /// Returns false if the record is not cached or the write failed.
    pub fn patch(&self, id: &str, patch: &RecordPatch, now: DateTime<Utc>) -> bool {
        absorb(
            "patch",
            self.commit(|state| {
                let Some(mut record) = state.table(patch.kind()).get(id).cloned() else {
                    return Err(StoreError::NotFound { id: id.to_string() });
                };
                patch.apply(&mut record, now)?;
                Ok((vec![StoreOp::Put { records: vec![record] }], ()))
            }),
        )
        .is_some()
    }

    /// Returns true if any table caches a record with this id.
    pub fn contains_id(&self, id: &str) -> bool {
        self.inner.read().state.contains_id(id)
    }

    /// Returns every family with cached rows.
    pub fn families(&self) -> Vec<String> {
        self.inner.read().state.families().into_iter().collect()
    }

    /// Appends a queue entry and returns its seq.
    pub fn enqueue(&self, mutation: Mutation, original_id: Option<String>) -> Option<u64> {
        absorb("enqueue", self.stage(None, mutation, original_id))
    }

    /// Writes a cache change and its queue entry as one frame.
    ///
    /// # Errors
    ///
    /// Unlike the other operations this one reports failures: an offline
    /// change that was not recorded must not look recorded.
    pub fn stage_offline(
        &self,
        change: LocalChange,
        mutation: Mutation,
        original_id: Option<String>,
    ) -> StoreResult<u64> {
        self.stage(Some(change), mutation, original_id)
    }

    fn stage(
        &self,
        change: Option<LocalChange>,
        mutation: Mutation,
        original_id: Option<String>,
    ) -> StoreResult<u64> {
        self.commit(|state| {
            let mut ops = Vec::with_capacity(2);
            match change {
                Some(LocalChange::Put(record)) => ops.push(StoreOp::Put {
                    records: vec![record],
                }),
                Some(LocalChange::Patch { id, patch, now }) => {
                    if let Some(mut record) = state.table(patch.kind()).get(&id).cloned() {
                        patch.apply(&mut record, now)?;
                        ops.push(StoreOp::Put {
                            records: vec![record],
                        });
                    }
                }
                Some(LocalChange::Delete { kind, id }) => ops.push(StoreOp::Delete { kind, id }),
                None => {}
            }

            let seq = state.next_seq();
            ops.push(StoreOp::Enqueue {
                entry: QueueEntry::new(seq, mutation, original_id, Utc::now()),
            });
            Ok((ops, seq))
        })
    }

    /// Returns a queue entry by seq.
    pub fn queue_entry(&self, seq: u64) -> Option<QueueEntry> {
        self.inner.read().state.entry(seq).cloned()
    }

    /// Returns unsynced, unparked entries in ascending seq.
    pub fn list_unsynced(&self) -> Vec<QueueEntry> {
        self.collect_queue(QueueEntry::is_pending)
    }

    /// Returns parked entries in ascending seq.
    pub fn list_parked(&self) -> Vec<QueueEntry> {
        self.collect_queue(|e| e.parked && !e.synced)
    }

    /// Returns every entry in ascending seq.
    pub fn list_queue(&self) -> Vec<QueueEntry> {
        self.collect_queue(|_| true)
    }

    fn collect_queue(&self, keep: impl Fn(&QueueEntry) -> bool) -> Vec<QueueEntry> {
        self.inner
            .read()
            .state
            .queue()
            .filter(|e| keep(e))
            .cloned()
            .collect()
    }

    /// Returns the number of entries waiting for a pass.
    pub fn pending_count(&self) -> usize {
        self.inner.read().state.queue().filter(|e| e.is_pending()).count()
    }

    /// Marks an entry as confirmed by the remote.
    pub fn mark_synced(&self, seq: u64, server_record: Option<Record>) -> bool {
        absorb(
            "mark_synced",
            self.commit(|state| {
                if state.entry(seq).is_none() {
                    return Err(StoreError::NotFound {
                        id: format!("queue entry {seq}"),
                    });
                }
                Ok((vec![StoreOp::MarkSynced { seq, server_record }], ()))
            }),
        )
        .is_some()
    }

    /// Confirms a replayed create and moves its provisional record to the
    /// server id, in one journal frame.
    ///
    /// Either both land or neither does, so a confirmed create never leaves
    /// its provisional id behind.
    pub fn confirm_create(&self, seq: u64, server_record: Record, provisional_id: &str) -> bool {
        absorb(
            "confirm_create",
            self.commit(|state| {
                if state.entry(seq).is_none() {
                    return Err(StoreError::NotFound {
                        id: format!("queue entry {seq}"),
                    });
                }
                let remap = StoreOp::Remap {
                    kind: server_record.kind(),
                    from: provisional_id.to_string(),
                    to: server_record.id().to_string(),
                };
                let confirm = StoreOp::MarkSynced {
                    seq,
                    server_record: Some(server_record),
                };
                Ok((vec![confirm, remap], ()))
            }),
        )
        .is_some()
    }

    /// Counts a failed attempt against an entry, optionally parking it.
    pub fn record_failure(&self, seq: u64, error: &str, park: bool) -> bool {
        absorb(
            "record_failure",
            self.commit(|state| {
                let ops = if state.entry(seq).is_some() {
                    vec![StoreOp::RecordFailure {
                        seq,
                        error: error.to_string(),
                        park,
                    }]
                } else {
                    Vec::new()
                };
                Ok((ops, ()))
            }),
        )
        .is_some()
    }

    /// Returns parked entries to the pending set. Returns how many moved.
    pub fn requeue_parked(&self) -> usize {
        self.commit_counted("requeue_parked", |e| e.parked && !e.synced, StoreOp::RequeueParked)
    }

    /// Drops synced entries. Returns how many were dropped.
    pub fn purge_synced(&self) -> usize {
        self.commit_counted("purge_synced", |e| e.synced, StoreOp::PurgeSynced)
    }

    fn commit_counted(
        &self,
        operation: &str,
        affected: impl Fn(&QueueEntry) -> bool,
        op: StoreOp,
    ) -> usize {
        absorb(
            operation,
            self.commit(|state| {
                let count = state.queue().filter(|e| affected(e)).count();
                let ops = if count > 0 { vec![op] } else { Vec::new() };
                Ok((ops, count))
            }),
        )
        .unwrap_or(0)
    }

    /// Moves a provisional record to its server id and rewrites every
    /// reference to it in the cache and in unsynced queue entries.
    ///
    /// The cached field values are kept; only the id changes. If the
    /// provisional record is not cached nothing is inserted, but references
    /// are still rewritten.
    pub fn remap_provisional(&self, kind: EntityKind, provisional_id: &str, server_id: &str) -> bool {
        absorb(
            "remap_provisional",
            self.write(vec![StoreOp::Remap {
                kind,
                from: provisional_id.to_string(),
                to: server_id.to_string(),
            }]),
        )
        .is_some()
    }

    /// Returns journal usage against the quota.
    pub fn storage_estimate(&self) -> StorageEstimate {
        let used = absorb("storage_estimate", self.inner.read().journal.size()).unwrap_or(0);
        StorageEstimate {
            used,
            quota: self.config.quota_bytes,
        }
    }

    /// Rewrites the journal as a single snapshot frame.
    pub fn compact(&self) -> bool {
        let result = self.inner.write().compact();
        match absorb("compact", result) {
            Some((before, after)) => {
                info!(before, after, "journal compacted");
                true
            }
            None => false,
        }
    }

    /// Returns row and queue counts.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        let state = &inner.state;
        let mut stats = StoreStats {
            transactions: state.table(EntityKind::Transaction).len(),
            accounts: state.table(EntityKind::Account).len(),
            categories: state.table(EntityKind::Category).len(),
            journal_bytes: absorb("stats", inner.journal.size()).unwrap_or(0),
            ..StoreStats::default()
        };
        for entry in state.queue() {
            stats.queued += 1;
            if entry.is_pending() {
                stats.pending += 1;
            } else if entry.parked && !entry.synced {
                stats.parked += 1;
            }
        }
        stats
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn absorb<T>(operation: &str, result: StoreResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(operation, error = %e, "local store operation failed");
            None
        }
    }
}
