//! Journal operations.
//!
//! Every change to the store is described by a [`StoreOp`]. A journal frame
//! carries one batch of ops that is applied all-or-nothing, which is how a
//! cache write and its queue entry land together.

use famfin_protocol::{EntityKind, QueueEntry, Record};
use serde::{Deserialize, Serialize};

/// One replayable change to tables or queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreOp {
    /// Upserts records by id.
    Put {
        /// Records to write.
        records: Vec<Record>,
    },
    /// Removes one record.
    Delete {
        /// Table.
        kind: EntityKind,
        /// Record id.
        id: String,
    },
    /// Removes every record of one family from a table.
    DeleteFamily {
        /// Table.
        kind: EntityKind,
        /// Family id.
        family_id: String,
    },
    /// Replaces a cache partition, keeping provisional rows.
    ReplacePartition {
        /// Table.
        kind: EntityKind,
        /// Family id.
        family_id: String,
        /// Authoritative rows.
        records: Vec<Record>,
    },
    /// Removes every table and queue entry.
    ClearAll,
    /// Appends a queue entry.
    Enqueue {
        /// Entry with its assigned seq.
        entry: QueueEntry,
    },
    /// Marks an entry as confirmed by the remote.
    MarkSynced {
        /// Entry seq.
        seq: u64,
        /// Record echoed by the remote.
        server_record: Option<Record>,
    },
    /// Records a failed replay attempt.
    RecordFailure {
        /// Entry seq.
        seq: u64,
        /// Failure description.
        error: String,
        /// Whether the entry is parked after this attempt.
        park: bool,
    },
    /// Returns parked entries to the pending set.
    RequeueParked,
    /// Drops synced entries.
    PurgeSynced,
    /// Moves a provisional record to its server id and rewrites references.
    Remap {
        /// Table of the remapped record.
        kind: EntityKind,
        /// Provisional id.
        from: String,
        /// Server id.
        to: String,
    },
}

/// Full store image written by compaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every cached record.
    pub records: Vec<Record>,
    /// Every queue entry, ascending by seq.
    pub queue: Vec<QueueEntry>,
    /// Next seq to hand out.
    pub next_seq: u64,
}
