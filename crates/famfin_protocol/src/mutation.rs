//! Deferred mutations and the entries of the durable queue.

use crate::patch::RecordPatch;
use crate::provisional::is_provisional;
use crate::record::{EntityKind, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of deferred mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    /// Record was created.
    Create,
    /// Record was partially updated.
    Update,
    /// Record was deleted.
    Delete,
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MutationAction::Create => "create",
            MutationAction::Update => "update",
            MutationAction::Delete => "delete",
        })
    }
}

/// A mutation recorded while offline, replayed against the remote API later.
///
/// The variant fixes both the action and (through its payload) the entity
/// kind, so replay dispatch is an exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Mutation {
    /// Full snapshot of a record created under a provisional id.
    Create {
        /// The record as it was cached.
        record: Record,
    },
    /// Partial update of an existing record.
    Update {
        /// Target record.
        id: String,
        /// Changed fields.
        patch: RecordPatch,
    },
    /// Deletion of a record.
    Delete {
        /// Kind of the deleted record.
        kind: EntityKind,
        /// Target record.
        id: String,
    },
}

impl Mutation {
    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> MutationAction {
        match self {
            Mutation::Create { .. } => MutationAction::Create,
            Mutation::Update { .. } => MutationAction::Update,
            Mutation::Delete { .. } => MutationAction::Delete,
        }
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Mutation::Create { record } => record.kind(),
            Mutation::Update { patch, .. } => patch.kind(),
            Mutation::Delete { kind, .. } => *kind,
        }
    }

    /// Returns the id of the record the mutation is about.
    #[must_use]
    pub fn target_id(&self) -> &str {
        match self {
            Mutation::Create { record } => record.id(),
            Mutation::Update { id, .. } | Mutation::Delete { id, .. } => id,
        }
    }

    /// Returns the first provisional id the remote API would have to resolve.
    ///
    /// A create's own id is excluded: it is the id being resolved.
    #[must_use]
    pub fn unresolved_reference(&self) -> Option<&str> {
        match self {
            Mutation::Create { record } => record.references().into_iter().find(|r| is_provisional(r)),
            Mutation::Update { id, patch } => std::iter::once(id.as_str())
                .chain(patch.references())
                .find(|r| is_provisional(r)),
            Mutation::Delete { id, .. } => Some(id.as_str()).filter(|r| is_provisional(r)),
        }
    }

    /// Rewrites references to a provisional id after it was resolved to `to`.
    ///
    /// Returns true if anything changed.
    pub fn rewrite_reference(&mut self, from: &str, to: &str) -> bool {
        match self {
            Mutation::Create { record } => record.rewrite_reference(from, to),
            Mutation::Update { id, patch } => {
                let mut changed = patch.rewrite_reference(from, to);
                if id == from {
                    *id = to.to_string();
                    changed = true;
                }
                changed
            }
            Mutation::Delete { id, .. } => {
                if id == from {
                    *id = to.to_string();
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// One deferred mutation in the durable queue.
///
/// # Invariants
///
/// - `seq` is unique and assigned in recording order
/// - Entries are replayed in ascending `seq`
/// - An entry is purged only after `synced` became true
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Local sequence number (primary ordering key).
    pub seq: u64,
    /// The deferred mutation.
    pub mutation: Mutation,
    /// Provisional id the mutation was originally recorded against.
    pub original_id: Option<String>,
    /// When the mutation was recorded.
    pub created_at: DateTime<Utc>,
    /// Whether the remote API confirmed the mutation.
    pub synced: bool,
    /// Record echoed by the remote API on success.
    pub server_record: Option<Record>,
    /// Failed replay attempts so far.
    pub attempts: u32,
    /// Cause of the last failed attempt.
    pub last_error: Option<String>,
    /// Excluded from replay after exhausting its attempts.
    pub parked: bool,
}

impl QueueEntry {
    /// Creates a fresh, unsynced entry.
    #[must_use]
    pub fn new(
        seq: u64,
        mutation: Mutation,
        original_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            seq,
            mutation,
            original_id,
            created_at,
            synced: false,
            server_record: None,
            attempts: 0,
            last_error: None,
            parked: false,
        }
    }

    /// Returns true if the entry still waits for a replay pass.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.synced && !self.parked
    }
}
