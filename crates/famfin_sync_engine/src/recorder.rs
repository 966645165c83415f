//! Records mutations made while offline.

use crate::error::{SyncError, SyncResult};
use chrono::Utc;
use famfin_protocol::{
    is_provisional, EntityKind, Mutation, ProvisionalIdGenerator, RecordDraft, RecordPatch,
};
use famfin_store::{LocalChange, LocalStore};
use std::sync::Arc;
use tracing::{debug, error};

/// Applies offline intents to the cache and queues them for replay.
///
/// Each intent is one atomic store write: the cache change and its queue
/// entry land together or not at all.
pub struct OfflineRecorder {
    store: Arc<LocalStore>,
    ids: ProvisionalIdGenerator,
}

impl OfflineRecorder {
    /// Creates a recorder writing to `store`.
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            ids: ProvisionalIdGenerator::new(),
        }
    }

    /// Creates a record under a fresh provisional id and returns the id.
    ///
    /// # Errors
    ///
    /// [`SyncError::ProvisionalIdCollision`] if the id is already cached,
    /// [`SyncError::Storage`] if the write failed.
    pub fn record_create(
        &self,
        family_id: &str,
        user_id: &str,
        draft: RecordDraft,
    ) -> SyncResult<String> {
        let id = self.ids.next_id();
        if self.store.contains_id(&id) {
            error!(%id, "generated provisional id already exists");
            return Err(SyncError::ProvisionalIdCollision { id });
        }

        let record = draft.into_record(id.clone(), family_id, user_id, Utc::now());
        let kind = record.kind();
        let seq = self.store.stage_offline(
            LocalChange::Put(record.clone()),
            Mutation::Create { record },
            Some(id.clone()),
        )?;
        debug!(%kind, %id, seq, "offline create recorded");
        Ok(id)
    }

    /// Patches a cached record and queues the update. Returns the entry seq.
    ///
    /// The entry is queued even if the record is not cached.
    pub fn record_update(&self, id: &str, patch: RecordPatch) -> SyncResult<u64> {
        let kind = patch.kind();
        let seq = self.store.stage_offline(
            LocalChange::Patch {
                id: id.to_string(),
                patch: patch.clone(),
                now: Utc::now(),
            },
            Mutation::Update {
                id: id.to_string(),
                patch,
            },
            provisional_origin(id),
        )?;
        debug!(%kind, id, seq, "offline update recorded");
        Ok(seq)
    }

    /// Removes a cached record and queues the deletion. Returns the entry seq.
    pub fn record_delete(&self, kind: EntityKind, id: &str) -> SyncResult<u64> {
        let seq = self.store.stage_offline(
            LocalChange::Delete {
                kind,
                id: id.to_string(),
            },
            Mutation::Delete {
                kind,
                id: id.to_string(),
            },
            provisional_origin(id),
        )?;
        debug!(%kind, id, seq, "offline delete recorded");
        Ok(seq)
    }
}

fn provisional_origin(id: &str) -> Option<String> {
    is_provisional(id).then(|| id.to_string())
}
