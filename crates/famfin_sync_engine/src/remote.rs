//! Remote data API abstraction.

use crate::error::{SyncError, SyncResult};
use chrono::Utc;
use famfin_protocol::{
    is_provisional, ApiResponse, EntityKind, ListFilter, Record, RecordDraft, RecordPatch,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The hosted backend's data API.
///
/// `Err` means a transport fault (no structured answer). `Ok` with a present
/// `error` field is a structured rejection. Both count as failures when a
/// queue entry is replayed.
pub trait RemoteApi: Send + Sync {
    /// Creates a record from a draft; the response carries the server record.
    fn create(
        &self,
        family_id: &str,
        user_id: &str,
        draft: &RecordDraft,
    ) -> SyncResult<ApiResponse<Record>>;

    /// Applies a partial update; the response carries the updated record.
    fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &RecordPatch,
    ) -> SyncResult<ApiResponse<Record>>;

    /// Deletes a record.
    fn delete(&self, kind: EntityKind, id: &str) -> SyncResult<ApiResponse<()>>;

    /// Lists a family's records of one kind.
    fn list(
        &self,
        kind: EntityKind,
        family_id: &str,
        filter: &ListFilter,
    ) -> SyncResult<ApiResponse<Vec<Record>>>;
}

/// Converts a structured response into a result.
pub(crate) fn into_result<T>(response: ApiResponse<T>) -> SyncResult<Option<T>> {
    match response.error {
        Some(message) => Err(SyncError::Remote {
            status: response.status,
            message,
        }),
        None => Ok(response.data),
    }
}

/// One call received by [`InMemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    /// `create`, `update`, `delete` or `list`.
    pub method: &'static str,
    /// Entity kind.
    pub kind: EntityKind,
    /// Target id (`None` for create and list).
    pub id: Option<String>,
}

/// An in-process backend issuing `srv_<n>` ids.
///
/// Supports failure injection: unreachable mode, transport faults for the
/// next N calls, per-kind structured rejections and id-less create answers.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    tables: Mutex<BTreeMap<EntityKind, BTreeMap<String, Record>>>,
    next_id: AtomicU64,
    unreachable: AtomicBool,
    omit_ids: AtomicBool,
    transport_faults: AtomicU64,
    rejections: Mutex<BTreeMap<EntityKind, (u16, String)>>,
    calls: Mutex<VecDeque<RemoteCall>>,
}

impl InMemoryRemote {
    /// Creates an empty remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record as if it existed on the server.
    pub fn insert(&self, record: Record) {
        self.tables
            .lock()
            .entry(record.kind())
            .or_default()
            .insert(record.id().to_string(), record);
    }

    /// Returns a stored record.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.tables.lock().get(&kind).and_then(|t| t.get(id)).cloned()
    }

    /// Returns every stored record of a kind.
    pub fn records(&self, kind: EntityKind) -> Vec<Record> {
        self.tables
            .lock()
            .get(&kind)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Makes every call fail with a retryable transport error.
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Fails the next `count` calls with a transport error.
    pub fn fail_next_calls(&self, count: u64) {
        self.transport_faults.store(count, Ordering::SeqCst);
    }

    /// Rejects every call for `kind` with a structured error.
    pub fn reject(&self, kind: EntityKind, status: u16, message: impl Into<String>) {
        self.rejections.lock().insert(kind, (status, message.into()));
    }

    /// Removes all structured rejections.
    pub fn clear_rejections(&self) {
        self.rejections.lock().clear();
    }

    /// Makes create answers carry an empty id.
    pub fn omit_created_ids(&self, omit: bool) {
        self.omit_ids.store(omit, Ordering::SeqCst);
    }

    /// Returns the calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().iter().cloned().collect()
    }

    /// Returns the calls of one method.
    pub fn calls_of(&self, method: &str) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn admit<T>(
        &self,
        method: &'static str,
        kind: EntityKind,
        id: Option<&str>,
    ) -> SyncResult<Option<ApiResponse<T>>> {
        self.calls.lock().push_back(RemoteCall {
            method,
            kind,
            id: id.map(str::to_string),
        });

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable("network unreachable"));
        }
        let faulted = self
            .transport_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if faulted {
            return Err(SyncError::transport_retryable("connection reset"));
        }
        if let Some((status, message)) = self.rejections.lock().get(&kind) {
            return Ok(Some(ApiResponse::error(*status, message.clone())));
        }
        Ok(None)
    }

    fn issue_id(&self) -> String {
        format!("srv_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl RemoteApi for InMemoryRemote {
    fn create(
        &self,
        family_id: &str,
        user_id: &str,
        draft: &RecordDraft,
    ) -> SyncResult<ApiResponse<Record>> {
        if let Some(rejection) = self.admit("create", draft.kind(), None)? {
            return Ok(rejection);
        }

        let record = draft
            .clone()
            .into_record(self.issue_id(), family_id, user_id, Utc::now());
        if let Some(reference) = record.references().into_iter().find(|r| is_provisional(r)) {
            return Ok(ApiResponse::error(
                400,
                format!("foreign key violation: {reference}"),
            ));
        }
        self.insert(record.clone());

        if self.omit_ids.load(Ordering::SeqCst) {
            return Ok(ApiResponse::ok(record.with_id("")));
        }
        Ok(ApiResponse::ok(record))
    }

    fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &RecordPatch,
    ) -> SyncResult<ApiResponse<Record>> {
        if let Some(rejection) = self.admit("update", kind, Some(id))? {
            return Ok(rejection);
        }

        let mut tables = self.tables.lock();
        let Some(record) = tables.get_mut(&kind).and_then(|t| t.get_mut(id)) else {
            return Ok(ApiResponse::error(404, format!("{kind} {id} not found")));
        };
        if let Err(e) = patch.apply(record, Utc::now()) {
            return Ok(ApiResponse::error(400, e.to_string()));
        }
        Ok(ApiResponse::ok(record.clone()))
    }

    fn delete(&self, kind: EntityKind, id: &str) -> SyncResult<ApiResponse<()>> {
        if let Some(rejection) = self.admit("delete", kind, Some(id))? {
            return Ok(rejection);
        }

        if let Some(table) = self.tables.lock().get_mut(&kind) {
            table.remove(id);
        }
        Ok(ApiResponse::empty())
    }

    fn list(
        &self,
        kind: EntityKind,
        family_id: &str,
        filter: &ListFilter,
    ) -> SyncResult<ApiResponse<Vec<Record>>> {
        if let Some(rejection) = self.admit("list", kind, None)? {
            return Ok(rejection);
        }

        let mut records: Vec<Record> = self
            .records(kind)
            .into_iter()
            .filter(|r| r.family_id() == family_id && filter.matches(r))
            .collect();
        records.sort_by(|a, b| match (a, b) {
            (Record::Transaction(a), Record::Transaction(b)) => b
                .date
                .cmp(&a.date)
                .then(b.created_at.cmp(&a.created_at)),
            _ => a.id().cmp(b.id()),
        });
        Ok(ApiResponse::ok(records))
    }
}
