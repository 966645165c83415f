//! Downloads authoritative records into the cache.

use crate::connectivity::Connectivity;
use crate::error::SyncResult;
use crate::remote::{into_result, RemoteApi};
use famfin_protocol::{EntityKind, ListFilter, Record};
use famfin_store::LocalStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a refresh did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// True if the refresh did nothing because the device is offline.
    pub skipped: bool,
    /// Partitions replaced, with their new row counts.
    pub refreshed: Vec<(EntityKind, usize)>,
    /// Per-kind failures.
    pub errors: Vec<String>,
}

impl RefreshReport {
    /// Report of a refresh that did not run.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Returns true if every partition was refreshed.
    pub fn is_complete(&self) -> bool {
        !self.skipped && self.errors.is_empty()
    }
}

/// Replaces a family's cache partitions with the remote's rows.
///
/// The queue is never touched. Rows under provisional ids stay cached until
/// their create is replayed.
pub struct CacheRefresher<R: RemoteApi> {
    store: Arc<LocalStore>,
    remote: Arc<R>,
    connectivity: Connectivity,
}

impl<R: RemoteApi> CacheRefresher<R> {
    /// Creates a refresher.
    pub fn new(store: Arc<LocalStore>, remote: Arc<R>, connectivity: Connectivity) -> Self {
        Self {
            store,
            remote,
            connectivity,
        }
    }

    /// Refreshes transactions, accounts and categories of `family_id`.
    ///
    /// All three lists are fetched before anything is written.
    ///
    /// # Errors
    ///
    /// A transport fault aborts the refresh with nothing written.
    /// Structured errors are reported per kind in the returned report.
    pub fn refresh(&self, family_id: &str) -> SyncResult<RefreshReport> {
        if !self.connectivity.is_online() {
            debug!(family_id, "offline; refresh skipped");
            return Ok(RefreshReport::skipped());
        }

        let mut fetched: Vec<(EntityKind, SyncResult<Option<Vec<Record>>>)> = Vec::new();
        for kind in EntityKind::ALL {
            let response = self.remote.list(kind, family_id, &ListFilter::default())?;
            fetched.push((kind, into_result(response)));
        }

        let mut report = RefreshReport::default();
        for (kind, result) in fetched {
            match result {
                Ok(Some(records)) => {
                    let count = records.len();
                    if self.store.replace_partition(kind, family_id, records) {
                        report.refreshed.push((kind, count));
                    } else {
                        report
                            .errors
                            .push(format!("failed to cache {kind} partition"));
                    }
                }
                Ok(None) => debug!(%kind, family_id, "remote returned no rows"),
                Err(e) => {
                    warn!(%kind, family_id, error = %e, "refresh of partition failed");
                    report.errors.push(format!("failed to refresh {kind}: {e}"));
                }
            }
        }

        info!(
            family_id,
            refreshed = report.refreshed.len(),
            failed = report.errors.len(),
            "cache refreshed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemote;
    use famfin_testkit::fixtures;

    fn setup(online: bool) -> (CacheRefresher<InMemoryRemote>, Arc<LocalStore>, Arc<InMemoryRemote>) {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let remote = Arc::new(InMemoryRemote::new());
        let refresher = CacheRefresher::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            Connectivity::new(online),
        );
        (refresher, store, remote)
    }

    #[test]
    fn offline_refresh_is_skipped() {
        let (refresher, store, remote) = setup(false);
        store.put(&fixtures::account("A1", "F1"));
        let report = refresher.refresh("F1").unwrap();
        assert!(report.skipped);
        assert!(remote.calls().is_empty());
        assert!(store.get(EntityKind::Account, "A1").is_some());
    }

    #[test]
    fn refresh_replaces_partitions() {
        let (refresher, store, remote) = setup(true);
        store.put(&fixtures::account("A_stale", "F1"));
        store.put(&fixtures::account("offline_1_aaaaaaaaa", "F1"));
        remote.insert(fixtures::account("A1", "F1"));
        remote.insert(fixtures::transaction("T1", "F1"));

        let report = refresher.refresh("F1").unwrap();
        assert!(report.is_complete());
        assert_eq!(report.refreshed.len(), 3);

        assert!(store.get(EntityKind::Account, "A_stale").is_none());
        assert!(store.get(EntityKind::Account, "A1").is_some());
        assert!(store.get(EntityKind::Account, "offline_1_aaaaaaaaa").is_some());
        assert!(store.get(EntityKind::Transaction, "T1").is_some());
    }

    #[test]
    fn structured_error_is_reported_per_kind() {
        let (refresher, store, remote) = setup(true);
        store.put(&fixtures::category("C_old", "F1"));
        remote.insert(fixtures::account("A1", "F1"));
        remote.reject(EntityKind::Category, 500, "timeout");

        let report = refresher.refresh("F1").unwrap();
        assert_eq!(report.errors, vec!["failed to refresh category: remote error (500): timeout"]);
        assert!(store.get(EntityKind::Category, "C_old").is_some());
        assert!(store.get(EntityKind::Account, "A1").is_some());
    }

    /// Lists of the last kind fail at the transport level.
    struct LastListFails(InMemoryRemote);

    impl RemoteApi for LastListFails {
        fn create(
            &self,
            family_id: &str,
            user_id: &str,
            draft: &famfin_protocol::RecordDraft,
        ) -> SyncResult<famfin_protocol::ApiResponse<Record>> {
            self.0.create(family_id, user_id, draft)
        }

        fn update(
            &self,
            kind: EntityKind,
            id: &str,
            patch: &famfin_protocol::RecordPatch,
        ) -> SyncResult<famfin_protocol::ApiResponse<Record>> {
            self.0.update(kind, id, patch)
        }

        fn delete(&self, kind: EntityKind, id: &str) -> SyncResult<famfin_protocol::ApiResponse<()>> {
            self.0.delete(kind, id)
        }

        fn list(
            &self,
            kind: EntityKind,
            family_id: &str,
            filter: &ListFilter,
        ) -> SyncResult<famfin_protocol::ApiResponse<Vec<Record>>> {
            if kind == EntityKind::Category {
                return Err(crate::error::SyncError::transport_retryable("connection reset"));
            }
            self.0.list(kind, family_id, filter)
        }
    }

    #[test]
    fn transport_fault_writes_nothing() {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let remote = LastListFails(InMemoryRemote::new());
        remote.0.insert(fixtures::transaction("T1", "F1"));
        store.put(&fixtures::account("A_old", "F1"));
        let refresher = CacheRefresher::new(Arc::clone(&store), Arc::new(remote), Connectivity::new(true));

        assert!(refresher.refresh("F1").is_err());
        assert!(store.get(EntityKind::Account, "A_old").is_some());
        assert!(store.get(EntityKind::Transaction, "T1").is_none());
    }

    #[test]
    fn queue_is_untouched() {
        let (refresher, store, _) = setup(true);
        store.enqueue(
            famfin_protocol::Mutation::Delete {
                kind: EntityKind::Account,
                id: "A1".into(),
            },
            None,
        );
        refresher.refresh("F1").unwrap();
        assert_eq!(store.pending_count(), 1);
    }
}
