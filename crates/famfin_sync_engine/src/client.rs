//! Routes finance intents online or offline.

use crate::config::SyncConfig;
use crate::connectivity::Connectivity;
use crate::engine::{SyncEngine, SyncOutcome, SyncStatus};
use crate::error::{SyncError, SyncResult};
use crate::recorder::OfflineRecorder;
use crate::refresh::{CacheRefresher, RefreshReport};
use crate::remote::{into_result, RemoteApi};
use chrono::NaiveDate;
use famfin_protocol::{
    is_provisional, DashboardStats, EntityKind, ListFilter, Record, RecordDraft, RecordPatch,
};
use famfin_store::LocalStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Records returned by [`FinanceClient::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    /// The records.
    pub records: Vec<Record>,
    /// True if they came from the cache.
    pub from_cache: bool,
    /// Remote failure that caused a cache fallback.
    pub error: Option<String>,
}

/// Result of [`FinanceClient::sync_now`].
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The queue pass.
    pub outcome: SyncOutcome,
    /// The follow-up refresh, if configured.
    pub refresh: Option<RefreshReport>,
}

/// Entry point for the UI layer.
///
/// Online, intents go straight to the remote API and the cache is written
/// through. Offline, they are recorded locally and queued.
pub struct FinanceClient<R: RemoteApi> {
    store: Arc<LocalStore>,
    remote: Arc<R>,
    connectivity: Connectivity,
    recorder: OfflineRecorder,
    engine: Arc<SyncEngine<R>>,
    refresher: CacheRefresher<R>,
}

impl<R: RemoteApi> FinanceClient<R> {
    /// Wires the recorder, engine and refresher around one store and remote.
    pub fn new(
        config: SyncConfig,
        store: Arc<LocalStore>,
        remote: Arc<R>,
        connectivity: Connectivity,
    ) -> Self {
        let engine = Arc::new(SyncEngine::new(
            config,
            Arc::clone(&store),
            Arc::clone(&remote),
            connectivity.clone(),
        ));
        Self {
            recorder: OfflineRecorder::new(Arc::clone(&store)),
            refresher: CacheRefresher::new(
                Arc::clone(&store),
                Arc::clone(&remote),
                connectivity.clone(),
            ),
            store,
            remote,
            connectivity,
            engine,
        }
    }

    /// Returns the engine, e.g. to hand it to a monitor.
    pub fn engine(&self) -> &Arc<SyncEngine<R>> {
        &self.engine
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Returns true if intents currently go to the remote.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Creates a record and returns it as stored.
    ///
    /// Offline the record gets a provisional id.
    pub fn create(&self, family_id: &str, user_id: &str, draft: RecordDraft) -> SyncResult<Record> {
        if !self.is_online() {
            let kind = draft.kind();
            let id = self.recorder.record_create(family_id, user_id, draft)?;
            return self
                .store
                .get(kind, &id)
                .ok_or_else(|| SyncError::store_rejected("create"));
        }

        let kind = draft.kind();
        let response = self.remote.create(family_id, user_id, &draft)?;
        let record = into_result(response)?
            .filter(|r| !r.id().is_empty() && !is_provisional(r.id()))
            .ok_or(SyncError::MissingServerId { kind })?;
        self.store.put(&record);
        Ok(record)
    }

    /// Updates a record and returns it as stored, if known.
    pub fn update(&self, id: &str, patch: RecordPatch) -> SyncResult<Option<Record>> {
        let kind = patch.kind();
        if !self.is_online() {
            self.recorder.record_update(id, patch)?;
            return Ok(self.store.get(kind, id));
        }

        let response = self.remote.update(kind, id, &patch)?;
        let updated = into_result(response)?;
        if let Some(record) = &updated {
            self.store.put(record);
        }
        Ok(updated)
    }

    /// Deletes a record.
    pub fn delete(&self, kind: EntityKind, id: &str) -> SyncResult<()> {
        if !self.is_online() {
            self.recorder.record_delete(kind, id)?;
            return Ok(());
        }

        let response = self.remote.delete(kind, id)?;
        into_result(response)?;
        self.store.delete(kind, id);
        Ok(())
    }

    /// Loads a family's records of one kind.
    ///
    /// Online, an unfiltered result replaces the cache partition; any remote
    /// failure falls back to the cache. Offline, the cache is read.
    pub fn load(&self, kind: EntityKind, family_id: &str, filter: &ListFilter) -> Loaded {
        if !self.is_online() {
            return self.from_cache(kind, family_id, filter, None);
        }

        let result = self
            .remote
            .list(kind, family_id, filter)
            .and_then(into_result);
        match result {
            Ok(records) => {
                let records = records.unwrap_or_default();
                if filter.is_empty() {
                    self.store
                        .replace_partition(kind, family_id, records.clone());
                }
                Loaded {
                    records,
                    from_cache: false,
                    error: None,
                }
            }
            Err(e) => {
                warn!(%kind, family_id, error = %e, "remote load failed; using cache");
                self.from_cache(kind, family_id, filter, Some(e.to_string()))
            }
        }
    }

    fn from_cache(
        &self,
        kind: EntityKind,
        family_id: &str,
        filter: &ListFilter,
        error: Option<String>,
    ) -> Loaded {
        let records = self
            .store
            .get_all_by_family(kind, family_id)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        Loaded {
            records,
            from_cache: true,
            error,
        }
    }

    /// Computes dashboard figures for the month of `today` from the cache.
    pub fn dashboard_stats(&self, family_id: &str, today: NaiveDate) -> DashboardStats {
        let mut records = self
            .store
            .get_all_by_family(EntityKind::Transaction, family_id);
        records.extend(self.store.get_all_by_family(EntityKind::Account, family_id));
        DashboardStats::from_records(&records, today)
    }

    /// Runs a pass now and, if configured, refreshes the family afterwards.
    ///
    /// # Errors
    ///
    /// [`SyncError::Offline`] while offline; refresh transport faults.
    pub fn sync_now(&self, family_id: &str) -> SyncResult<SyncReport> {
        let outcome = self.engine.force_sync_now()?;
        let refresh = if self.engine.config().refresh_after_sync {
            Some(self.refresher.refresh(family_id)?)
        } else {
            None
        };
        Ok(SyncReport { outcome, refresh })
    }

    /// Downloads the family's records into the cache.
    pub fn download_and_cache(&self, family_id: &str) -> SyncResult<RefreshReport> {
        self.refresher.refresh(family_id)
    }

    /// Returns the sync status.
    pub fn status(&self) -> SyncStatus {
        self.engine.status()
    }

    /// Drops cached data of one family, or everything including the queue.
    pub fn clear_offline_data(&self, family_id: Option<&str>) -> bool {
        debug!(?family_id, "clearing offline data");
        match family_id {
            Some(family_id) => self.store.clear_family(family_id),
            None => self.store.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemote;
    use famfin_protocol::{AccountPatch, TransactionType};
    use famfin_testkit::fixtures;

    fn client(online: bool) -> (FinanceClient<InMemoryRemote>, Arc<InMemoryRemote>, Connectivity) {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let remote = Arc::new(InMemoryRemote::new());
        let connectivity = Connectivity::new(online);
        let client = FinanceClient::new(
            SyncConfig::default(),
            store,
            Arc::clone(&remote),
            connectivity.clone(),
        );
        (client, remote, connectivity)
    }

    #[test]
    fn online_create_goes_to_remote_and_cache() {
        let (client, remote, _) = client(true);
        let record = client
            .create("F1", "u1", fixtures::account_draft("Cash"))
            .unwrap();
        assert_eq!(record.id(), "srv_1");
        assert!(remote.get(EntityKind::Account, "srv_1").is_some());
        assert!(client.store().get(EntityKind::Account, "srv_1").is_some());
        assert_eq!(client.status().pending_items, 0);
    }

    #[test]
    fn online_create_without_server_id_is_not_cached() {
        let (client, remote, _) = client(true);
        remote.omit_created_ids(true);
        let err = client
            .create("F1", "u1", fixtures::account_draft("Cash"))
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::MissingServerId {
                kind: EntityKind::Account
            }
        ));
        assert!(client.store().get(EntityKind::Account, "").is_none());
        assert_eq!(client.store().stats().accounts, 0);
    }

    #[test]
    fn online_structured_error_surfaces() {
        let (client, remote, _) = client(true);
        remote.reject(EntityKind::Account, 403, "denied");
        let err = client
            .create("F1", "u1", fixtures::account_draft("Cash"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote { status: 403, .. }));
    }

    #[test]
    fn offline_intents_are_queued() {
        let (client, remote, _) = client(false);
        let record = client
            .create("F1", "u1", fixtures::account_draft("Cash"))
            .unwrap();
        assert!(is_provisional(record.id()));

        let updated = client
            .update(
                record.id(),
                RecordPatch::Account(AccountPatch {
                    balance: Some(50),
                    ..Default::default()
                }),
            )
            .unwrap()
            .unwrap();
        match updated {
            Record::Account(a) => assert_eq!(a.balance, 50),
            other => panic!("unexpected record {other:?}"),
        }
        client.delete(EntityKind::Category, "C1").unwrap();

        assert_eq!(client.status().pending_items, 3);
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn load_caches_unfiltered_results_only() {
        let (client, remote, _) = client(true);
        remote.insert(fixtures::transaction("T1", "F1"));
        remote.insert(fixtures::transaction_with(
            "T2",
            "F1",
            "A1",
            "C1",
            TransactionType::Income,
            10,
            fixtures::fixed_date(),
        ));

        let filter = ListFilter {
            transaction_type: Some(TransactionType::Income),
            ..Default::default()
        };
        let loaded = client.load(EntityKind::Transaction, "F1", &filter);
        assert_eq!(loaded.records.len(), 1);
        assert!(!loaded.from_cache);
        assert!(client
            .store()
            .get_all_by_family(EntityKind::Transaction, "F1")
            .is_empty());

        let loaded = client.load(EntityKind::Transaction, "F1", &ListFilter::default());
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(
            client
                .store()
                .get_all_by_family(EntityKind::Transaction, "F1")
                .len(),
            2
        );
    }

    #[test]
    fn load_falls_back_to_cache() {
        let (client, remote, connectivity) = client(true);
        client.store().put(&fixtures::account("A1", "F1"));
        remote.set_reachable(false);

        let loaded = client.load(EntityKind::Account, "F1", &ListFilter::default());
        assert!(loaded.from_cache);
        assert_eq!(loaded.records.len(), 1);
        assert!(loaded.error.is_some());

        connectivity.set_online(false);
        let loaded = client.load(EntityKind::Account, "F1", &ListFilter::default());
        assert!(loaded.from_cache);
        assert!(loaded.error.is_none());
    }

    #[test]
    fn dashboard_from_cache() {
        let (client, _, _) = client(false);
        let date = fixtures::fixed_date();
        client.store().bulk_put(&[
            fixtures::transaction_with("T1", "F1", "A1", "C1", TransactionType::Income, 5000, date),
            fixtures::transaction_with("T2", "F1", "A1", "C1", TransactionType::Expense, 1200, date),
            fixtures::account_with_balance("A1", "F1", 10_000),
            fixtures::account_with_balance("A2", "F1", 2_500),
        ]);

        let stats = client.dashboard_stats("F1", date);
        assert_eq!(stats.total_income, 5000);
        assert_eq!(stats.total_expense, 1200);
        assert_eq!(stats.total_balance, 12_500);
        assert_eq!(stats.recent_transactions.len(), 2);
    }

    #[test]
    fn sync_now_offline_is_refused() {
        let (client, _, _) = client(false);
        assert!(matches!(client.sync_now("F1"), Err(SyncError::Offline)));
    }

    #[test]
    fn clear_offline_data() {
        let (client, _, _) = client(false);
        client
            .create("F1", "u1", fixtures::account_draft("Cash"))
            .unwrap();
        client.store().put(&fixtures::account("A9", "F2"));

        assert!(client.clear_offline_data(Some("F1")));
        assert!(client.store().get_all_by_family(EntityKind::Account, "F1").is_empty());
        assert_eq!(client.status().pending_items, 1);

        assert!(client.clear_offline_data(None));
        assert_eq!(client.status().pending_items, 0);
        assert!(client.store().families().is_empty());
    }
}
