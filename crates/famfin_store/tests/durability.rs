//! Durability tests for the local store: reopen, recovery, locking.

use famfin_protocol::{EntityKind, Mutation, RecordPatch, TransactionPatch};
use famfin_storage::{FileBackend, InMemoryBackend, StorageBackend};
use famfin_store::{LocalChange, LocalStore, StoreConfig};
use famfin_testkit::prelude::*;
use proptest::prelude::*;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn reopen_restores_tables_and_queue() {
    let store = TestStore::file();
    store.bulk_put(&[account("A1", "F1"), transaction("T1", "F1")]);
    let seq = store
        .enqueue(
            Mutation::Delete {
                kind: EntityKind::Transaction,
                id: "T1".into(),
            },
            None,
        )
        .unwrap();
    store.record_failure(seq, "remote unavailable", false);

    let store = store.reopen();
    assert_eq!(store.get_all_by_family(EntityKind::Account, "F1").len(), 1);
    assert!(store.get(EntityKind::Transaction, "T1").is_some());

    let pending = store.list_unsynced();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].seq, seq);
    assert_eq!(pending[0].attempts, 1);
    assert_eq!(pending[0].last_error.as_deref(), Some("remote unavailable"));
}

#[test]
fn seq_resumes_after_reopen() {
    let store = TestStore::file();
    let first = store
        .enqueue(
            Mutation::Delete {
                kind: EntityKind::Account,
                id: "A1".into(),
            },
            None,
        )
        .unwrap();
    store.mark_synced(first, None);
    store.purge_synced();

    let store = store.reopen();
    let second = store
        .enqueue(
            Mutation::Delete {
                kind: EntityKind::Account,
                id: "A2".into(),
            },
            None,
        )
        .unwrap();
    assert!(second > first);
}

#[test]
fn compacted_store_reopens() {
    let store = TestStore::file();
    for i in 0..10 {
        store.put(&transaction(&format!("T{i}"), "F1"));
    }
    store.delete(EntityKind::Transaction, "T0");
    assert!(store.compact());

    let store = store.reopen();
    assert_eq!(store.get_all_by_family(EntityKind::Transaction, "F1").len(), 9);
}

#[test]
fn corrupt_tail_is_truncated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("famfin.journal");

    let valid_len = {
        let store = LocalStore::open_file(&path, StoreConfig::default()).unwrap();
        store.put(&account("A1", "F1"));
        store.put(&account("A2", "F1"));
        store.storage_estimate().used
    };

    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"FFJR\x01\x00\x01garbage").unwrap();
    }

    let store = LocalStore::open_file(&path, StoreConfig::default()).unwrap();
    assert_eq!(store.get_all_by_family(EntityKind::Account, "F1").len(), 2);
    assert_eq!(store.storage_estimate().used, valid_len);

    // The store keeps working after recovery.
    assert!(store.put(&account("A3", "F1")));
}

#[test]
fn second_process_cannot_open_journal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("famfin.journal");

    let _store = LocalStore::open_file(&path, StoreConfig::default()).unwrap();
    assert!(LocalStore::open_file(&path, StoreConfig::default()).is_err());
}

#[test]
fn staged_change_and_entry_are_atomic_on_disk() {
    let store = TestStore::file();
    store.put(&transaction("T1", "F1"));
    let patch = RecordPatch::Transaction(TransactionPatch {
        amount: Some(42),
        ..Default::default()
    });
    store
        .stage_offline(
            LocalChange::Patch {
                id: "T1".into(),
                patch: patch.clone(),
                now: fixed_time(),
            },
            Mutation::Update {
                id: "T1".into(),
                patch,
            },
            None,
        )
        .unwrap();

    let store = store.reopen();
    assert_eq!(store.pending_count(), 1);
    match store.get(EntityKind::Transaction, "T1").unwrap() {
        famfin_protocol::Record::Transaction(t) => assert_eq!(t.amount, 42),
        other => panic!("unexpected record {other:?}"),
    }
}

#[test]
fn automatic_compaction_keeps_contents() {
    let backend = InMemoryBackend::new();
    let store =
        LocalStore::open(Box::new(backend), StoreConfig::new().compact_threshold(2048)).unwrap();
    for round in 0..50 {
        store.put(&transaction("T1", "F1").with_id(format!("T{}", round % 5)));
    }
    assert!(store.storage_estimate().used < 4096);
    assert_eq!(store.get_all_by_family(EntityKind::Transaction, "F1").len(), 5);
}

#[derive(Debug, Clone)]
enum Action {
    Put(famfin_protocol::Record),
    Delete(EntityKind, String),
    Replace(EntityKind, String, Vec<famfin_protocol::Record>),
    Enqueue(Mutation),
    MarkFirstSynced,
    FailFirst(bool),
    Requeue,
    Purge,
    Remap(EntityKind, String),
    Compact,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => record_strategy().prop_map(Action::Put),
        1 => (entity_kind_strategy(), record_id_strategy()).prop_map(|(k, id)| Action::Delete(k, id)),
        1 => (entity_kind_strategy(), family_id_strategy()).prop_flat_map(|(kind, family)| {
            prop::collection::vec(record_of_kind_strategy(kind, family.clone()), 0..4)
                .prop_map(move |records| {
                    let records = records
                        .into_iter()
                        .filter(|r| !famfin_protocol::is_provisional(r.id()))
                        .collect();
                    Action::Replace(kind, family.clone(), records)
                })
        }),
        3 => mutation_strategy().prop_map(Action::Enqueue),
        1 => Just(Action::MarkFirstSynced),
        1 => any::<bool>().prop_map(Action::FailFirst),
        1 => Just(Action::Requeue),
        1 => Just(Action::Purge),
        1 => (entity_kind_strategy(), server_id_strategy()).prop_map(|(k, id)| Action::Remap(k, id)),
        1 => Just(Action::Compact),
    ]
}

fn run(store: &LocalStore, action: &Action) {
    match action {
        Action::Put(record) => {
            store.put(record);
        }
        Action::Delete(kind, id) => {
            store.delete(*kind, id);
        }
        Action::Replace(kind, family, records) => {
            store.replace_partition(*kind, family, records.clone());
        }
        Action::Enqueue(mutation) => {
            store.enqueue(mutation.clone(), None);
        }
        Action::MarkFirstSynced => {
            if let Some(entry) = store.list_unsynced().first() {
                store.mark_synced(entry.seq, None);
            }
        }
        Action::FailFirst(park) => {
            if let Some(entry) = store.list_unsynced().first() {
                store.record_failure(entry.seq, "failed", *park);
            }
        }
        Action::Requeue => {
            store.requeue_parked();
        }
        Action::Purge => {
            store.purge_synced();
        }
        Action::Remap(kind, to) => {
            let from = store
                .list_unsynced()
                .iter()
                .map(|e| e.mutation.target_id().to_string())
                .find(|id| famfin_protocol::is_provisional(id));
            if let Some(from) = from {
                store.remap_provisional(*kind, &from, to);
            }
        }
        Action::Compact => {
            store.compact();
        }
    }
}

fn image(store: &LocalStore) -> (Vec<famfin_protocol::Record>, Vec<famfin_protocol::QueueEntry>) {
    let mut records = Vec::new();
    for family in store.families() {
        for kind in EntityKind::ALL {
            records.extend(store.get_all_by_family(kind, &family));
        }
    }
    (records, store.list_queue())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Replaying the journal reproduces exactly the state built by the
    /// live operations.
    #[test]
    fn replay_matches_live_state(actions in prop::collection::vec(action_strategy(), 1..40)) {
        let backend = InMemoryBackend::new();
        let store = LocalStore::open(Box::new(backend.clone()), StoreConfig::default()).unwrap();
        for action in &actions {
            run(&store, action);
        }
        let live = image(&store);
        drop(store);

        let reopened = LocalStore::open(
            Box::new(InMemoryBackend::with_data(backend.data())),
            StoreConfig::default(),
        )
        .unwrap();
        prop_assert_eq!(image(&reopened), live);
    }
}

fn delete_account(id: &str) -> Mutation {
    Mutation::Delete {
        kind: EntityKind::Account,
        id: id.into(),
    }
}

#[test]
fn acknowledged_entries_survive_a_failed_append() {
    let backend = FaultyBackend::new();
    let plan = backend.plan();
    let store = LocalStore::open(Box::new(backend.clone()), StoreConfig::default()).unwrap();

    assert!(store.enqueue(delete_account("A1"), None).is_some());
    plan.fail_appends(1, AppendFault::ShortWrite);
    assert!(store.enqueue(delete_account("A2"), None).is_none());
    assert!(store.enqueue(delete_account("A3"), None).is_some());
    assert_eq!(store.pending_count(), 2);
    drop(store);

    let reopened = LocalStore::open(
        Box::new(InMemoryBackend::with_data(backend.data())),
        StoreConfig::default(),
    )
    .unwrap();
    let targets: Vec<String> = reopened
        .list_unsynced()
        .iter()
        .map(|e| e.mutation.target_id().to_string())
        .collect();
    assert_eq!(targets, vec!["A1", "A3"]);
}

#[test]
fn failed_stage_offline_leaves_no_trace() {
    let backend = FaultyBackend::new();
    let plan = backend.plan();
    let store = LocalStore::open(Box::new(backend.clone()), StoreConfig::default()).unwrap();

    plan.fail_appends(1, AppendFault::ShortWrite);
    let result = store.stage_offline(
        LocalChange::Put(account("offline_1_abcdefghi", "F1")),
        Mutation::Create {
            record: account("offline_1_abcdefghi", "F1"),
        },
        Some("offline_1_abcdefghi".into()),
    );
    assert!(result.is_err());
    assert!(!store.contains_id("offline_1_abcdefghi"));
    assert!(backend.data().is_empty());
}

#[test]
fn file_backend_is_shareable_as_trait_object() {
    let dir = tempdir().unwrap();
    let backend: Box<dyn StorageBackend> =
        Box::new(FileBackend::open(&dir.path().join("raw.journal")).unwrap());
    let store = LocalStore::open(backend, StoreConfig::default()).unwrap();
    assert!(store.put(&category("C1", "F1")));
}
