//! Test fixtures and store helpers.
//!
//! Records built here carry fixed timestamps so assertions on audit fields
//! stay deterministic.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use famfin_protocol::{
    Account, AccountType, Category, NewAccount, NewCategory, NewTransaction, Record, RecordDraft,
    Transaction, TransactionType,
};
use famfin_storage::InMemoryBackend;
use famfin_store::{LocalStore, StoreConfig};
use std::path::PathBuf;
use tempfile::TempDir;

/// User id stamped on fixture records.
pub const TEST_USER: &str = "user-1";

/// Fixed creation time of fixture records.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0)
        .single()
        .expect("valid fixture time")
}

/// Booking date of fixture transactions.
pub fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid fixture date")
}

/// An expense of 1000 minor units against `A1` / `C1`.
pub fn transaction(id: &str, family_id: &str) -> Record {
    transaction_with(id, family_id, "A1", "C1", TransactionType::Expense, 1000, fixed_date())
}

/// A transaction with explicit references, type, amount and date.
pub fn transaction_with(
    id: &str,
    family_id: &str,
    account_id: &str,
    category_id: &str,
    transaction_type: TransactionType,
    amount: i64,
    date: NaiveDate,
) -> Record {
    Record::Transaction(Transaction {
        id: id.into(),
        family_id: family_id.into(),
        account_id: account_id.into(),
        category_id: category_id.into(),
        transaction_type,
        amount,
        description: format!("fixture {id}"),
        date,
        created_by: TEST_USER.into(),
        created_at: fixed_time(),
        updated_at: fixed_time(),
    })
}

/// A bank account with zero balance.
pub fn account(id: &str, family_id: &str) -> Record {
    account_with_balance(id, family_id, 0)
}

/// A bank account with the given balance.
pub fn account_with_balance(id: &str, family_id: &str, balance: i64) -> Record {
    Record::Account(Account {
        id: id.into(),
        family_id: family_id.into(),
        name: format!("Account {id}"),
        account_type: AccountType::Bank,
        balance,
        created_by: TEST_USER.into(),
        created_at: fixed_time(),
        updated_at: fixed_time(),
    })
}

/// An expense category.
pub fn category(id: &str, family_id: &str) -> Record {
    Record::Category(Category {
        id: id.into(),
        family_id: family_id.into(),
        name: format!("Category {id}"),
        category_type: TransactionType::Expense,
        icon: "tag".into(),
        color: "#888888".into(),
        created_by: TEST_USER.into(),
        created_at: fixed_time(),
        updated_at: fixed_time(),
    })
}

/// Draft of an expense against the given account and category.
pub fn transaction_draft(account_id: &str, category_id: &str, amount: i64) -> RecordDraft {
    RecordDraft::Transaction(NewTransaction {
        account_id: account_id.into(),
        category_id: category_id.into(),
        transaction_type: TransactionType::Expense,
        amount,
        description: Some("groceries".into()),
        date: Some(fixed_date()),
    })
}

/// Draft of a cash account.
pub fn account_draft(name: &str) -> RecordDraft {
    RecordDraft::Account(NewAccount {
        name: name.into(),
        account_type: AccountType::Cash,
        balance: 0,
    })
}

/// Draft of an expense category.
pub fn category_draft(name: &str) -> RecordDraft {
    RecordDraft::Category(NewCategory {
        name: name.into(),
        category_type: TransactionType::Expense,
        icon: "tag".into(),
        color: "#888888".into(),
    })
}

/// A scratch store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: LocalStore,
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory store.
    pub fn memory() -> Self {
        Self {
            store: LocalStore::open(Box::new(InMemoryBackend::new()), StoreConfig::default())
                .expect("Failed to open in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a file-backed store in a fresh temp directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("famfin.journal");
        let store =
            LocalStore::open_file(&path, StoreConfig::default()).expect("Failed to open store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the journal path if file-backed.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_ref()
            .map(|d| d.path().join("famfin.journal"))
    }

    /// Drops the store and opens the same journal again.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores.
    pub fn reopen(self) -> Self {
        let temp_dir = self.temp_dir.expect("Only file-backed stores can be reopened");
        drop(self.store);
        let path = temp_dir.path().join("famfin.journal");
        let store =
            LocalStore::open_file(&path, StoreConfig::default()).expect("Failed to reopen store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = LocalStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
