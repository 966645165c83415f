//! Domain records cached for offline use.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of domain entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Income or expense entry.
    Transaction,
    /// Money container (cash, bank, ...).
    Account,
    /// Income or expense category.
    Category,
}

impl EntityKind {
    /// All kinds, in cache refresh order.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Transaction,
        EntityKind::Account,
        EntityKind::Category,
    ];

    /// Returns the lowercase name used in logs and error strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Transaction => "transaction",
            EntityKind::Account => "account",
            EntityKind::Category => "category",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transaction (also the type of a category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

/// Type of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Physical cash.
    Cash,
    /// Bank account.
    Bank,
    /// Credit card or line.
    Credit,
    /// Investment account.
    Investment,
}

/// A single income or expense entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Server-issued or provisional identifier.
    pub id: String,
    /// Owning family workspace.
    pub family_id: String,
    /// Account the money moved through.
    pub account_id: String,
    /// Category the entry is filed under.
    pub category_id: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Signed amount in minor units.
    pub amount: i64,
    /// Free-form note.
    pub description: String,
    /// Booking date.
    pub date: NaiveDate,
    /// User who recorded the entry.
    pub created_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// An account owned by a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Server-issued or provisional identifier.
    pub id: String,
    /// Owning family workspace.
    pub family_id: String,
    /// Display name.
    pub name: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Current balance in minor units.
    pub balance: i64,
    /// User who created the account.
    pub created_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A category owned by a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Server-issued or provisional identifier.
    pub id: String,
    /// Owning family workspace.
    pub family_id: String,
    /// Display name.
    pub name: String,
    /// Whether the category files income or expenses.
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    /// Icon name.
    pub icon: String,
    /// Display color.
    pub color: String,
    /// User who created the category.
    pub created_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Any cached domain record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    /// A transaction.
    Transaction(Transaction),
    /// An account.
    Account(Account),
    /// A category.
    Category(Category),
}

impl Record {
    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Transaction(_) => EntityKind::Transaction,
            Record::Account(_) => EntityKind::Account,
            Record::Category(_) => EntityKind::Category,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Record::Transaction(t) => &t.id,
            Record::Account(a) => &a.id,
            Record::Category(c) => &c.id,
        }
    }

    /// Returns the owning family.
    #[must_use]
    pub fn family_id(&self) -> &str {
        match self {
            Record::Transaction(t) => &t.family_id,
            Record::Account(a) => &a.family_id,
            Record::Category(c) => &c.family_id,
        }
    }

    /// Returns the creating user.
    #[must_use]
    pub fn created_by(&self) -> &str {
        match self {
            Record::Transaction(t) => &t.created_by,
            Record::Account(a) => &a.created_by,
            Record::Category(c) => &c.created_by,
        }
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Record::Transaction(t) => t.updated_at,
            Record::Account(a) => a.updated_at,
            Record::Category(c) => c.updated_at,
        }
    }

    /// Returns the same record under another identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        match &mut self {
            Record::Transaction(t) => t.id = id,
            Record::Account(a) => a.id = id,
            Record::Category(c) => c.id = id,
        }
        self
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        match self {
            Record::Transaction(t) => t.updated_at = now,
            Record::Account(a) => a.updated_at = now,
            Record::Category(c) => c.updated_at = now,
        }
    }

    /// Strips the identifier and audit fields, leaving what a create call sends.
    #[must_use]
    pub fn to_draft(&self) -> RecordDraft {
        match self {
            Record::Transaction(t) => RecordDraft::Transaction(NewTransaction {
                account_id: t.account_id.clone(),
                category_id: t.category_id.clone(),
                transaction_type: t.transaction_type,
                amount: t.amount,
                description: Some(t.description.clone()),
                date: Some(t.date),
            }),
            Record::Account(a) => RecordDraft::Account(NewAccount {
                name: a.name.clone(),
                account_type: a.account_type,
                balance: a.balance,
            }),
            Record::Category(c) => RecordDraft::Category(NewCategory {
                name: c.name.clone(),
                category_type: c.category_type,
                icon: c.icon.clone(),
                color: c.color.clone(),
            }),
        }
    }

    /// Identifiers of other records this record points at.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        match self {
            Record::Transaction(t) => vec![t.account_id.as_str(), t.category_id.as_str()],
            Record::Account(_) | Record::Category(_) => Vec::new(),
        }
    }

    /// Replaces references to `from` with `to`. Returns true if anything changed.
    pub fn rewrite_reference(&mut self, from: &str, to: &str) -> bool {
        match self {
            Record::Transaction(t) => t.rewrite_reference(from, to),
            Record::Account(_) | Record::Category(_) => false,
        }
    }
}

impl Transaction {
    fn rewrite_reference(&mut self, from: &str, to: &str) -> bool {
        let mut changed = false;
        if self.account_id == from {
            self.account_id = to.to_string();
            changed = true;
        }
        if self.category_id == from {
            self.category_id = to.to_string();
            changed = true;
        }
        changed
    }
}

impl From<Transaction> for Record {
    fn from(value: Transaction) -> Self {
        Record::Transaction(value)
    }
}

impl From<Account> for Record {
    fn from(value: Account) -> Self {
        Record::Account(value)
    }
}

impl From<Category> for Record {
    fn from(value: Category) -> Self {
        Record::Category(value)
    }
}

/// Caller-supplied fields of a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Account the money moved through.
    pub account_id: String,
    /// Category the entry is filed under.
    pub category_id: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Signed amount in minor units.
    pub amount: i64,
    /// Optional note; empty when absent.
    pub description: Option<String>,
    /// Optional booking date; today when absent.
    pub date: Option<NaiveDate>,
}

/// Caller-supplied fields of a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Opening balance.
    pub balance: i64,
}

/// Caller-supplied fields of a new category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    /// Display name.
    pub name: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    /// Icon name.
    pub icon: String,
    /// Display color.
    pub color: String,
}

/// A create intent without identity or audit fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordDraft {
    /// New transaction.
    Transaction(NewTransaction),
    /// New account.
    Account(NewAccount),
    /// New category.
    Category(NewCategory),
}

impl RecordDraft {
    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordDraft::Transaction(_) => EntityKind::Transaction,
            RecordDraft::Account(_) => EntityKind::Account,
            RecordDraft::Category(_) => EntityKind::Category,
        }
    }

    /// Materializes the draft as a full record.
    #[must_use]
    pub fn into_record(
        self,
        id: impl Into<String>,
        family_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Record {
        let id = id.into();
        match self {
            RecordDraft::Transaction(t) => Record::Transaction(Transaction {
                id,
                family_id: family_id.to_string(),
                account_id: t.account_id,
                category_id: t.category_id,
                transaction_type: t.transaction_type,
                amount: t.amount,
                description: t.description.unwrap_or_default(),
                date: t.date.unwrap_or_else(|| now.date_naive()),
                created_by: user_id.to_string(),
                created_at: now,
                updated_at: now,
            }),
            RecordDraft::Account(a) => Record::Account(Account {
                id,
                family_id: family_id.to_string(),
                name: a.name,
                account_type: a.account_type,
                balance: a.balance,
                created_by: user_id.to_string(),
                created_at: now,
                updated_at: now,
            }),
            RecordDraft::Category(c) => Record::Category(Category {
                id,
                family_id: family_id.to_string(),
                name: c.name,
                category_type: c.category_type,
                icon: c.icon,
                color: c.color,
                created_by: user_id.to_string(),
                created_at: now,
                updated_at: now,
            }),
        }
    }
}

impl From<NewTransaction> for RecordDraft {
    fn from(value: NewTransaction) -> Self {
        RecordDraft::Transaction(value)
    }
}

impl From<NewAccount> for RecordDraft {
    fn from(value: NewAccount) -> Self {
        RecordDraft::Account(value)
    }
}

impl From<NewCategory> for RecordDraft {
    fn from(value: NewCategory) -> Self {
        RecordDraft::Category(value)
    }
}
