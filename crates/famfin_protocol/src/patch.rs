//! Typed partial updates.

use crate::error::{ProtocolError, ProtocolResult};
use crate::record::{AccountType, EntityKind, Record, TransactionType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Partial update of a transaction. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPatch {
    /// New account.
    pub account_id: Option<String>,
    /// New category.
    pub category_id: Option<String>,
    /// New direction.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// New amount.
    pub amount: Option<i64>,
    /// New note.
    pub description: Option<String>,
    /// New booking date.
    pub date: Option<NaiveDate>,
}

/// Partial update of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPatch {
    /// New name.
    pub name: Option<String>,
    /// New type.
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    /// New balance.
    pub balance: Option<i64>,
}

/// Partial update of a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    /// New name.
    pub name: Option<String>,
    /// New type.
    #[serde(rename = "type")]
    pub category_type: Option<TransactionType>,
    /// New icon.
    pub icon: Option<String>,
    /// New color.
    pub color: Option<String>,
}

/// A partial update for any entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordPatch {
    /// Transaction update.
    Transaction(TransactionPatch),
    /// Account update.
    Account(AccountPatch),
    /// Category update.
    Category(CategoryPatch),
}

impl RecordPatch {
    /// Returns the entity kind the patch applies to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordPatch::Transaction(_) => EntityKind::Transaction,
            RecordPatch::Account(_) => EntityKind::Account,
            RecordPatch::Category(_) => EntityKind::Category,
        }
    }

    /// Applies the patch to `record` and stamps `updated_at = now`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::KindMismatch`] if the record is of another kind;
    /// the record is left untouched in that case.
    pub fn apply(&self, record: &mut Record, now: DateTime<Utc>) -> ProtocolResult<()> {
        let expected = record.kind();
        match (self, &mut *record) {
            (RecordPatch::Transaction(p), Record::Transaction(t)) => {
                set(&mut t.account_id, &p.account_id);
                set(&mut t.category_id, &p.category_id);
                set(&mut t.transaction_type, &p.transaction_type);
                set(&mut t.amount, &p.amount);
                set(&mut t.description, &p.description);
                set(&mut t.date, &p.date);
            }
            (RecordPatch::Account(p), Record::Account(a)) => {
                set(&mut a.name, &p.name);
                set(&mut a.account_type, &p.account_type);
                set(&mut a.balance, &p.balance);
            }
            (RecordPatch::Category(p), Record::Category(c)) => {
                set(&mut c.name, &p.name);
                set(&mut c.category_type, &p.category_type);
                set(&mut c.icon, &p.icon);
                set(&mut c.color, &p.color);
            }
            _ => {
                return Err(ProtocolError::KindMismatch {
                    expected,
                    found: self.kind(),
                })
            }
        }
        record.touch(now);
        Ok(())
    }

    /// Identifiers of other records the patch points at.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        match self {
            RecordPatch::Transaction(p) => p
                .account_id
                .iter()
                .chain(p.category_id.iter())
                .map(String::as_str)
                .collect(),
            RecordPatch::Account(_) | RecordPatch::Category(_) => Vec::new(),
        }
    }

    /// Replaces references to `from` with `to`. Returns true if anything changed.
    pub fn rewrite_reference(&mut self, from: &str, to: &str) -> bool {
        let RecordPatch::Transaction(p) = self else {
            return false;
        };
        let mut changed = false;
        for field in [&mut p.account_id, &mut p.category_id].into_iter().flatten() {
            if *field == from {
                *field = to.to_string();
                changed = true;
            }
        }
        changed
    }
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl From<TransactionPatch> for RecordPatch {
    fn from(value: TransactionPatch) -> Self {
        RecordPatch::Transaction(value)
    }
}

impl From<AccountPatch> for RecordPatch {
    fn from(value: AccountPatch) -> Self {
        RecordPatch::Account(value)
    }
}

impl From<CategoryPatch> for RecordPatch {
    fn from(value: CategoryPatch) -> Self {
        RecordPatch::Category(value)
    }
}
