//! Query filters shared by the remote API and cache reads.

use crate::record::{Record, TransactionType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Filters for listing records of a family.
///
/// Transaction filters apply to transactions; `transaction_type` also
/// selects income or expense categories. Accounts are filtered by
/// `member_id` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    /// Income or expense only.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Transactions of one category.
    pub category_id: Option<String>,
    /// Transactions of one account.
    pub account_id: Option<String>,
    /// Inclusive lower date bound.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub date_to: Option<NaiveDate>,
    /// Records created by one family member.
    pub member_id: Option<String>,
}

impl ListFilter {
    /// Returns true if no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns true if `record` passes every set filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(member) = &self.member_id {
            if record.created_by() != member {
                return false;
            }
        }

        match record {
            Record::Transaction(t) => {
                self.transaction_type.map_or(true, |ty| t.transaction_type == ty)
                    && self.category_id.as_ref().map_or(true, |c| &t.category_id == c)
                    && self.account_id.as_ref().map_or(true, |a| &t.account_id == a)
                    && self.date_from.map_or(true, |from| t.date >= from)
                    && self.date_to.map_or(true, |to| t.date <= to)
            }
            Record::Category(c) => self.transaction_type.map_or(true, |ty| c.category_type == ty),
            Record::Account(_) => true,
        }
    }
}
