//! Dashboard aggregates computed from cached records.

use crate::record::{Record, Transaction, TransactionType};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Number of transactions listed as recent.
const RECENT_LIMIT: usize = 5;

/// Monthly totals shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Income booked in the current month.
    pub total_income: i64,
    /// Expenses booked in the current month.
    pub total_expense: i64,
    /// Sum of all account balances.
    pub total_balance: i64,
    /// Latest transactions, newest first.
    pub recent_transactions: Vec<Transaction>,
}

impl DashboardStats {
    /// Aggregates a family's cached records for the month containing `today`.
    #[must_use]
    pub fn from_records(records: &[Record], today: NaiveDate) -> Self {
        let mut stats = Self::default();
        let mut transactions = Vec::new();

        for record in records {
            match record {
                Record::Transaction(t) => {
                    if t.date.year() == today.year() && t.date.month() == today.month() {
                        match t.transaction_type {
                            TransactionType::Income => stats.total_income += t.amount,
                            TransactionType::Expense => stats.total_expense += t.amount,
                        }
                    }
                    transactions.push(t.clone());
                }
                Record::Account(a) => stats.total_balance += a.balance,
                Record::Category(_) => {}
            }
        }

        transactions.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        transactions.truncate(RECENT_LIMIT);
        stats.recent_transactions = transactions;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AccountType, NewAccount, NewTransaction, RecordDraft};
    use chrono::Utc;

    fn tx(id: &str, ty: TransactionType, amount: i64, date: NaiveDate) -> Record {
        RecordDraft::from(NewTransaction {
            account_id: "A1".into(),
            category_id: "C1".into(),
            transaction_type: ty,
            amount,
            description: None,
            date: Some(date),
        })
        .into_record(id, "fam", "u", Utc::now())
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn totals_cover_current_month_only() {
        let records = vec![
            tx("1", TransactionType::Income, 1_000, day(3, 1)),
            tx("2", TransactionType::Expense, 300, day(3, 2)),
            tx("3", TransactionType::Expense, 999, day(2, 28)),
            RecordDraft::from(NewAccount {
                name: "Cash".into(),
                account_type: AccountType::Cash,
                balance: 700,
            })
            .into_record("a", "fam", "u", Utc::now()),
        ];

        let stats = DashboardStats::from_records(&records, day(3, 15));
        assert_eq!(stats.total_income, 1_000);
        assert_eq!(stats.total_expense, 300);
        assert_eq!(stats.total_balance, 700);
        assert_eq!(stats.recent_transactions.len(), 3);
        assert_eq!(stats.recent_transactions[0].id, "2");
    }

    #[test]
    fn recent_is_capped() {
        let records: Vec<Record> = (1..=8)
            .map(|d| tx(&d.to_string(), TransactionType::Expense, 1, day(3, d)))
            .collect();

        let stats = DashboardStats::from_records(&records, day(3, 31));
        let ids: Vec<&str> = stats.recent_transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["8", "7", "6", "5", "4"]);
    }
}
