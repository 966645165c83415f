//! Property-based test generators using proptest.
//!
//! Ids are drawn from small pools so generated operations collide on the
//! same rows often enough to be interesting.

use crate::fixtures::{fixed_time, TEST_USER};
use chrono::{Duration, NaiveDate};
use famfin_protocol::{
    Account, AccountPatch, AccountType, Category, CategoryPatch, EntityKind, Mutation, Record,
    RecordPatch, Transaction, TransactionPatch, TransactionType,
};
use proptest::prelude::*;

/// Strategy for entity kinds.
pub fn entity_kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::Transaction),
        Just(EntityKind::Account),
        Just(EntityKind::Category),
    ]
}

/// Strategy for family ids from a small pool.
pub fn family_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["F1", "F2", "F3"]).prop_map(String::from)
}

/// Strategy for server-issued ids from a small pool.
pub fn server_id_strategy() -> impl Strategy<Value = String> {
    (1u32..16).prop_map(|n| format!("srv_{n}"))
}

/// Strategy for well-formed provisional ids.
pub fn provisional_id_strategy() -> impl Strategy<Value = String> {
    (
        1_600_000_000_000u64..1_900_000_000_000,
        prop::string::string_regex("[0-9a-z]{9}").expect("Invalid regex"),
    )
        .prop_map(|(millis, suffix)| format!("offline_{millis}_{suffix}"))
}

/// Strategy for record ids, mixing server and provisional ids.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![3 => server_id_strategy(), 1 => provisional_id_strategy()]
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..90).prop_map(|days| fixed_time().date_naive() - Duration::days(days))
}

fn transaction_type_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Income), Just(TransactionType::Expense)]
}

/// Strategy for a record of the given kind in the given family.
pub fn record_of_kind_strategy(kind: EntityKind, family_id: String) -> BoxedStrategy<Record> {
    match kind {
        EntityKind::Transaction => (
            record_id_strategy(),
            server_id_strategy(),
            server_id_strategy(),
            transaction_type_strategy(),
            -100_000i64..100_000,
            date_strategy(),
        )
            .prop_map(move |(id, account, category, ty, amount, date)| {
                Record::Transaction(Transaction {
                    id,
                    family_id: family_id.clone(),
                    account_id: account,
                    category_id: category,
                    transaction_type: ty,
                    amount,
                    description: String::new(),
                    date,
                    created_by: TEST_USER.into(),
                    created_at: fixed_time(),
                    updated_at: fixed_time(),
                })
            })
            .boxed(),
        EntityKind::Account => (record_id_strategy(), "[A-Za-z ]{1,12}", any::<i32>())
            .prop_map(move |(id, name, balance)| {
                Record::Account(Account {
                    id,
                    family_id: family_id.clone(),
                    name,
                    account_type: AccountType::Bank,
                    balance: i64::from(balance),
                    created_by: TEST_USER.into(),
                    created_at: fixed_time(),
                    updated_at: fixed_time(),
                })
            })
            .boxed(),
        EntityKind::Category => (
            record_id_strategy(),
            "[A-Za-z ]{1,12}",
            transaction_type_strategy(),
        )
            .prop_map(move |(id, name, ty)| {
                Record::Category(Category {
                    id,
                    family_id: family_id.clone(),
                    name,
                    category_type: ty,
                    icon: "tag".into(),
                    color: "#000000".into(),
                    created_by: TEST_USER.into(),
                    created_at: fixed_time(),
                    updated_at: fixed_time(),
                })
            })
            .boxed(),
    }
}

/// Strategy for any record in any pooled family.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (entity_kind_strategy(), family_id_strategy())
        .prop_flat_map(|(kind, family)| record_of_kind_strategy(kind, family))
}

/// Strategy for a patch of the given kind.
pub fn patch_strategy(kind: EntityKind) -> BoxedStrategy<RecordPatch> {
    match kind {
        EntityKind::Transaction => (
            prop::option::of(-100_000i64..100_000),
            prop::option::of("[a-z ]{0,16}"),
        )
            .prop_map(|(amount, description)| {
                RecordPatch::Transaction(TransactionPatch {
                    amount,
                    description,
                    ..Default::default()
                })
            })
            .boxed(),
        EntityKind::Account => prop::option::of(any::<i32>())
            .prop_map(|balance| {
                RecordPatch::Account(AccountPatch {
                    balance: balance.map(i64::from),
                    ..Default::default()
                })
            })
            .boxed(),
        EntityKind::Category => prop::option::of("[A-Za-z]{1,8}")
            .prop_map(|name| {
                RecordPatch::Category(CategoryPatch {
                    name,
                    ..Default::default()
                })
            })
            .boxed(),
    }
}

/// Strategy for deferred mutations.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    entity_kind_strategy().prop_flat_map(|kind| {
        prop_oneof![
            (family_id_strategy(), provisional_id_strategy()).prop_flat_map(move |(family, id)| {
                record_of_kind_strategy(kind, family).prop_map(move |record| Mutation::Create {
                    record: record.with_id(id.clone()),
                })
            }),
            (record_id_strategy(), patch_strategy(kind))
                .prop_map(|(id, patch)| Mutation::Update { id, patch }),
            record_id_strategy().prop_map(move |id| Mutation::Delete { kind, id }),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use famfin_protocol::is_provisional;

    proptest! {
        #[test]
        fn provisional_ids_are_recognized(id in provisional_id_strategy()) {
            prop_assert!(is_provisional(&id));
        }

        #[test]
        fn server_ids_are_not_provisional(id in server_id_strategy()) {
            prop_assert!(!is_provisional(&id));
        }

        #[test]
        fn records_match_requested_kind(
            (kind, family, record) in (entity_kind_strategy(), family_id_strategy())
                .prop_flat_map(|(kind, family)| {
                    (Just(kind), Just(family.clone()), record_of_kind_strategy(kind, family))
                })
        ) {
            prop_assert_eq!(record.kind(), kind);
            prop_assert_eq!(record.family_id(), family.as_str());
        }

        #[test]
        fn created_records_carry_provisional_ids(mutation in mutation_strategy()) {
            if let Mutation::Create { record } = &mutation {
                prop_assert!(is_provisional(record.id()));
                prop_assert_eq!(record.kind(), mutation.kind());
            }
        }
    }
}
