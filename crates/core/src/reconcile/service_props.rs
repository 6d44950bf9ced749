//! Property-based tests for `Reconciler::auto`.
//!
//! - No entry and no statement line is ever linked twice
//! - Several equal candidates link nothing and count one skip
//! - Every statement line is either linked or reported as remaining

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::config::ReconcileConfig;
use tally_shared::types::{AccountId, CurrencyCode, LedgerId, OwnerId, StatementLineId};

use super::service::Reconciler;
use crate::ledger::{CreateEntryInput, EntryBuilder, LineSpec};
use crate::store::{Account, AccountNature, EntryStatus, InMemoryStore, LedgerStore, StatementLine};

/// A few distinct amounts so collisions are frequent.
fn amount() -> impl Strategy<Value = Decimal> {
    prop::sample::select(vec![
        Decimal::new(4500, 2),
        Decimal::new(12000, 2),
        Decimal::new(25000, 2),
    ])
}

fn day_offset() -> impl Strategy<Value = i64> {
    0i64..10
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

struct Books {
    store: InMemoryStore,
    ledger: LedgerId,
    checking: AccountId,
    food: AccountId,
}

fn books() -> Books {
    let store = InMemoryStore::new();
    let owner = OwnerId::new();
    let mxn = CurrencyCode::parse("MXN").unwrap();
    let checking = store
        .create_account(Account::new(AccountId::new(), owner, "Checking", AccountNature::Asset, mxn))
        .unwrap()
        .id;
    let food = store
        .create_account(Account::new(AccountId::new(), owner, "Food", AccountNature::Expense, mxn))
        .unwrap()
        .id;
    Books {
        store,
        ledger: LedgerId::new(),
        checking,
        food,
    }
}

fn spend(b: &Books, amount: Decimal, day: i64) {
    EntryBuilder::new(&b.store)
        .create(CreateEntryInput {
            ledger_id: b.ledger,
            booked_at: t0() + TimeDelta::days(day),
            base_currency: "MXN".into(),
            description: "Card purchase".into(),
            lines: vec![
                LineSpec::debit(b.food, amount, "MXN"),
                LineSpec::credit(b.checking, amount, "MXN"),
            ],
            external_id: None,
            category_id: None,
            status: EntryStatus::Posted,
        })
        .unwrap();
}

fn bank_line(b: &Books, amount: Decimal, day: i64) -> StatementLineId {
    b.store
        .upsert_statement_line(StatementLine {
            id: StatementLineId::new(),
            account_id: b.checking,
            posted_at: t0() + TimeDelta::days(day),
            amount: -amount,
            currency: CurrencyCode::parse("MXN").unwrap(),
            memo: String::new(),
            external_id: StatementLineId::new().to_string(),
        })
        .unwrap()
        .into_inner()
        .id
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Links are one-to-one and every statement line is accounted for.
    #[test]
    fn prop_auto_never_double_links(
        entries in prop::collection::vec((amount(), day_offset()), 0..8),
        statements in prop::collection::vec((amount(), day_offset()), 0..8),
        window in 0i64..5,
    ) {
        let b = books();
        for (amount, day) in &entries {
            spend(&b, *amount, *day);
        }
        let ids: Vec<StatementLineId> = statements
            .iter()
            .map(|(amount, day)| bank_line(&b, *amount, *day))
            .collect();

        let report = Reconciler::new(&b.store, &ReconcileConfig::default())
            .auto(b.checking, window)
            .unwrap();

        let links: Vec<_> = ids
            .iter()
            .filter_map(|id| b.store.link_for_statement_line(*id))
            .collect();
        let linked_entries: HashSet<_> = links.iter().map(|l| l.entry_id).collect();
        prop_assert_eq!(links.len(), report.linked);
        prop_assert_eq!(linked_entries.len(), links.len());
        prop_assert_eq!(report.linked + report.remaining_statement_ids.len(), ids.len());
        prop_assert!(report.skipped <= report.remaining_statement_ids.len());
        for link in &links {
            prop_assert_eq!(b.store.get_entry(link.entry_id).unwrap().status, EntryStatus::Reconciled);
        }
    }

    /// N > 1 identical candidates never produce a link.
    #[test]
    fn prop_equal_candidates_are_skipped(
        amount in amount(),
        copies in 2usize..6,
        day in day_offset(),
    ) {
        let b = books();
        for _ in 0..copies {
            spend(&b, amount, day);
        }
        let stmt = bank_line(&b, amount, day);

        let report = Reconciler::new(&b.store, &ReconcileConfig::default())
            .auto(b.checking, 3)
            .unwrap();

        prop_assert_eq!(report.linked, 0);
        prop_assert_eq!(report.skipped, 1);
        prop_assert_eq!(report.remaining_statement_ids, vec![stmt]);
        prop_assert!(b.store.link_for_statement_line(stmt).is_none());
    }
}
