//! Property-based tests for `EntryBuilder`.
//!
//! - Balance integrity: stored entries have 2+ lines and sum to zero
//! - Currency conversion: same-currency lines book at rate 1, cross-currency
//!   lines at the registered rate
//! - Idempotency on (ledger, external id)

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, CurrencyCode, LedgerId, OwnerId};

use super::error::LedgerError;
use super::service::EntryBuilder;
use super::types::{CreateEntryInput, Direction, EntryStatus, LineSpec};
use crate::currency::{convert_booked, FxRateTable};
use crate::store::{Account, AccountNature, InMemoryStore, LedgerStore};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive exchange rates (0.01 to 100.00).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..10_000i64).prop_map(|v| Decimal::new(v, 2))
}

fn booked_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

fn open_account(store: &InMemoryStore, currency: &str, nature: AccountNature) -> AccountId {
    store
        .create_account(Account::new(
            AccountId::new(),
            OwnerId::new(),
            "Prop account",
            nature,
            code(currency),
        ))
        .unwrap()
        .id
}

fn make_input(ledger_id: LedgerId, lines: Vec<LineSpec>) -> CreateEntryInput {
    CreateEntryInput {
        ledger_id,
        booked_at: booked_at(),
        base_currency: "MXN".to_string(),
        description: "Prop entry".to_string(),
        lines,
        external_id: None,
        category_id: None,
        status: EntryStatus::Posted,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Split debits against one credit always balance and keep the sign convention.
    #[test]
    fn prop_split_entry_balances(
        debits in prop::collection::vec(positive_amount(), 1..6),
    ) {
        let store = InMemoryStore::new();
        let expense = open_account(&store, "MXN", AccountNature::Expense);
        let checking = open_account(&store, "MXN", AccountNature::Asset);
        let total: Decimal = debits.iter().copied().sum();

        let mut lines: Vec<LineSpec> = debits
            .iter()
            .map(|amount| LineSpec::debit(expense, *amount, "MXN"))
            .collect();
        lines.push(LineSpec::credit(checking, total, "MXN"));

        let built = EntryBuilder::new(&store)
            .create(make_input(LedgerId::new(), lines))
            .unwrap();

        prop_assert!(built.lines.len() >= 2);
        prop_assert_eq!(built.booked_sum(), Decimal::ZERO);
        for line in &built.lines {
            prop_assert_eq!(line.fx_rate, Decimal::ONE);
            prop_assert_eq!(line.booked.amount, line.native.amount);
            match line.direction {
                Direction::Debit => prop_assert!(line.booked.amount > Decimal::ZERO),
                Direction::Credit => prop_assert!(line.booked.amount < Decimal::ZERO),
            }
        }
    }

    /// Cross-currency lines book at the registered rate.
    #[test]
    fn prop_cross_currency_uses_registered_rate(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let store = InMemoryStore::new();
        let checking = open_account(&store, "MXN", AccountNature::Asset);
        let card = open_account(&store, "USD", AccountNature::Liability);
        FxRateTable::new(&store)
            .ensure(code("MXN"), code("USD"), booked_at(), rate)
            .unwrap();
        let converted = convert_booked(amount, rate).unwrap();

        let built = EntryBuilder::new(&store)
            .create(make_input(
                LedgerId::new(),
                vec![
                    LineSpec::debit(checking, converted, "MXN"),
                    LineSpec::credit(card, amount, "USD"),
                ],
            ))
            .unwrap();

        let usd_line = &built.lines[1];
        prop_assert_eq!(usd_line.fx_rate, rate);
        prop_assert_eq!(usd_line.native.amount, -amount);
        prop_assert_eq!(usd_line.booked.amount, -converted);
        prop_assert_eq!(built.booked_sum(), Decimal::ZERO);
    }

    /// Unbalanced input is rejected and nothing is stored.
    #[test]
    fn prop_unbalanced_entry_rejected(
        debit in positive_amount(),
        credit in positive_amount(),
    ) {
        prop_assume!(debit != credit);
        let store = InMemoryStore::new();
        let expense = open_account(&store, "MXN", AccountNature::Expense);
        let checking = open_account(&store, "MXN", AccountNature::Asset);

        let result = EntryBuilder::new(&store).create(make_input(
            LedgerId::new(),
            vec![
                LineSpec::debit(expense, debit, "MXN"),
                LineSpec::credit(checking, credit, "MXN"),
            ],
        ));

        let is_unbalanced = matches!(result, Err(LedgerError::Unbalanced { .. }));
        prop_assert!(is_unbalanced);
        prop_assert_eq!(store.entry_count(), 0);
        prop_assert!(store.lines_for_account(expense).is_empty());
    }

    /// Replaying an external id any number of times yields one stored entry.
    #[test]
    fn prop_replay_is_idempotent(
        amount in positive_amount(),
        replays in 1usize..5,
    ) {
        let store = InMemoryStore::new();
        let expense = open_account(&store, "MXN", AccountNature::Expense);
        let checking = open_account(&store, "MXN", AccountNature::Asset);
        let ledger = LedgerId::new();
        let mut input = make_input(
            ledger,
            vec![
                LineSpec::debit(expense, amount, "MXN"),
                LineSpec::credit(checking, amount, "MXN"),
            ],
        );
        input.external_id = Some("stmt-7".to_string());

        let builder = EntryBuilder::new(&store);
        let first = builder.create(input.clone()).unwrap();
        for _ in 0..replays {
            let again = builder.create(input.clone()).unwrap();
            prop_assert_eq!(again.entry.id, first.entry.id);
        }
        prop_assert_eq!(store.entry_count(), 1);
        prop_assert_eq!(store.lines_for_entry(first.entry.id).unwrap(), first.lines);
    }

    /// Cross-currency lines without any rate source fail with FX missing.
    #[test]
    fn prop_missing_rate_fails(amount in positive_amount()) {
        let store = InMemoryStore::new();
        let checking = open_account(&store, "MXN", AccountNature::Asset);
        let card = open_account(&store, "USD", AccountNature::Liability);

        let result = EntryBuilder::new(&store).create(make_input(
            LedgerId::new(),
            vec![
                LineSpec::debit(checking, amount, "MXN"),
                LineSpec::credit(card, amount, "USD"),
            ],
        ));

        let is_missing = matches!(result, Err(LedgerError::FxMissing { .. }));
        prop_assert!(is_missing);
        prop_assert_eq!(store.entry_count(), 0);
    }
}
