//! Reconciler: links ledger entries to bank statement lines.
//!
//! An entry moves to reconciled exactly once, through a link. The automatic
//! pass only links when one entry is a match; ambiguity is counted, never
//! resolved by guessing.

use std::collections::{HashMap, HashSet};

use chrono::{TimeDelta, Utc};
use rust_decimal::Decimal;
use tally_shared::config::ReconcileConfig;
use tally_shared::types::{AccountId, EntryId, StatementLineId};
use tracing::{debug, info, warn};

use super::error::ReconcileError;
use super::types::AutoReconcileReport;
use crate::store::{Entry, LedgerStore, Line, ReconciliationLink, StatementLine, StoreError};

/// Widest accepted day window.
pub const MAX_WINDOW_DAYS: i64 = 366;

/// Matches entries and statement lines of one store.
pub struct Reconciler<'a, S> {
    store: &'a S,
    amount_epsilon: Decimal,
}

impl<'a, S: LedgerStore> Reconciler<'a, S> {
    /// Creates a reconciler from configuration.
    #[must_use]
    pub fn new(store: &'a S, config: &ReconcileConfig) -> Self {
        Self::with_epsilon(store, config.amount_epsilon)
    }

    /// Creates a reconciler with an explicit amount tolerance.
    ///
    /// A negative tolerance is treated as zero, so only exact amounts match.
    #[must_use]
    pub fn with_epsilon(store: &'a S, amount_epsilon: Decimal) -> Self {
        Self {
            store,
            amount_epsilon: amount_epsilon.max(Decimal::ZERO),
        }
    }

    fn amount_matches(&self, line: &Line, statement: &StatementLine) -> bool {
        let within = |amount: Decimal| {
            amount
                .checked_sub(statement.amount)
                .is_some_and(|diff| diff.abs() <= self.amount_epsilon)
        };
        within(line.native.amount) || within(line.booked.amount)
    }

    /// Links every unlinked statement line of an account that has exactly one
    /// matching open entry.
    ///
    /// Statement lines are processed oldest first, ties in import order. A
    /// candidate is a line on the same account whose entry is not reconciled,
    /// was booked within `window_days` of the statement and whose native or
    /// booked amount is within the configured tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidWindow`] for a window outside
    /// `0..=MAX_WINDOW_DAYS` and [`ReconcileError::AccountNotFound`] for an
    /// unknown account.
    #[tracing::instrument(skip(self), fields(%account_id, window_days))]
    pub fn auto(
        &self,
        account_id: AccountId,
        window_days: i64,
    ) -> Result<AutoReconcileReport, ReconcileError> {
        let invalid = || ReconcileError::InvalidWindow {
            days: window_days,
            max: MAX_WINDOW_DAYS,
        };
        if !(0..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(invalid());
        }
        let window = TimeDelta::try_days(window_days).ok_or_else(invalid)?;

        self.store.get_account(account_id).map_err(|e| match e {
            StoreError::NotFound { .. } => ReconcileError::AccountNotFound(account_id),
            other => other.into(),
        })?;

        let mut statements: Vec<StatementLine> = self
            .store
            .list_statement_lines(account_id)
            .into_iter()
            .filter(|s| self.store.link_for_statement_line(s.id).is_none())
            .collect();
        statements.sort_by_key(|s| s.posted_at);

        let lines = self.store.lines_for_account(account_id);
        let mut open = self.open_entries(&lines)?;

        let mut report = AutoReconcileReport::default();
        for statement in statements {
            let mut candidates: Vec<&Line> = Vec::new();
            for line in &lines {
                let Some(entry) = open.get(&line.entry_id) else {
                    continue;
                };
                if (entry.booked_at - statement.posted_at).abs() > window
                    || !self.amount_matches(line, &statement)
                    || candidates.iter().any(|c| c.entry_id == line.entry_id)
                {
                    continue;
                }
                candidates.push(line);
            }

            match candidates.as_slice() {
                [line] => {
                    let link = self.store.create_link(ReconciliationLink {
                        entry_id: line.entry_id,
                        line_id: line.id,
                        statement_line_id: statement.id,
                        manual: false,
                        linked_at: Utc::now(),
                    })?;
                    open.remove(&link.entry_id);
                    debug!(
                        entry_id = %link.entry_id,
                        statement_line_id = %statement.id,
                        "statement line linked"
                    );
                    report.linked += 1;
                }
                [] => report.remaining_statement_ids.push(statement.id),
                many => {
                    warn!(
                        statement_line_id = %statement.id,
                        candidates = many.len(),
                        "ambiguous statement line skipped"
                    );
                    report.skipped += 1;
                    report.remaining_statement_ids.push(statement.id);
                }
            }
        }

        info!(
            linked = report.linked,
            skipped = report.skipped,
            remaining = report.remaining_statement_ids.len(),
            "automatic reconciliation finished"
        );
        Ok(report)
    }

    /// Entries owning `lines` that can still be reconciled.
    fn open_entries(&self, lines: &[Line]) -> Result<HashMap<EntryId, Entry>, ReconcileError> {
        let mut seen = HashSet::new();
        let mut open = HashMap::new();
        for line in lines {
            if !seen.insert(line.entry_id) {
                continue;
            }
            let entry = self.store.get_entry(line.entry_id)?;
            if !entry.status.is_reconciled() && self.store.link_for_entry(entry.id).is_none() {
                open.insert(entry.id, entry);
            }
        }
        Ok(open)
    }

    /// Links an entry to a statement line chosen by a user.
    ///
    /// No day window applies, but some line of the entry must sit on the
    /// statement's account with a matching amount.
    ///
    /// # Errors
    ///
    /// Returns a [`ReconcileError`] if either side is unknown or already
    /// linked, or if no line of the entry matches the statement line.
    #[tracing::instrument(skip(self), fields(%entry_id, %statement_line_id))]
    pub fn link(
        &self,
        entry_id: EntryId,
        statement_line_id: StatementLineId,
    ) -> Result<ReconciliationLink, ReconcileError> {
        let statement = self
            .store
            .get_statement_line(statement_line_id)
            .map_err(|e| match e {
                StoreError::NotFound { .. } => {
                    ReconcileError::StatementLineNotFound(statement_line_id)
                }
                other => other.into(),
            })?;
        let entry = self.store.get_entry(entry_id).map_err(|e| match e {
            StoreError::NotFound { .. } => ReconcileError::EntryNotFound(entry_id),
            other => other.into(),
        })?;

        if entry.status.is_reconciled() || self.store.link_for_entry(entry_id).is_some() {
            return Err(ReconcileError::EntryAlreadyReconciled(entry_id));
        }
        if self.store.link_for_statement_line(statement_line_id).is_some() {
            return Err(ReconcileError::StatementAlreadyLinked(statement_line_id));
        }

        let line = self
            .store
            .lines_for_entry(entry_id)?
            .into_iter()
            .find(|l| l.account_id == statement.account_id && self.amount_matches(l, &statement))
            .ok_or(ReconcileError::NoMatchingLine {
                entry_id,
                statement_line_id,
            })?;

        let link = self.store.create_link(ReconciliationLink {
            entry_id,
            line_id: line.id,
            statement_line_id,
            manual: true,
            linked_at: Utc::now(),
        })?;
        info!(line_id = %link.line_id, "entry reconciled manually");
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CreateEntryInput, EntryBuilder, LineSpec};
    use crate::store::{Account, AccountNature, EntryStatus, InMemoryStore};
    use chrono::{DateTime, TimeZone};
    use rust_decimal_macros::dec;
    use tally_shared::types::{CurrencyCode, LedgerId, OwnerId};

    struct Fixture {
        store: InMemoryStore,
        ledger: LedgerId,
        checking: AccountId,
        food: AccountId,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
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
        Fixture {
            store,
            ledger: LedgerId::new(),
            checking,
            food,
        }
    }

    /// Posts a purchase: debit Food, credit Checking.
    fn purchase(f: &Fixture, amount: Decimal, days: i64, status: EntryStatus) -> EntryId {
        EntryBuilder::new(&f.store)
            .create(CreateEntryInput {
                ledger_id: f.ledger,
                booked_at: t0() + TimeDelta::days(days),
                base_currency: "MXN".into(),
                description: "Groceries".into(),
                lines: vec![
                    LineSpec::debit(f.food, amount, "MXN"),
                    LineSpec::credit(f.checking, amount, "MXN"),
                ],
                external_id: None,
                category_id: None,
                status,
            })
            .unwrap()
            .entry
            .id
    }

    fn statement(f: &Fixture, amount: Decimal, days: i64) -> StatementLineId {
        let line = StatementLine {
            id: StatementLineId::new(),
            account_id: f.checking,
            posted_at: t0() + TimeDelta::days(days),
            amount,
            currency: CurrencyCode::parse("MXN").unwrap(),
            memo: "WALMART".into(),
            external_id: format!("TX-{}", StatementLineId::new()),
        };
        f.store.upsert_statement_line(line).unwrap().into_inner().id
    }

    fn reconciler(f: &Fixture) -> Reconciler<'_, InMemoryStore> {
        Reconciler::new(&f.store, &ReconcileConfig::default())
    }

    #[test]
    fn test_unique_candidate_is_linked() {
        let f = fixture();
        let entry = purchase(&f, dec!(250), 0, EntryStatus::Posted);
        let stmt = statement(&f, dec!(-250), 2);

        let report = reconciler(&f).auto(f.checking, 3).unwrap();

        assert_eq!(report.linked, 1);
        assert_eq!(report.skipped, 0);
        assert!(report.remaining_statement_ids.is_empty());
        let link = f.store.link_for_statement_line(stmt).unwrap();
        assert_eq!(link.entry_id, entry);
        assert!(!link.manual);
        assert_eq!(f.store.get_entry(entry).unwrap().status, EntryStatus::Reconciled);
    }

    #[test]
    fn test_draft_entries_are_candidates() {
        let f = fixture();
        purchase(&f, dec!(80), 0, EntryStatus::Draft);
        statement(&f, dec!(-80), 0);

        assert_eq!(reconciler(&f).auto(f.checking, 0).unwrap().linked, 1);
    }

    #[test]
    fn test_outside_window_or_amount_stays_unlinked() {
        let f = fixture();
        purchase(&f, dec!(250), 0, EntryStatus::Posted);
        let late = statement(&f, dec!(-250), 4);
        let off = statement(&f, dec!(-251), 1);

        let report = reconciler(&f).auto(f.checking, 3).unwrap();

        assert_eq!(report.linked, 0);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.remaining_statement_ids, vec![off, late]);
    }

    #[test]
    fn test_amount_tolerance() {
        let f = fixture();
        purchase(&f, dec!(99.99), 0, EntryStatus::Posted);
        statement(&f, dec!(-100.00), 0);

        assert_eq!(reconciler(&f).auto(f.checking, 0).unwrap().linked, 1);
    }

    #[test]
    fn test_negative_tolerance_means_exact() {
        let f = fixture();
        purchase(&f, dec!(99.99), 0, EntryStatus::Posted);
        let near = statement(&f, dec!(-100.00), 0);
        let exact_entry = purchase(&f, dec!(42), 0, EntryStatus::Posted);
        statement(&f, dec!(-42), 0);

        let report = Reconciler::with_epsilon(&f.store, dec!(-0.5))
            .auto(f.checking, 0)
            .unwrap();

        assert_eq!(report.linked, 1);
        assert_eq!(report.remaining_statement_ids, vec![near]);
        assert!(f.store.link_for_entry(exact_entry).is_some());
    }

    #[test]
    fn test_extreme_amounts_do_not_match() {
        let f = fixture();
        let big = dec!(50000000000000000000000000000);
        purchase(&f, big, 0, EntryStatus::Posted);
        let stmt = statement(&f, big, 0);

        let report = reconciler(&f).auto(f.checking, 0).unwrap();

        assert_eq!(report.linked, 0);
        assert_eq!(report.remaining_statement_ids, vec![stmt]);
    }

    #[test]
    fn test_ambiguous_statement_is_skipped() {
        let f = fixture();
        let a = purchase(&f, dec!(120), 0, EntryStatus::Posted);
        let b = purchase(&f, dec!(120), 1, EntryStatus::Posted);
        let stmt = statement(&f, dec!(-120), 1);

        let report = reconciler(&f).auto(f.checking, 3).unwrap();

        assert_eq!(report.linked, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.remaining_statement_ids, vec![stmt]);
        assert!(f.store.link_for_entry(a).is_none());
        assert!(f.store.link_for_entry(b).is_none());
    }

    #[test]
    fn test_earlier_statement_claims_the_entry() {
        let f = fixture();
        let entry = purchase(&f, dec!(60), 0, EntryStatus::Posted);
        let later = statement(&f, dec!(-60), 1);
        let earlier = statement(&f, dec!(-60), -1);

        let report = reconciler(&f).auto(f.checking, 3).unwrap();

        assert_eq!(report.linked, 1);
        assert_eq!(report.remaining_statement_ids, vec![later]);
        assert_eq!(f.store.link_for_entry(entry).unwrap().statement_line_id, earlier);
    }

    #[test]
    fn test_second_pass_links_nothing_new() {
        let f = fixture();
        purchase(&f, dec!(45), 0, EntryStatus::Posted);
        statement(&f, dec!(-45), 0);
        let extra = statement(&f, dec!(-45), 0);

        let r = reconciler(&f);
        assert_eq!(r.auto(f.checking, 1).unwrap().linked, 1);
        let again = r.auto(f.checking, 1).unwrap();
        assert_eq!(again.linked, 0);
        assert_eq!(again.remaining_statement_ids, vec![extra]);
    }

    #[test]
    fn test_rejects_bad_window_and_account() {
        let f = fixture();
        let r = reconciler(&f);
        assert!(matches!(r.auto(f.checking, -1), Err(ReconcileError::InvalidWindow { days: -1, .. })));
        assert!(matches!(
            r.auto(f.checking, MAX_WINDOW_DAYS + 1),
            Err(ReconcileError::InvalidWindow { .. })
        ));
        assert!(matches!(r.auto(AccountId::new(), 3), Err(ReconcileError::AccountNotFound(_))));
    }

    #[test]
    fn test_manual_link_ignores_window() {
        let f = fixture();
        let entry = purchase(&f, dec!(300), 0, EntryStatus::Posted);
        let stmt = statement(&f, dec!(-300), 40);

        let link = reconciler(&f).link(entry, stmt).unwrap();

        assert!(link.manual);
        assert_eq!(f.store.get_entry(entry).unwrap().status, EntryStatus::Reconciled);
    }

    #[test]
    fn test_manual_link_rejections() {
        let f = fixture();
        let r = reconciler(&f);
        let entry = purchase(&f, dec!(300), 0, EntryStatus::Posted);
        let other = purchase(&f, dec!(300), 0, EntryStatus::Posted);
        let stmt = statement(&f, dec!(-300), 0);
        let wrong_amount = statement(&f, dec!(-30), 0);

        assert!(matches!(r.link(entry, wrong_amount), Err(ReconcileError::NoMatchingLine { .. })));
        r.link(entry, stmt).unwrap();
        assert!(matches!(r.link(entry, wrong_amount), Err(ReconcileError::EntryAlreadyReconciled(_))));
        assert!(matches!(r.link(other, stmt), Err(ReconcileError::StatementAlreadyLinked(_))));
        assert!(matches!(r.link(EntryId::new(), stmt), Err(ReconcileError::EntryNotFound(_))));
        assert!(matches!(
            r.link(other, StatementLineId::new()),
            Err(ReconcileError::StatementLineNotFound(_))
        ));
    }
}
