//! Account balances and trial balance.
//!
//! - Asset/Expense: balance = debit - credit (debit-normal)
//! - Liability/Equity/Income: balance = credit - debit (credit-normal)

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CurrencyCode, LedgerId, PageRequest};

use super::error::LedgerError;
use crate::store::{Account, AccountNature, LedgerStore, Line};

/// Page size used when walking a ledger's entries.
const SCAN_PAGE_SIZE: u32 = 500;

/// Normal side of an account for balance presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Debit-normal accounts (Asset, Expense).
    DebitNormal,
    /// Credit-normal accounts (Liability, Equity, Income).
    CreditNormal,
}

impl NormalBalance {
    /// Normal side of an account nature.
    #[must_use]
    pub const fn of(nature: AccountNature) -> Self {
        if nature.is_debit_normal() {
            Self::DebitNormal
        } else {
            Self::CreditNormal
        }
    }

    /// Balance presented on the normal side.
    #[must_use]
    pub fn present(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::DebitNormal => debit - credit,
            Self::CreditNormal => credit - debit,
        }
    }
}

/// Balance of one account over every line posted to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Account currency.
    pub currency: CurrencyCode,
    /// Normal side.
    pub normal: NormalBalance,
    /// Total native debit magnitude.
    pub debit_total: Decimal,
    /// Total native credit magnitude.
    pub credit_total: Decimal,
    /// Native balance on the normal side.
    pub balance: Decimal,
    /// Number of lines counted.
    pub line_count: usize,
}

impl AccountBalance {
    /// Creates an empty balance for an account.
    #[must_use]
    pub fn new(account: &Account) -> Self {
        Self {
            account_id: account.id,
            currency: account.currency,
            normal: NormalBalance::of(account.nature),
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            balance: Decimal::ZERO,
            line_count: 0,
        }
    }

    /// Adds one line's native amount.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] when a running total overflows.
    pub fn add_line(&mut self, line: &Line) -> Result<(), LedgerError> {
        self.debit_total = accumulate(self.debit_total, line.native_debit(), self.account_id)?;
        self.credit_total = accumulate(self.credit_total, line.native_credit(), self.account_id)?;
        self.line_count += 1;
        self.balance = self.normal.present(self.debit_total, self.credit_total);
        Ok(())
    }
}

fn accumulate(
    total: Decimal,
    amount: Option<Decimal>,
    account_id: AccountId,
) -> Result<Decimal, LedgerError> {
    total
        .checked_add(amount.unwrap_or_default())
        .ok_or_else(|| LedgerError::validation(format!("balance of account {account_id} overflows")))
}

/// Computes an account's native balance.
///
/// # Errors
///
/// Returns [`LedgerError::AccountNotFound`] for an unknown account and
/// [`LedgerError::Validation`] when a total overflows.
pub fn account_balance<S: LedgerStore>(
    store: &S,
    account_id: AccountId,
) -> Result<AccountBalance, LedgerError> {
    let account = store
        .get_account(account_id)
        .map_err(|_| LedgerError::AccountNotFound(account_id))?;
    let mut balance = AccountBalance::new(&account);
    for line in store.lines_for_account(account_id) {
        balance.add_line(&line)?;
    }
    Ok(balance)
}

/// One account's booked totals in a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// The account ID.
    pub account_id: AccountId,
    /// Total booked debit magnitude.
    pub debit: Decimal,
    /// Total booked credit magnitude.
    pub credit: Decimal,
}

/// Booked totals per account for one ledger and base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Ledger summarized.
    pub ledger_id: LedgerId,
    /// Base currency of the entries included.
    pub base_currency: CurrencyCode,
    /// Rows in order of first appearance.
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of booked debits.
    pub total_debit: Decimal,
    /// Sum of booked credits.
    pub total_credit: Decimal,
}

impl TrialBalance {
    /// Whether debits equal credits. Always true for stored entries.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// Builds the trial balance of a ledger over entries booked in `base_currency`.
///
/// # Errors
///
/// Returns [`LedgerError::Store`] when an entry's lines cannot be read and
/// [`LedgerError::Validation`] when a total overflows.
pub fn trial_balance<S: LedgerStore>(
    store: &S,
    ledger_id: LedgerId,
    base_currency: CurrencyCode,
) -> Result<TrialBalance, LedgerError> {
    let mut rows: Vec<TrialBalanceRow> = Vec::new();
    let mut index: HashMap<AccountId, usize> = HashMap::new();

    let mut page = PageRequest::new(1, SCAN_PAGE_SIZE);
    loop {
        let batch = store.list_entries(ledger_id, page);
        for entry in batch.data.iter().filter(|e| e.base_currency == base_currency) {
            for line in store.lines_for_entry(entry.id)? {
                let slot = *index.entry(line.account_id).or_insert_with(|| {
                    rows.push(TrialBalanceRow {
                        account_id: line.account_id,
                        debit: Decimal::ZERO,
                        credit: Decimal::ZERO,
                    });
                    rows.len() - 1
                });
                let row = &mut rows[slot];
                row.debit = accumulate(row.debit, line.booked_debit(), line.account_id)?;
                row.credit = accumulate(row.credit, line.booked_credit(), line.account_id)?;
            }
        }
        if page.page >= batch.meta.total_pages {
            break;
        }
        page = PageRequest::new(page.page + 1, SCAN_PAGE_SIZE);
    }

    let total = |side: fn(&TrialBalanceRow) -> Decimal, name: &str| {
        rows.iter()
            .map(side)
            .try_fold(Decimal::ZERO, Decimal::checked_add)
            .ok_or_else(|| LedgerError::validation(format!("trial balance {name} total overflows")))
    };
    let total_debit = total(|r| r.debit, "debit")?;
    let total_credit = total(|r| r.credit, "credit")?;
    Ok(TrialBalance {
        ledger_id,
        base_currency,
        rows,
        total_debit,
        total_credit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::service::EntryBuilder;
    use crate::ledger::types::{CreateEntryInput, EntryStatus, LineSpec};
    use crate::currency::FxRate;
    use crate::store::{
        CategoryLink, Entry, EntryAggregate, InMemoryStore, ReconciliationLink, Rule,
        StatementLine, StoreError, StoreResult, UpsertOutcome,
    };
    use chrono::{DateTime, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tally_shared::types::{EntryId, OwnerId, PageResponse, RuleId, StatementLineId};

    #[rstest]
    #[case(AccountNature::Asset, dec!(100), dec!(30), dec!(70))]
    #[case(AccountNature::Expense, dec!(0), dec!(50), dec!(-50))]
    #[case(AccountNature::Liability, dec!(30), dec!(100), dec!(70))]
    #[case(AccountNature::Income, dec!(50), dec!(0), dec!(-50))]
    #[case(AccountNature::Equity, dec!(0), dec!(100), dec!(100))]
    fn test_normal_balance_presentation(
        #[case] nature: AccountNature,
        #[case] debit: Decimal,
        #[case] credit: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(NormalBalance::of(nature).present(debit, credit), expected);
    }

    #[test]
    fn test_balances_follow_posted_entries() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();
        let mxn = CurrencyCode::parse("MXN").unwrap();
        let food = store
            .create_account(Account::new(AccountId::new(), owner, "Food", AccountNature::Expense, mxn))
            .unwrap();
        let checking = store
            .create_account(Account::new(AccountId::new(), owner, "Checking", AccountNature::Asset, mxn))
            .unwrap();
        let ledger = LedgerId::new();
        let builder = EntryBuilder::new(&store);
        for amount in [dec!(250), dec!(120.50)] {
            builder
                .create(CreateEntryInput {
                    ledger_id: ledger,
                    booked_at: Utc::now(),
                    base_currency: "MXN".into(),
                    description: "Groceries".into(),
                    lines: vec![
                        LineSpec::debit(food.id, amount, "MXN"),
                        LineSpec::credit(checking.id, amount, "MXN"),
                    ],
                    external_id: None,
                    category_id: None,
                    status: EntryStatus::Posted,
                })
                .unwrap();
        }

        let food_balance = account_balance(&store, food.id).unwrap();
        assert_eq!(food_balance.balance, dec!(370.50));
        assert_eq!(food_balance.line_count, 2);
        let checking_balance = account_balance(&store, checking.id).unwrap();
        assert_eq!(checking_balance.balance, dec!(-370.50));

        let trial = trial_balance(&store, ledger, mxn).unwrap();
        assert_eq!(trial.rows.len(), 2);
        assert_eq!(trial.total_debit, dec!(370.50));
        assert!(trial.is_balanced());
    }

    /// Delegates to an in-memory store but cannot read any entry's lines.
    struct LinesUnavailable(InMemoryStore);

    impl LedgerStore for LinesUnavailable {
        fn create_account(&self, account: Account) -> StoreResult<Account> {
            self.0.create_account(account)
        }
        fn get_account(&self, id: AccountId) -> StoreResult<Account> {
            self.0.get_account(id)
        }
        fn list_accounts(&self, owner_id: OwnerId) -> Vec<Account> {
            self.0.list_accounts(owner_id)
        }
        fn create_entry(
            &self,
            entry: Entry,
            lines: Vec<Line>,
            category: Option<CategoryLink>,
        ) -> StoreResult<EntryAggregate> {
            self.0.create_entry(entry, lines, category)
        }
        fn get_entry(&self, id: EntryId) -> StoreResult<Entry> {
            self.0.get_entry(id)
        }
        fn get_entry_aggregate(&self, id: EntryId) -> StoreResult<EntryAggregate> {
            self.0.get_entry_aggregate(id)
        }
        fn find_entry_by_external_id(&self, ledger_id: LedgerId, external_id: &str) -> Option<Entry> {
            self.0.find_entry_by_external_id(ledger_id, external_id)
        }
        fn list_entries(&self, ledger_id: LedgerId, page: PageRequest) -> PageResponse<Entry> {
            self.0.list_entries(ledger_id, page)
        }
        fn lines_for_entry(&self, entry_id: EntryId) -> StoreResult<Vec<Line>> {
            Err(StoreError::not_found("entry", entry_id))
        }
        fn lines_for_account(&self, account_id: AccountId) -> Vec<Line> {
            self.0.lines_for_account(account_id)
        }
        fn assign_category(&self, link: CategoryLink) -> StoreResult<CategoryLink> {
            self.0.assign_category(link)
        }
        fn category_for_entry(&self, entry_id: EntryId) -> Option<CategoryLink> {
            self.0.category_for_entry(entry_id)
        }
        fn upsert_statement_line(&self, line: StatementLine) -> StoreResult<UpsertOutcome<StatementLine>> {
            self.0.upsert_statement_line(line)
        }
        fn get_statement_line(&self, id: StatementLineId) -> StoreResult<StatementLine> {
            self.0.get_statement_line(id)
        }
        fn list_statement_lines(&self, account_id: AccountId) -> Vec<StatementLine> {
            self.0.list_statement_lines(account_id)
        }
        fn create_rule(&self, rule: Rule) -> StoreResult<Rule> {
            self.0.create_rule(rule)
        }
        fn get_rule(&self, id: RuleId) -> StoreResult<Rule> {
            self.0.get_rule(id)
        }
        fn list_rules(&self, owner_id: OwnerId) -> Vec<Rule> {
            self.0.list_rules(owner_id)
        }
        fn set_rule_active(&self, id: RuleId, is_active: bool) -> StoreResult<Rule> {
            self.0.set_rule_active(id, is_active)
        }
        fn upsert_rate(&self, rate: FxRate) -> StoreResult<FxRate> {
            self.0.upsert_rate(rate)
        }
        fn get_rate(&self, base: CurrencyCode, quote: CurrencyCode, as_of: DateTime<Utc>) -> Option<FxRate> {
            self.0.get_rate(base, quote, as_of)
        }
        fn list_rates(&self, base: CurrencyCode, quote: CurrencyCode) -> Vec<FxRate> {
            self.0.list_rates(base, quote)
        }
        fn create_link(&self, link: ReconciliationLink) -> StoreResult<ReconciliationLink> {
            self.0.create_link(link)
        }
        fn link_for_statement_line(&self, id: StatementLineId) -> Option<ReconciliationLink> {
            self.0.link_for_statement_line(id)
        }
        fn link_for_entry(&self, id: EntryId) -> Option<ReconciliationLink> {
            self.0.link_for_entry(id)
        }
    }

    #[test]
    fn test_trial_balance_surfaces_store_errors() {
        let store = LinesUnavailable(InMemoryStore::new());
        let owner = OwnerId::new();
        let mxn = CurrencyCode::parse("MXN").unwrap();
        let open = |name: &str, nature| {
            store
                .create_account(Account::new(AccountId::new(), owner, name, nature, mxn))
                .unwrap()
                .id
        };
        let food = open("Food", AccountNature::Expense);
        let checking = open("Checking", AccountNature::Asset);
        let ledger = LedgerId::new();
        EntryBuilder::new(&store)
            .create(CreateEntryInput {
                ledger_id: ledger,
                booked_at: Utc::now(),
                base_currency: "MXN".into(),
                description: "Groceries".into(),
                lines: vec![
                    LineSpec::debit(food, dec!(90), "MXN"),
                    LineSpec::credit(checking, dec!(90), "MXN"),
                ],
                external_id: None,
                category_id: None,
                status: EntryStatus::Posted,
            })
            .unwrap();

        assert!(matches!(
            trial_balance(&store, ledger, mxn),
            Err(LedgerError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_unknown_account_balance() {
        let store = InMemoryStore::new();
        assert!(matches!(
            account_balance(&store, AccountId::new()),
            Err(LedgerError::AccountNotFound(_))
        ));
    }
}
