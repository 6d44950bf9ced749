//! The storage contract every backing store implements.
//!
//! The in-memory store is the reference implementation. A durable store must
//! keep the same guarantees under concurrent callers:
//! - `create_entry` writes the entry, its lines and category link all-or-nothing,
//!   and rejects a second entry with the same (ledger, external id);
//! - `upsert_statement_line` is atomic on (account, external id);
//! - `create_link` checks both sides are unlinked and moves the entry to
//!   reconciled in the same write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    AccountId, CurrencyCode, EntryId, LedgerId, OwnerId, PageRequest, PageResponse, RuleId,
    StatementLineId,
};

use super::error::StoreResult;
use super::models::{
    Account, CategoryLink, Entry, EntryAggregate, Line, ReconciliationLink, Rule,
    StatementLine,
};
use crate::currency::FxRate;

/// Outcome of an idempotent upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "record", rename_all = "lowercase")]
pub enum UpsertOutcome<T> {
    /// The record was new and has been stored.
    Inserted(T),
    /// A record with the same key already existed; it is returned unchanged.
    Duplicate(T),
}

impl<T> UpsertOutcome<T> {
    /// True for [`UpsertOutcome::Inserted`].
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }

    /// The stored record, whichever way it got there.
    pub fn into_inner(self) -> T {
        match self {
            Self::Inserted(record) | Self::Duplicate(record) => record,
        }
    }
}

/// Capability contract for ledger storage.
///
/// All methods take `&self`; implementations provide their own synchronization.
pub trait LedgerStore {
    // ----- accounts -----

    /// Stores a new account. Rejects id collisions.
    fn create_account(&self, account: Account) -> StoreResult<Account>;

    /// Fetches an account.
    fn get_account(&self, id: AccountId) -> StoreResult<Account>;

    /// Lists an owner's accounts in creation order.
    fn list_accounts(&self, owner_id: OwnerId) -> Vec<Account>;

    // ----- entries -----

    /// Atomically stores an entry, its lines and an optional category link.
    ///
    /// Fails with a duplicate error if the entry id or (ledger, external id) is taken.
    fn create_entry(
        &self,
        entry: Entry,
        lines: Vec<Line>,
        category: Option<CategoryLink>,
    ) -> StoreResult<EntryAggregate>;

    /// Fetches an entry header.
    fn get_entry(&self, id: EntryId) -> StoreResult<Entry>;

    /// Fetches an entry with its lines and category.
    fn get_entry_aggregate(&self, id: EntryId) -> StoreResult<EntryAggregate>;

    /// Looks up an entry by its idempotency key.
    fn find_entry_by_external_id(&self, ledger_id: LedgerId, external_id: &str) -> Option<Entry>;

    /// Lists a ledger's entries in creation order.
    fn list_entries(&self, ledger_id: LedgerId, page: PageRequest) -> PageResponse<Entry>;

    /// Lines of an entry in creation order.
    fn lines_for_entry(&self, entry_id: EntryId) -> StoreResult<Vec<Line>>;

    /// Every line posted to an account, in creation order.
    fn lines_for_account(&self, account_id: AccountId) -> Vec<Line>;

    // ----- categories -----

    /// Sets (or replaces) the category of an existing entry.
    fn assign_category(&self, link: CategoryLink) -> StoreResult<CategoryLink>;

    /// Category of an entry, if any.
    fn category_for_entry(&self, entry_id: EntryId) -> Option<CategoryLink>;

    // ----- statement lines -----

    /// Inserts a statement line unless (account, external id) already exists.
    fn upsert_statement_line(
        &self,
        line: StatementLine,
    ) -> StoreResult<UpsertOutcome<StatementLine>>;

    /// Fetches a statement line.
    fn get_statement_line(&self, id: StatementLineId) -> StoreResult<StatementLine>;

    /// Lists an account's statement lines in insertion order.
    fn list_statement_lines(&self, account_id: AccountId) -> Vec<StatementLine>;

    // ----- rules -----

    /// Stores a new rule. Rejects id collisions.
    fn create_rule(&self, rule: Rule) -> StoreResult<Rule>;

    /// Fetches a rule.
    fn get_rule(&self, id: RuleId) -> StoreResult<Rule>;

    /// Lists an owner's rules in creation order.
    fn list_rules(&self, owner_id: OwnerId) -> Vec<Rule>;

    /// Activates or deactivates a rule.
    fn set_rule_active(&self, id: RuleId, is_active: bool) -> StoreResult<Rule>;

    // ----- rates -----

    /// Stores a rate snapshot, replacing any snapshot with the same exact key.
    fn upsert_rate(&self, rate: FxRate) -> StoreResult<FxRate>;

    /// Exact-key rate lookup.
    fn get_rate(
        &self,
        base: CurrencyCode,
        quote: CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Option<FxRate>;

    /// Every snapshot for a pair, oldest first.
    fn list_rates(&self, base: CurrencyCode, quote: CurrencyCode) -> Vec<FxRate>;

    // ----- reconciliation -----

    /// Stores a link and marks its entry reconciled in one step.
    fn create_link(&self, link: ReconciliationLink) -> StoreResult<ReconciliationLink>;

    /// Link holding a statement line, if any.
    fn link_for_statement_line(&self, id: StatementLineId) -> Option<ReconciliationLink>;

    /// Link holding an entry, if any.
    fn link_for_entry(&self, id: EntryId) -> Option<ReconciliationLink>;
}
