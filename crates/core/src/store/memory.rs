//! In-memory reference implementation of [`LedgerStore`].
//!
//! All collections sit behind one lock, so every write that touches several of
//! them (entry + lines + category, link + entry status) is atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tally_shared::types::{
    AccountId, CurrencyCode, EntryId, LedgerId, LineId, OwnerId, PageRequest, PageResponse,
    RuleId, StatementLineId,
};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::models::{
    Account, CategoryLink, Entry, EntryAggregate, EntryStatus, Line, ReconciliationLink, Rule,
    StatementLine,
};
use super::repository::{LedgerStore, UpsertOutcome};
use super::validate::{entry_violations, reject_if_any, Validate};
use crate::currency::FxRate;

type RateKey = (CurrencyCode, CurrencyCode, DateTime<Utc>);

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    accounts_by_owner: HashMap<OwnerId, Vec<AccountId>>,

    entries: HashMap<EntryId, Entry>,
    entries_by_ledger: HashMap<LedgerId, Vec<EntryId>>,
    entries_by_external_id: HashMap<(LedgerId, String), EntryId>,

    lines: HashMap<LineId, Line>,
    lines_by_entry: HashMap<EntryId, Vec<LineId>>,
    lines_by_account: HashMap<AccountId, Vec<LineId>>,

    categories: HashMap<EntryId, CategoryLink>,

    statement_lines: HashMap<StatementLineId, StatementLine>,
    statements_by_account: HashMap<AccountId, Vec<StatementLineId>>,
    statements_by_external_id: HashMap<(AccountId, String), StatementLineId>,

    rules: HashMap<RuleId, Rule>,
    rules_by_owner: HashMap<OwnerId, Vec<RuleId>>,

    rates: BTreeMap<RateKey, FxRate>,

    links_by_statement: HashMap<StatementLineId, ReconciliationLink>,
    links_by_entry: HashMap<EntryId, StatementLineId>,
}

impl Tables {
    fn entry(&self, id: EntryId) -> StoreResult<&Entry> {
        self.entries
            .get(&id)
            .ok_or_else(|| StoreError::not_found("entry", id))
    }

    fn lines_of(&self, entry_id: EntryId) -> Vec<Line> {
        self.lines_by_entry
            .get(&entry_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.lines.get(id).cloned())
            .collect()
    }

    fn aggregate(&self, entry_id: EntryId) -> StoreResult<EntryAggregate> {
        let entry = self.entry(entry_id)?.clone();
        Ok(EntryAggregate {
            lines: self.lines_of(entry_id),
            category: self.categories.get(&entry_id).cloned(),
            entry,
        })
    }
}

/// Indexed, invariant-enforcing in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Writes validate before mutating, so a poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored entries across all ledgers.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.read().entries.len()
    }

    /// Number of stored statement lines across all accounts.
    #[must_use]
    pub fn statement_line_count(&self) -> usize {
        self.read().statement_lines.len()
    }
}

impl LedgerStore for InMemoryStore {
    fn create_account(&self, account: Account) -> StoreResult<Account> {
        account.ensure_valid()?;
        let mut t = self.write();
        if t.accounts.contains_key(&account.id) {
            return Err(StoreError::duplicate("account", account.id));
        }
        t.accounts_by_owner
            .entry(account.owner_id)
            .or_default()
            .push(account.id);
        t.accounts.insert(account.id, account.clone());
        debug!(account_id = %account.id, currency = %account.currency, "account stored");
        Ok(account)
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Account> {
        self.read()
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    fn list_accounts(&self, owner_id: OwnerId) -> Vec<Account> {
        let t = self.read();
        t.accounts_by_owner
            .get(&owner_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.accounts.get(id).cloned())
            .collect()
    }

    fn create_entry(
        &self,
        entry: Entry,
        lines: Vec<Line>,
        category: Option<CategoryLink>,
    ) -> StoreResult<EntryAggregate> {
        let mut violations = entry_violations(&entry, &lines);
        if let Some(link) = &category {
            if link.entry_id != entry.id {
                violations.push("category link belongs to another entry".to_string());
            }
            violations.extend(link.violations());
        }

        let mut t = self.write();

        // Account checks need the lock; they are part of the same atomic write.
        for (idx, line) in lines.iter().enumerate() {
            let account = t
                .accounts
                .get(&line.account_id)
                .ok_or_else(|| StoreError::not_found("account", line.account_id))?;
            if account.currency != line.native.currency {
                violations.push(format!(
                    "line {} native currency {} differs from account currency {}",
                    idx + 1,
                    line.native.currency,
                    account.currency
                ));
            }
        }
        reject_if_any("entry", violations)?;

        if t.entries.contains_key(&entry.id) {
            return Err(StoreError::duplicate("entry", entry.id));
        }
        if let Some(external_id) = &entry.external_id
            && t
                .entries_by_external_id
                .contains_key(&(entry.ledger_id, external_id.clone()))
        {
            return Err(StoreError::duplicate(
                "entry",
                format!("ledger {} external id {external_id}", entry.ledger_id),
            ));
        }
        if let Some(line) = lines.iter().find(|l| t.lines.contains_key(&l.id)) {
            return Err(StoreError::duplicate("line", line.id));
        }

        // Every check passed; nothing below can fail.
        if let Some(external_id) = &entry.external_id {
            t.entries_by_external_id
                .insert((entry.ledger_id, external_id.clone()), entry.id);
        }
        t.entries_by_ledger
            .entry(entry.ledger_id)
            .or_default()
            .push(entry.id);
        let line_ids: Vec<LineId> = lines.iter().map(|l| l.id).collect();
        for line in &lines {
            t.lines_by_account
                .entry(line.account_id)
                .or_default()
                .push(line.id);
            t.lines.insert(line.id, line.clone());
        }
        t.lines_by_entry.insert(entry.id, line_ids);
        if let Some(link) = &category {
            t.categories.insert(entry.id, link.clone());
        }
        t.entries.insert(entry.id, entry.clone());

        debug!(entry_id = %entry.id, lines = lines.len(), "entry stored");
        Ok(EntryAggregate {
            entry,
            lines,
            category,
        })
    }

    fn get_entry(&self, id: EntryId) -> StoreResult<Entry> {
        self.read().entry(id).cloned()
    }

    fn get_entry_aggregate(&self, id: EntryId) -> StoreResult<EntryAggregate> {
        self.read().aggregate(id)
    }

    fn find_entry_by_external_id(&self, ledger_id: LedgerId, external_id: &str) -> Option<Entry> {
        let t = self.read();
        t.entries_by_external_id
            .get(&(ledger_id, external_id.to_string()))
            .and_then(|id| t.entries.get(id).cloned())
    }

    fn list_entries(&self, ledger_id: LedgerId, page: PageRequest) -> PageResponse<Entry> {
        let t = self.read();
        let entries: Vec<Entry> = t
            .entries_by_ledger
            .get(&ledger_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.entries.get(id).cloned())
            .collect();
        page.paginate(entries)
    }

    fn lines_for_entry(&self, entry_id: EntryId) -> StoreResult<Vec<Line>> {
        let t = self.read();
        t.entry(entry_id)?;
        Ok(t.lines_of(entry_id))
    }

    fn lines_for_account(&self, account_id: AccountId) -> Vec<Line> {
        let t = self.read();
        t.lines_by_account
            .get(&account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.lines.get(id).cloned())
            .collect()
    }

    fn assign_category(&self, link: CategoryLink) -> StoreResult<CategoryLink> {
        link.ensure_valid()?;
        let mut t = self.write();
        t.entry(link.entry_id)?;
        t.categories.insert(link.entry_id, link.clone());
        Ok(link)
    }

    fn category_for_entry(&self, entry_id: EntryId) -> Option<CategoryLink> {
        self.read().categories.get(&entry_id).cloned()
    }

    fn upsert_statement_line(
        &self,
        line: StatementLine,
    ) -> StoreResult<UpsertOutcome<StatementLine>> {
        line.ensure_valid()?;
        let mut t = self.write();
        let account = t
            .accounts
            .get(&line.account_id)
            .ok_or_else(|| StoreError::not_found("account", line.account_id))?;
        if account.currency != line.currency {
            return Err(StoreError::Validation {
                entity: "statement line",
                violations: vec![format!(
                    "currency {} differs from account currency {}",
                    line.currency, account.currency
                )],
            });
        }

        let key = (line.account_id, line.external_id.clone());
        if let Some(existing) = t
            .statements_by_external_id
            .get(&key)
            .and_then(|id| t.statement_lines.get(id))
        {
            return Ok(UpsertOutcome::Duplicate(existing.clone()));
        }
        if t.statement_lines.contains_key(&line.id) {
            return Err(StoreError::duplicate("statement line", line.id));
        }

        t.statements_by_external_id.insert(key, line.id);
        t.statements_by_account
            .entry(line.account_id)
            .or_default()
            .push(line.id);
        t.statement_lines.insert(line.id, line.clone());
        Ok(UpsertOutcome::Inserted(line))
    }

    fn get_statement_line(&self, id: StatementLineId) -> StoreResult<StatementLine> {
        self.read()
            .statement_lines
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("statement line", id))
    }

    fn list_statement_lines(&self, account_id: AccountId) -> Vec<StatementLine> {
        let t = self.read();
        t.statements_by_account
            .get(&account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.statement_lines.get(id).cloned())
            .collect()
    }

    fn create_rule(&self, rule: Rule) -> StoreResult<Rule> {
        rule.ensure_valid()?;
        let mut t = self.write();
        if t.rules.contains_key(&rule.id) {
            return Err(StoreError::duplicate("rule", rule.id));
        }
        t.rules_by_owner.entry(rule.owner_id).or_default().push(rule.id);
        t.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    fn get_rule(&self, id: RuleId) -> StoreResult<Rule> {
        self.read()
            .rules
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("rule", id))
    }

    fn list_rules(&self, owner_id: OwnerId) -> Vec<Rule> {
        let t = self.read();
        t.rules_by_owner
            .get(&owner_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.rules.get(id).cloned())
            .collect()
    }

    fn set_rule_active(&self, id: RuleId, is_active: bool) -> StoreResult<Rule> {
        let mut t = self.write();
        let rule = t
            .rules
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("rule", id))?;
        rule.is_active = is_active;
        Ok(rule.clone())
    }

    fn upsert_rate(&self, rate: FxRate) -> StoreResult<FxRate> {
        rate.ensure_valid()?;
        self.write()
            .rates
            .insert((rate.base, rate.quote, rate.as_of), rate.clone());
        Ok(rate)
    }

    fn get_rate(
        &self,
        base: CurrencyCode,
        quote: CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Option<FxRate> {
        self.read().rates.get(&(base, quote, as_of)).cloned()
    }

    fn list_rates(&self, base: CurrencyCode, quote: CurrencyCode) -> Vec<FxRate> {
        self.read()
            .rates
            .range((base, quote, DateTime::<Utc>::MIN_UTC)..=(base, quote, DateTime::<Utc>::MAX_UTC))
            .map(|(_, rate)| rate.clone())
            .collect()
    }

    fn create_link(&self, link: ReconciliationLink) -> StoreResult<ReconciliationLink> {
        let mut t = self.write();
        let statement = t
            .statement_lines
            .get(&link.statement_line_id)
            .ok_or_else(|| StoreError::not_found("statement line", link.statement_line_id))?;
        let line = t
            .lines
            .get(&link.line_id)
            .ok_or_else(|| StoreError::not_found("line", link.line_id))?;

        let mut violations = Vec::new();
        if line.entry_id != link.entry_id {
            violations.push(format!("line {} does not belong to entry {}", line.id, link.entry_id));
        }
        if line.account_id != statement.account_id {
            violations.push(format!(
                "line account {} differs from statement account {}",
                line.account_id, statement.account_id
            ));
        }
        reject_if_any("reconciliation link", violations)?;

        let status = t.entry(link.entry_id)?.status;
        if !status.can_transition_to(EntryStatus::Reconciled) {
            return Err(StoreError::InvalidTransition {
                from: status,
                to: EntryStatus::Reconciled,
            });
        }
        if t.links_by_entry.contains_key(&link.entry_id) {
            return Err(StoreError::duplicate("reconciliation link", link.entry_id));
        }
        if t.links_by_statement.contains_key(&link.statement_line_id) {
            return Err(StoreError::duplicate(
                "reconciliation link",
                link.statement_line_id,
            ));
        }

        if let Some(entry) = t.entries.get_mut(&link.entry_id) {
            entry.status = EntryStatus::Reconciled;
        }
        t.links_by_entry
            .insert(link.entry_id, link.statement_line_id);
        t.links_by_statement
            .insert(link.statement_line_id, link.clone());
        Ok(link)
    }

    fn link_for_statement_line(&self, id: StatementLineId) -> Option<ReconciliationLink> {
        self.read().links_by_statement.get(&id).cloned()
    }

    fn link_for_entry(&self, id: EntryId) -> Option<ReconciliationLink> {
        let t = self.read();
        t.links_by_entry
            .get(&id)
            .and_then(|statement_id| t.links_by_statement.get(statement_id).cloned())
    }
}
