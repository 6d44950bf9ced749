//! Entities held by the repository store.
//!
//! Sign convention used throughout: debit amounts are positive, credit amounts
//! are negative. It applies to both native and booked amounts on lines.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    AccountId, CategoryId, CurrencyCode, EntryId, LedgerId, LineId, Money, OwnerId, RuleId,
    StatementLineId,
};

use crate::categorize::Matcher;

/// Nature of an account in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountNature {
    /// Things owned.
    Asset,
    /// Things owed.
    Liability,
    /// Earnings.
    Income,
    /// Spending.
    Expense,
    /// Owner's stake.
    Equity,
}

impl AccountNature {
    /// Asset and expense accounts grow with debits; the rest grow with credits.
    #[must_use]
    pub const fn is_debit_normal(self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }

    /// Returns the string representation of the nature.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Equity => "equity",
        }
    }
}

/// An account lines can be posted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Caller-assigned account id.
    pub id: AccountId,
    /// Owner of the account.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Account nature.
    pub nature: AccountNature,
    /// Currency of every line posted to this account. Fixed at creation.
    pub currency: CurrencyCode,
    /// Inactive accounts reject new postings.
    pub is_active: bool,
}

impl Account {
    /// Creates an active account.
    #[must_use]
    pub fn new(
        id: AccountId,
        owner_id: OwnerId,
        name: impl Into<String>,
        nature: AccountNature,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            id,
            owner_id,
            name: name.into(),
            nature,
            currency,
            is_active: true,
        }
    }
}

/// Debit or credit side of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Debit (positive).
    Debit,
    /// Credit (negative).
    Credit,
}

impl Direction {
    /// `1` for debits, `-1` for credits.
    #[must_use]
    pub const fn sign(self) -> Decimal {
        match self {
            Self::Debit => Decimal::ONE,
            Self::Credit => Decimal::NEGATIVE_ONE,
        }
    }

    /// Applies the sign convention to a magnitude.
    #[must_use]
    pub fn signed(self, magnitude: Decimal) -> Decimal {
        magnitude.abs() * self.sign()
    }

    /// True if `amount` carries the sign this direction requires (zero never does).
    #[must_use]
    pub fn agrees_with(self, amount: Decimal) -> bool {
        match self {
            Self::Debit => amount > Decimal::ZERO,
            Self::Credit => amount < Decimal::ZERO,
        }
    }

    /// Returns the string representation of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry status.
///
/// Valid transitions: Draft → Reconciled, Posted → Reconciled. Nothing leaves Reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Recorded but not yet confirmed.
    Draft,
    /// Confirmed by the user.
    Posted,
    /// Matched against a statement line.
    Reconciled,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reconciled => "reconciled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "posted" => Some(Self::Posted),
            "reconciled" => Some(Self::Reconciled),
            _ => None,
        }
    }

    /// Returns true if the status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft | Self::Posted, Self::Reconciled)
        )
    }

    /// Returns true if the entry is already reconciled.
    #[must_use]
    pub const fn is_reconciled(self) -> bool {
        matches!(self, Self::Reconciled)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header of a balanced journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry id.
    pub id: EntryId,
    /// Ledger the entry belongs to.
    pub ledger_id: LedgerId,
    /// Caller-supplied idempotency key, unique per ledger.
    pub external_id: Option<String>,
    /// Booking instant; also the FX lookup instant.
    pub booked_at: DateTime<Utc>,
    /// Free-text description.
    pub description: String,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Currency all booked amounts are expressed in.
    pub base_currency: CurrencyCode,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// One leg of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Line id.
    pub id: LineId,
    /// Owning entry.
    pub entry_id: EntryId,
    /// Account posted to.
    pub account_id: AccountId,
    /// Debit or credit.
    pub direction: Direction,
    /// Signed amount in the account's currency.
    pub native: Money,
    /// Signed amount in the entry's base currency.
    pub booked: Money,
    /// Base units per native unit applied to get `booked` from `native`.
    pub fx_rate: Decimal,
}

impl Line {
    /// Native debit magnitude, if this is a debit line.
    #[must_use]
    pub fn native_debit(&self) -> Option<Decimal> {
        (self.direction == Direction::Debit).then(|| self.native.amount.abs())
    }

    /// Native credit magnitude, if this is a credit line.
    #[must_use]
    pub fn native_credit(&self) -> Option<Decimal> {
        (self.direction == Direction::Credit).then(|| self.native.amount.abs())
    }

    /// Booked debit magnitude, if this is a debit line.
    #[must_use]
    pub fn booked_debit(&self) -> Option<Decimal> {
        (self.direction == Direction::Debit).then(|| self.booked.amount.abs())
    }

    /// Booked credit magnitude, if this is a credit line.
    #[must_use]
    pub fn booked_credit(&self) -> Option<Decimal> {
        (self.direction == Direction::Credit).then(|| self.booked.amount.abs())
    }
}

/// Where an entry's category came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorySource {
    /// Supplied by the caller when the entry was created.
    Manual,
    /// Assigned by a matching rule.
    Rule,
    /// Suggested by the keyword agent and accepted.
    Agent,
}

/// Category attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    /// Categorized entry.
    pub entry_id: EntryId,
    /// Assigned category.
    pub category_id: CategoryId,
    /// Origin of the assignment.
    pub source: CategorySource,
    /// Confidence in `[0, 1]`.
    pub confidence: Decimal,
    /// Rule that produced the assignment, if any.
    pub rule_id: Option<RuleId>,
}

impl CategoryLink {
    /// A caller-supplied category with full confidence.
    #[must_use]
    pub fn manual(entry_id: EntryId, category_id: CategoryId) -> Self {
        Self {
            entry_id,
            category_id,
            source: CategorySource::Manual,
            confidence: Decimal::ONE,
            rule_id: None,
        }
    }
}

/// An entry together with its lines and category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAggregate {
    /// Entry header.
    pub entry: Entry,
    /// All lines, in creation order.
    pub lines: Vec<Line>,
    /// Category link, if any.
    pub category: Option<CategoryLink>,
}

impl EntryAggregate {
    /// Sum of booked debit magnitudes.
    #[must_use]
    pub fn total_debit(&self) -> Decimal {
        self.lines.iter().filter_map(Line::booked_debit).sum()
    }

    /// Sum of signed booked amounts. Zero for every stored entry.
    #[must_use]
    pub fn booked_sum(&self) -> Decimal {
        self.lines.iter().map(|l| l.booked.amount).sum()
    }
}

/// A line from an externally sourced account statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Statement line id.
    pub id: StatementLineId,
    /// Account the statement belongs to.
    pub account_id: AccountId,
    /// When the bank posted the movement.
    pub posted_at: DateTime<Utc>,
    /// Signed amount from the account's point of view (inflow positive).
    pub amount: Decimal,
    /// Currency of `amount`; always the account's currency.
    pub currency: CurrencyCode,
    /// Bank memo, possibly empty.
    pub memo: String,
    /// Unique per account. Either from the file or derived from the row content.
    pub external_id: String,
}

/// What a rule does when it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    /// Category to assign.
    pub category_id: CategoryId,
    /// Confidence in `[0, 1]`; full confidence when absent.
    pub confidence: Option<Decimal>,
}

impl RuleAction {
    /// Confidence with the default applied.
    #[must_use]
    pub fn effective_confidence(&self) -> Decimal {
        self.confidence.unwrap_or(Decimal::ONE)
    }
}

/// A categorization rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule id.
    pub id: RuleId,
    /// Owner whose entries the rule applies to.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Inactive rules are skipped.
    pub is_active: bool,
    /// Higher runs first.
    pub priority: i32,
    /// Condition tree.
    pub matcher: Matcher,
    /// Effect on match.
    pub action: RuleAction,
}

/// Link between an entry and the statement line that settles it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLink {
    /// Reconciled entry.
    pub entry_id: EntryId,
    /// The line of the entry that matched.
    pub line_id: LineId,
    /// Matched statement line.
    pub statement_line_id: StatementLineId,
    /// True when linked by a user rather than the automatic pass.
    pub manual: bool,
    /// When the link was made.
    pub linked_at: DateTime<Utc>,
}
