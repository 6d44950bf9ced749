//! Ledger domain types for entry creation and validation.
//!
//! Sign convention: debit amounts are positive, credit amounts are negative.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CategoryId, LedgerId, Money};

pub use crate::store::{Direction, EntryAggregate as BuiltEntry, EntryStatus};

/// Input for a single line of an entry.
///
/// The builder resolves the fx rate and booked amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSpec {
    /// The account to post to.
    pub account_id: AccountId,
    /// Amount in the account's currency. Only the magnitude is used; the sign
    /// comes from `direction`.
    pub native_amount: Decimal,
    /// Currency code of `native_amount`; normalized before use.
    pub native_currency: String,
    /// Debit or credit.
    pub direction: Direction,
    /// Explicit signed amount in the entry's base currency, used verbatim.
    #[serde(default)]
    pub base_amount: Option<Decimal>,
    /// Currency of `base_amount`; must equal the entry's base currency when given.
    #[serde(default)]
    pub base_currency: Option<String>,
    /// Explicit base units per native unit.
    #[serde(default)]
    pub fx_rate: Option<Decimal>,
}

impl LineSpec {
    /// A line with no explicit conversion data.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        direction: Direction,
        native_amount: Decimal,
        native_currency: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            native_amount,
            native_currency: native_currency.into(),
            direction,
            base_amount: None,
            base_currency: None,
            fx_rate: None,
        }
    }

    /// Shorthand for a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal, currency: impl Into<String>) -> Self {
        Self::new(account_id, Direction::Debit, amount, currency)
    }

    /// Shorthand for a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal, currency: impl Into<String>) -> Self {
        Self::new(account_id, Direction::Credit, amount, currency)
    }

    /// Sets an explicit fx rate.
    #[must_use]
    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.fx_rate = Some(rate);
        self
    }

    /// Sets an explicit signed base amount and, optionally, its currency.
    #[must_use]
    pub fn with_base(mut self, amount: Decimal, currency: Option<&str>) -> Self {
        self.base_amount = Some(amount);
        self.base_currency = currency.map(str::to_string);
        self
    }
}

/// Input for creating a new entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryInput {
    /// Ledger the entry belongs to.
    pub ledger_id: LedgerId,
    /// Booking instant; also the fx lookup instant.
    pub booked_at: DateTime<Utc>,
    /// Currency every booked amount is expressed in.
    pub base_currency: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// The lines (must have at least 2).
    pub lines: Vec<LineSpec>,
    /// Idempotency key, unique per ledger.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Category to attach as a manual assignment.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Initial status: draft or posted.
    pub status: EntryStatus,
}

/// A line after currency resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLine {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit or credit.
    pub direction: Direction,
    /// Signed native amount in the account's currency.
    pub native: Money,
    /// Signed amount in the entry's base currency.
    pub booked: Money,
    /// Rate applied to get `booked` from `native`.
    pub fx_rate: Decimal,
}

/// Entry totals in the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of booked debit magnitudes.
    pub booked_debit: Decimal,
    /// Sum of booked credit magnitudes.
    pub booked_credit: Decimal,
    /// Whether the signed booked amounts sum to exactly zero.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit magnitudes.
    #[must_use]
    pub fn new(booked_debit: Decimal, booked_credit: Decimal) -> Self {
        Self {
            booked_debit,
            booked_credit,
            is_balanced: booked_debit == booked_credit,
        }
    }

    /// Signed sum of booked amounts (debits minus credits).
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.booked_debit - self.booked_credit
    }
}
