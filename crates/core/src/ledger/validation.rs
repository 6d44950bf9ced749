//! Business rule validation for entry building.
//!
//! Pure functions: account and rate data come in through arguments so the
//! rules can be tested without a store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{CurrencyCode, Money};

use super::error::LedgerError;
use super::types::{CreateEntryInput, EntryStatus, LineSpec, ResolvedLine, EntryTotals};
use crate::currency::{convert_booked, FxError};
use crate::store::validate::{MAX_EXTERNAL_ID_LEN, MAX_TEXT_LEN};
use crate::store::Account;

/// Parses a currency code, turning a bad code into a validation message.
pub(crate) fn parse_currency(field: &str, raw: &str) -> Result<CurrencyCode, String> {
    CurrencyCode::parse(raw).map_err(|e| format!("{field}: {e}"))
}

/// Checks the entry header and line count, collecting every violation.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] listing every problem found.
pub fn validate_header(input: &CreateEntryInput) -> Result<CurrencyCode, LedgerError> {
    let mut violations = Vec::new();

    if input.lines.len() < 2 {
        violations.push(format!(
            "entry needs at least 2 lines, got {}",
            input.lines.len()
        ));
    }
    if input.status == EntryStatus::Reconciled {
        violations.push("new entries cannot start reconciled".to_string());
    }
    if input.description.chars().count() > MAX_TEXT_LEN {
        violations.push(format!("description must be at most {MAX_TEXT_LEN} characters"));
    }
    if let Some(external_id) = &input.external_id {
        if external_id.trim().is_empty() {
            violations.push("external id must not be empty".to_string());
        } else if external_id.chars().count() > MAX_EXTERNAL_ID_LEN {
            violations.push(format!(
                "external id must be at most {MAX_EXTERNAL_ID_LEN} characters"
            ));
        }
    }
    let base = parse_currency("base currency", &input.base_currency);
    if let Err(msg) = &base {
        violations.push(msg.clone());
    }

    match base {
        Ok(base) if violations.is_empty() => Ok(base),
        _ => Err(LedgerError::Validation(violations)),
    }
}

/// Resolves one line against its account and the rate table.
///
/// `line_no` is 1-based and only used in error messages. `lookup_rate(base,
/// quote, as_of)` is consulted only for a cross-currency line that carries
/// neither an explicit rate nor an explicit base amount.
///
/// # Errors
///
/// Returns the first rule the line breaks.
pub fn resolve_line<F>(
    line_no: usize,
    spec: &LineSpec,
    account: &Account,
    base: CurrencyCode,
    booked_at: DateTime<Utc>,
    lookup_rate: F,
) -> Result<ResolvedLine, LedgerError>
where
    F: Fn(CurrencyCode, CurrencyCode, DateTime<Utc>) -> Result<Decimal, FxError>,
{
    // 1. Normalize currency codes, reject zero amounts and unusable accounts
    let native_currency = parse_currency(&format!("line {line_no} native currency"), &spec.native_currency)
        .map_err(LedgerError::validation)?;
    if spec.native_amount.is_zero() {
        return Err(LedgerError::validation(format!(
            "line {line_no} has a zero native amount"
        )));
    }
    if !account.is_active {
        return Err(LedgerError::validation(format!(
            "line {line_no}: account {} is inactive",
            account.id
        )));
    }
    if native_currency != account.currency {
        return Err(LedgerError::CurrencyMismatch {
            line: line_no,
            account_id: account.id,
            account_currency: account.currency,
            native_currency,
        });
    }
    let magnitude = spec.native_amount.abs();

    // 2. Resolve the fx rate
    let fx_rate = if native_currency == base {
        Decimal::ONE
    } else if let Some(rate) = spec.fx_rate {
        if rate <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "line {line_no} fx rate must be positive, got {rate}"
            )));
        }
        rate
    } else if let Some(explicit) = spec.base_amount {
        // Implied by the explicit base amount; no table lookup.
        explicit.abs().checked_div(magnitude).ok_or_else(|| {
            LedgerError::validation(format!("line {line_no} implied fx rate overflows"))
        })?
    } else {
        lookup_rate(base, native_currency, booked_at)?
    };

    // 3. Signed base amount
    let booked = match spec.base_amount {
        Some(explicit) => explicit,
        None => convert_booked(magnitude, fx_rate)
            .map(|converted| spec.direction.signed(converted))
            .ok_or_else(|| {
                LedgerError::validation(format!("line {line_no} booked amount overflows"))
            })?,
    };

    // 4. Sign must follow direction
    if !spec.direction.agrees_with(booked) {
        return Err(LedgerError::Direction {
            line: line_no,
            direction: spec.direction,
            booked,
        });
    }

    // 5. Explicit base currency must be the entry's
    if let Some(raw) = &spec.base_currency {
        let line_currency = parse_currency(&format!("line {line_no} base currency"), raw)
            .map_err(LedgerError::validation)?;
        if line_currency != base {
            return Err(LedgerError::BaseCurrency {
                line: line_no,
                line_currency,
                entry_currency: base,
            });
        }
    }

    Ok(ResolvedLine {
        account_id: account.id,
        direction: spec.direction,
        native: Money::new(spec.direction.signed(magnitude), native_currency),
        booked: Money::new(booked, base),
        fx_rate,
    })
}

/// Adds magnitudes, naming the side that overflowed.
fn checked_total(side: &str, mut amounts: impl Iterator<Item = Decimal>) -> Result<Decimal, LedgerError> {
    amounts
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or_else(|| LedgerError::validation(format!("booked {side} total overflows")))
}

/// Calculate entry totals from resolved lines.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] when either side's total overflows.
pub fn calculate_totals(lines: &[ResolvedLine]) -> Result<EntryTotals, LedgerError> {
    let booked_debit = checked_total(
        "debit",
        lines
            .iter()
            .filter(|l| l.booked.amount > Decimal::ZERO)
            .map(|l| l.booked.amount),
    )?;
    let booked_credit = checked_total(
        "credit",
        lines
            .iter()
            .filter(|l| l.booked.amount < Decimal::ZERO)
            .map(|l| -l.booked.amount),
    )?;
    Ok(EntryTotals::new(booked_debit, booked_credit))
}

/// Validates that resolved lines sum to exactly zero.
///
/// # Errors
///
/// Returns [`LedgerError::Unbalanced`] with both sides' totals, or
/// [`LedgerError::Validation`] when a total overflows.
pub fn validate_balance(lines: &[ResolvedLine]) -> Result<EntryTotals, LedgerError> {
    let totals = calculate_totals(lines)?;
    if !totals.is_balanced {
        return Err(LedgerError::Unbalanced {
            debit: totals.booked_debit,
            credit: totals.booked_credit,
        });
    }
    Ok(totals)
}
