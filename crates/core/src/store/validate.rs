//! Shape validation for entities entering the store.
//!
//! Each check collects every violation so callers can fix input in one pass.

use rust_decimal::Decimal;

use super::error::{StoreError, StoreResult};
use super::models::{
    Account, CategoryLink, Entry, EntryStatus, Line, Rule, StatementLine,
};
use crate::currency::FxRate;

/// Maximum length of names.
pub const MAX_NAME_LEN: usize = 200;
/// Maximum length of entry descriptions and statement memos.
pub const MAX_TEXT_LEN: usize = 1_000;
/// Maximum length of external ids.
pub const MAX_EXTERNAL_ID_LEN: usize = 255;

/// An entity that can list what is wrong with it.
pub trait Validate {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Every violation found; empty when valid.
    fn violations(&self) -> Vec<String>;

    /// Fails with [`StoreError::Validation`] if any violation was found.
    fn ensure_valid(&self) -> StoreResult<()> {
        reject_if_any(Self::ENTITY, self.violations())
    }
}

pub(crate) fn reject_if_any(entity: &'static str, violations: Vec<String>) -> StoreResult<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation { entity, violations })
    }
}

fn check_text(out: &mut Vec<String>, field: &str, value: &str, max: usize, required: bool) {
    if required && value.trim().is_empty() {
        out.push(format!("{field} must not be empty"));
    }
    if value.chars().count() > max {
        out.push(format!("{field} must be at most {max} characters"));
    }
}

fn check_confidence(out: &mut Vec<String>, value: Decimal) {
    if value < Decimal::ZERO || value > Decimal::ONE {
        out.push(format!("confidence {value} must be between 0 and 1"));
    }
}

impl Validate for Account {
    const ENTITY: &'static str = "account";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        check_text(&mut out, "name", &self.name, MAX_NAME_LEN, true);
        out
    }
}

impl Validate for StatementLine {
    const ENTITY: &'static str = "statement line";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        check_text(&mut out, "external id", &self.external_id, MAX_EXTERNAL_ID_LEN, true);
        check_text(&mut out, "memo", &self.memo, MAX_TEXT_LEN, false);
        out
    }
}

impl Validate for Rule {
    const ENTITY: &'static str = "rule";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        check_text(&mut out, "name", &self.name, MAX_NAME_LEN, true);
        if let Some(confidence) = self.action.confidence {
            check_confidence(&mut out, confidence);
        }
        out.extend(self.matcher.violations());
        out
    }
}

impl Validate for FxRate {
    const ENTITY: &'static str = "fx rate";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.rate <= Decimal::ZERO {
            out.push(format!("rate {} must be positive", self.rate));
        }
        if self.base == self.quote {
            out.push(format!("base and quote are both {}", self.base));
        }
        out
    }
}

impl Validate for CategoryLink {
    const ENTITY: &'static str = "category link";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        check_confidence(&mut out, self.confidence);
        out
    }
}

/// Validates an entry together with its lines.
///
/// Checks the header, every line's shape, and the zero-sum invariant.
pub fn entry_violations(entry: &Entry, lines: &[Line]) -> Vec<String> {
    let mut out = Vec::new();
    check_text(&mut out, "description", &entry.description, MAX_TEXT_LEN, false);
    if let Some(external_id) = &entry.external_id {
        check_text(&mut out, "external id", external_id, MAX_EXTERNAL_ID_LEN, true);
    }
    if entry.status == EntryStatus::Reconciled {
        out.push("new entries cannot start reconciled".to_string());
    }
    if lines.len() < 2 {
        out.push(format!("entry needs at least 2 lines, got {}", lines.len()));
    }

    for (idx, line) in lines.iter().enumerate() {
        let n = idx + 1;
        if line.entry_id != entry.id {
            out.push(format!("line {n} belongs to another entry"));
        }
        if line.native.is_zero() {
            out.push(format!("line {n} has a zero native amount"));
        }
        if !line.direction.agrees_with(line.native.amount) {
            out.push(format!("line {n} native amount sign disagrees with {}", line.direction));
        }
        if !line.direction.agrees_with(line.booked.amount) {
            out.push(format!("line {n} booked amount sign disagrees with {}", line.direction));
        }
        if line.fx_rate <= Decimal::ZERO {
            out.push(format!("line {n} fx rate must be positive"));
        }
        if line.booked.currency != entry.base_currency {
            out.push(format!(
                "line {n} booked in {} but entry base is {}",
                line.booked.currency, entry.base_currency
            ));
        }
    }

    match lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.booked.amount))
    {
        Some(sum) if sum.is_zero() => {}
        Some(sum) => out.push(format!("booked amounts sum to {sum}, expected 0")),
        None => out.push("booked amounts overflow".to_string()),
    }
    out
}
