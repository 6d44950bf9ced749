//! Cell parsers for statement rows.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

/// Currency symbols stripped from amounts.
const CURRENCY_SYMBOLS: [char; 3] = ['$', '€', '£'];

/// Parses a statement amount.
///
/// Accepts an optional leading `+` or `-`, accounting parentheses for negatives,
/// thousands separators and the symbols `$ € £`.
///
/// # Errors
///
/// Returns a reason when the cell is not a number.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("amount is empty".to_string());
    }

    let (mut negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    let digits = if let Some(rest) = cleaned.strip_prefix('-') {
        negative = !negative;
        rest
    } else {
        cleaned.strip_prefix('+').unwrap_or(&cleaned)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(format!("amount '{trimmed}' is not a number"));
    }

    let value = Decimal::from_str(digits).map_err(|_| format!("amount '{trimmed}' is not a number"))?;
    Ok(if negative { -value } else { value })
}

/// Parses a posting date or instant.
///
/// RFC 3339 instants are taken as-is. Otherwise each format is tried in
/// order, as a date (midnight UTC) and then as a date-time in UTC.
///
/// # Errors
///
/// Returns a reason when no format matches.
pub fn parse_posted_at(raw: &str, formats: &[String]) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("date is empty".to_string());
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
        }
        if let Ok(date_time) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(date_time.and_utc());
        }
    }
    Err(format!("date '{trimmed}' matches none of the accepted formats"))
}
