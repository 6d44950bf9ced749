//! Deterministic external ids for statement rows that carry none.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tally_shared::types::AccountId;

/// Prefix marking a derived (hashed) external id.
pub const DERIVED_PREFIX: &str = "sha256:";

/// Trims, collapses inner whitespace and lowercases a memo.
#[must_use]
pub fn normalize_memo(memo: &str) -> String {
    memo.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Derives the external id of a statement row.
///
/// Two rows on the same account with the same posted date, amount and
/// normalized memo get the same id, so re-importing a file deduplicates.
#[must_use]
pub fn derive_external_id(
    account_id: AccountId,
    posted_on: NaiveDate,
    amount: Decimal,
    memo: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}|{}|{}|{}",
        account_id,
        posted_on.format("%Y-%m-%d"),
        amount.normalize(),
        normalize_memo(memo)
    ));
    format!("{DERIVED_PREFIX}{:x}", hasher.finalize())
}
