//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Line resolution and currency conversion at booking time
//! - Balance validation (signed booked amounts sum to zero)
//! - Idempotent entry creation
//! - Account balances and trial balance

pub mod balance;
pub mod error;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;

pub use balance::{account_balance, trial_balance, AccountBalance, NormalBalance, TrialBalance};
pub use error::LedgerError;
pub use service::EntryBuilder;
pub use types::{BuiltEntry, CreateEntryInput, Direction, EntryTotals, LineSpec, ResolvedLine};
