//! Core ledger engine for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Services borrow a [`store::LedgerStore`] and are otherwise stateless.
//!
//! # Modules
//!
//! - `currency` - Exchange-rate snapshots and conversion
//! - `store` - Domain records and the repository contract
//! - `ledger` - Double-entry bookkeeping logic
//! - `import` - Bank statement import and deduplication
//! - `reconcile` - Matching entries to statement lines
//! - `categorize` - Rule and keyword-agent categorization

pub mod categorize;
pub mod currency;
pub mod import;
pub mod ledger;
pub mod reconcile;
pub mod store;
