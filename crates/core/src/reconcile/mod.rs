//! Reconciliation of ledger entries against bank statements.
//!
//! - Automatic pass per account with a day window and amount tolerance
//! - Manual linking chosen by a user
//! - Entry lifecycle: draft/posted to reconciled, once

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::ReconcileError;
pub use service::{MAX_WINDOW_DAYS, Reconciler};
pub use types::AutoReconcileReport;
