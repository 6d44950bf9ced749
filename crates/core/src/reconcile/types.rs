//! Reconciliation report types.

use serde::{Deserialize, Serialize};
use tally_shared::types::StatementLineId;

/// Outcome of an automatic pass over one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReconcileReport {
    /// Statement lines linked by this pass.
    pub linked: usize,
    /// Statement lines left alone because several entries matched.
    pub skipped: usize,
    /// Statement lines still unlinked after the pass, in processing order.
    pub remaining_statement_ids: Vec<StatementLineId>,
}
