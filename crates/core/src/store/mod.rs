//! Repository store: entities, the storage contract, and the in-memory backing.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod validate;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use models::{
    Account, AccountNature, CategoryLink, CategorySource, Direction, Entry, EntryAggregate,
    EntryStatus, Line, ReconciliationLink, Rule, RuleAction, StatementLine,
};
pub use repository::{LedgerStore, UpsertOutcome};
pub use validate::Validate;
