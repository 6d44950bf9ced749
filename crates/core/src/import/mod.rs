//! Statement import and deduplication.
//!
//! Delimited bank exports are mapped column by column into statement lines.
//! Rows without a bank reference get a content-derived external id, and the
//! store's (account, external id) key turns re-imports into counted duplicates.

pub mod error;
pub mod fingerprint;
pub mod mapping;
pub mod parse;
pub mod service;

pub use error::ImportError;
pub use fingerprint::derive_external_id;
pub use mapping::{ColumnMapping, ColumnRef};
pub use service::{ImportReport, RowFailure, StatementImporter};
