//! Statement importer: delimited text in, deduplicated statement lines out.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tally_shared::config::ImportConfig;
use tally_shared::types::{AccountId, CurrencyCode, StatementLineId};
use tracing::{debug, info, warn};

use super::error::ImportError;
use super::fingerprint::derive_external_id;
use super::mapping::{ColumnMapping, ResolveError, ResolvedColumns};
use super::parse::{parse_amount, parse_posted_at};
use crate::store::{Account, LedgerStore, StatementLine, StoreError, UpsertOutcome};

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based line number in the input.
    pub row: u64,
    /// Why the row was rejected.
    pub reason: String,
}

/// Outcome of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Rows stored as new statement lines.
    pub inserted: usize,
    /// Rows whose (account, external id) was already stored.
    pub duplicates: usize,
    /// Rows rejected, in input order.
    pub failed: Vec<RowFailure>,
}

impl ImportReport {
    /// Total rows seen.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.inserted + self.duplicates + self.failed.len()
    }
}

/// Imports bank statements into the store.
pub struct StatementImporter<'a, S> {
    store: &'a S,
    config: ImportConfig,
}

impl<'a, S: LedgerStore> StatementImporter<'a, S> {
    /// Creates an importer with the configured defaults.
    pub const fn new(store: &'a S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    /// Imports delimited text into an account's statement.
    ///
    /// Rows without an external id get one derived from their content, so
    /// importing the same file twice inserts nothing the second time.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when the account is unknown or the mapping cannot
    /// be applied. Bad rows are reported in [`ImportReport::failed`].
    #[tracing::instrument(skip(self, raw, mapping), fields(%account_id, bytes = raw.len()))]
    pub fn from_delimited(
        &self,
        account_id: AccountId,
        raw: &str,
        mapping: &ColumnMapping,
    ) -> Result<ImportReport, ImportError> {
        let account = self.store.get_account(account_id).map_err(|e| match e {
            StoreError::NotFound { .. } => ImportError::AccountNotFound(account_id),
            other => other.into(),
        })?;

        let delimiter = mapping.delimiter.unwrap_or(self.config.delimiter);
        let delimiter = u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ImportError::InvalidMapping(format!("delimiter '{delimiter}' is not ASCII"))
            })?;
        let has_headers = mapping.has_headers.unwrap_or(self.config.has_headers);

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(has_headers)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(raw.as_bytes());

        let headers: Option<Vec<String>> = if has_headers {
            Some(reader.headers()?.iter().map(str::to_string).collect())
        } else {
            None
        };
        let columns = mapping.resolve(headers.as_deref()).map_err(|e| match e {
            ResolveError::MissingColumn(name) => ImportError::MissingColumn(name),
            ResolveError::NameWithoutHeaders(name) => ImportError::InvalidMapping(format!(
                "column '{name}' is referenced by name but the input has no header row"
            )),
        })?;

        let formats: Vec<String> = mapping
            .date_format
            .iter()
            .chain(self.config.date_formats.iter())
            .cloned()
            .collect();

        let mut report = ImportReport::default();
        let mut record = StringRecord::new();
        loop {
            let row = reader.position().line();
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(e) => {
                    let row = e.position().map_or(row, csv::Position::line);
                    fail(&mut report, row, e.to_string());
                    continue;
                }
            }
            let row = record.position().map_or(row, csv::Position::line);
            if record.iter().all(str::is_empty) {
                continue;
            }

            let line = match statement_line(&account, &record, &columns, &formats) {
                Ok(line) => line,
                Err(reason) => {
                    fail(&mut report, row, reason);
                    continue;
                }
            };

            match self.store.upsert_statement_line(line) {
                Ok(UpsertOutcome::Inserted(line)) => {
                    debug!(row, statement_line_id = %line.id, "statement line inserted");
                    report.inserted += 1;
                }
                Ok(UpsertOutcome::Duplicate(existing)) => {
                    debug!(row, external_id = %existing.external_id, "duplicate statement line");
                    report.duplicates += 1;
                }
                Err(e) => fail(&mut report, row, e.to_string()),
            }
        }

        info!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed.len(),
            "statement imported"
        );
        Ok(report)
    }
}

fn fail(report: &mut ImportReport, row: u64, reason: String) {
    warn!(row, %reason, "statement row rejected");
    report.failed.push(RowFailure { row, reason });
}

fn cell<'r>(record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str, String> {
    record
        .get(index)
        .ok_or_else(|| format!("missing {name} column (index {index})"))
}

fn optional_cell<'r>(record: &'r StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| record.get(i)).unwrap_or_default()
}

/// Builds a statement line from one record, or says why it cannot.
fn statement_line(
    account: &Account,
    record: &StringRecord,
    columns: &ResolvedColumns,
    formats: &[String],
) -> Result<StatementLine, String> {
    let posted_at = parse_posted_at(cell(record, columns.posted_at, "date")?, formats)?;
    let amount = parse_amount(cell(record, columns.amount, "amount")?)?;

    let currency = optional_cell(record, columns.currency);
    if !currency.is_empty() {
        let currency = CurrencyCode::parse(currency)?;
        if currency != account.currency {
            return Err(format!(
                "currency {currency} differs from account currency {}",
                account.currency
            ));
        }
    }

    let memo = optional_cell(record, columns.memo).to_string();
    let external_id = match optional_cell(record, columns.external_id) {
        "" => derive_external_id(account.id, posted_at.date_naive(), amount, &memo),
        given => given.to_string(),
    };

    Ok(StatementLine {
        id: StatementLineId::new(),
        account_id: account.id,
        posted_at,
        amount,
        currency: account.currency,
        memo,
        external_id,
    })
}
