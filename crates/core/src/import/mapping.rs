//! Column mapping supplied by the caller for each import.

use serde::{Deserialize, Serialize};

/// A column, by header name or 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    /// 0-based position.
    Index(usize),
    /// Header name, matched case-insensitively after trimming.
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Where each statement field lives in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Posting date or instant.
    pub posted_at: ColumnRef,
    /// Signed amount.
    pub amount: ColumnRef,
    /// Bank memo.
    #[serde(default)]
    pub memo: Option<ColumnRef>,
    /// Bank-assigned transaction id.
    #[serde(default)]
    pub external_id: Option<ColumnRef>,
    /// Currency code; must equal the account currency when present.
    #[serde(default)]
    pub currency: Option<ColumnRef>,
    /// `chrono` format for the date column, tried before the configured ones.
    #[serde(default)]
    pub date_format: Option<String>,
    /// Field delimiter; the configured default when absent.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Whether the first row is a header row; the configured default when absent.
    #[serde(default)]
    pub has_headers: Option<bool>,
}

impl ColumnMapping {
    /// A mapping with only the required columns.
    #[must_use]
    pub fn new(posted_at: impl Into<ColumnRef>, amount: impl Into<ColumnRef>) -> Self {
        Self {
            posted_at: posted_at.into(),
            amount: amount.into(),
            memo: None,
            external_id: None,
            currency: None,
            date_format: None,
            delimiter: None,
            has_headers: None,
        }
    }

    /// Sets the memo column.
    #[must_use]
    pub fn memo(mut self, column: impl Into<ColumnRef>) -> Self {
        self.memo = Some(column.into());
        self
    }

    /// Sets the external id column.
    #[must_use]
    pub fn external_id(mut self, column: impl Into<ColumnRef>) -> Self {
        self.external_id = Some(column.into());
        self
    }

    /// Sets the currency column.
    #[must_use]
    pub fn currency(mut self, column: impl Into<ColumnRef>) -> Self {
        self.currency = Some(column.into());
        self
    }

    /// Sets the date format.
    #[must_use]
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Sets the delimiter.
    #[must_use]
    pub const fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Sets whether the input starts with a header row.
    #[must_use]
    pub const fn has_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = Some(has_headers);
        self
    }
}

/// Mapping resolved to positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedColumns {
    pub posted_at: usize,
    pub amount: usize,
    pub memo: Option<usize>,
    pub external_id: Option<usize>,
    pub currency: Option<usize>,
}

/// Why a mapping could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResolveError {
    /// A named column is not in the header row.
    MissingColumn(String),
    /// A column is referenced by name but the input has no header row.
    NameWithoutHeaders(String),
}

impl ColumnMapping {
    pub(crate) fn resolve(&self, headers: Option<&[String]>) -> Result<ResolvedColumns, ResolveError> {
        let find = |column: &ColumnRef| -> Result<usize, ResolveError> {
            match column {
                ColumnRef::Index(i) => Ok(*i),
                ColumnRef::Name(name) => {
                    let headers =
                        headers.ok_or_else(|| ResolveError::NameWithoutHeaders(name.clone()))?;
                    let wanted = name.trim().to_lowercase();
                    headers
                        .iter()
                        .position(|h| h.trim().to_lowercase() == wanted)
                        .ok_or_else(|| ResolveError::MissingColumn(name.clone()))
                }
            }
        };
        Ok(ResolvedColumns {
            posted_at: find(&self.posted_at)?,
            amount: find(&self.amount)?,
            memo: self.memo.as_ref().map(find).transpose()?,
            external_id: self.external_id.as_ref().map(find).transpose()?,
            currency: self.currency.as_ref().map(find).transpose()?,
        })
    }
}
