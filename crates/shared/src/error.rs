//! Application-wide error taxonomy.
//!
//! Every engine module has its own precise error enum; at the service boundary
//! they all collapse into one of these kinds so callers can react uniformly.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error kinds.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input. Carries every violation found, not just the first.
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Unknown id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Id or uniqueness key collision.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// A line's signed amount disagrees with its debit/credit direction.
    #[error("Direction error: {0}")]
    Direction(String),

    /// A line names a base currency different from its entry's.
    #[error("Base currency error: {0}")]
    BaseCurrency(String),

    /// A line's native currency differs from its account's currency.
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),

    /// No applicable exchange rate.
    #[error("Exchange rate missing: {0}")]
    FxMissing(String),

    /// Signed booked amounts do not sum to zero.
    #[error("Unbalanced entry: {0}")]
    UnbalancedEntry(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Creates a validation error from a single message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    /// Returns the HTTP status code a transport layer should use for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Duplicate(_) => 409,
            Self::Direction(_)
            | Self::BaseCurrency(_)
            | Self::CurrencyMismatch(_)
            | Self::FxMissing(_)
            | Self::UnbalancedEntry(_) => 422,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Duplicate(_) => "DUPLICATE",
            Self::Direction(_) => "DIRECTION_ERROR",
            Self::BaseCurrency(_) => "BASE_CURRENCY_ERROR",
            Self::CurrencyMismatch(_) => "CURRENCY_MISMATCH",
            Self::FxMissing(_) => "FX_MISSING",
            Self::UnbalancedEntry(_) => "UNBALANCED_ENTRY",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
