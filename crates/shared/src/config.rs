//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::CategoryId;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Reconciliation matching configuration.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Categorization configuration.
    #[serde(default)]
    pub categorization: CategorizationConfig,
    /// Statement import configuration.
    #[serde(default)]
    pub import: ImportConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Default day window for the automatic pass.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Maximum absolute difference for two amounts to be considered equal.
    #[serde(default = "default_amount_epsilon")]
    pub amount_epsilon: Decimal,
}

fn default_window_days() -> i64 {
    3
}

fn default_amount_epsilon() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            amount_epsilon: default_amount_epsilon(),
        }
    }
}

/// A keyword the fallback agent looks for in entry descriptions.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    /// Substring to search for (case-insensitive).
    pub keyword: String,
    /// Category suggested when the keyword is found.
    pub category_id: CategoryId,
}

/// Categorization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CategorizationConfig {
    /// Agent suggestions at or above this confidence are applied automatically.
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: Decimal,
    /// Fixed confidence the keyword agent reports for a hit.
    #[serde(default = "default_agent_confidence")]
    pub agent_confidence: Decimal,
    /// Keywords in evaluation order.
    #[serde(default)]
    pub keywords: Vec<KeywordConfig>,
}

fn default_acceptance_threshold() -> Decimal {
    Decimal::new(80, 2) // 0.80
}

fn default_agent_confidence() -> Decimal {
    Decimal::new(65, 2) // 0.65
}

impl Default for CategorizationConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: default_acceptance_threshold(),
            agent_confidence: default_agent_confidence(),
            keywords: Vec::new(),
        }
    }
}

/// Statement import configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Field delimiter used when a column mapping does not name one.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Whether the first row is a header row, unless the mapping says otherwise.
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
    /// Date formats tried in order when a mapping has no explicit format.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

fn default_delimiter() -> char {
    ','
}

fn default_has_headers() -> bool {
    true
}

fn default_date_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d".to_string(),
        "%d/%m/%Y".to_string(),
        "%m/%d/%Y".to_string(),
    ]
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_headers: default_has_headers(),
            date_formats: default_date_formats(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "tally=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from config files and the environment.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, then `TALLY__SECTION__KEY` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or holds an
    /// out-of-range value.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the services cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`config::ConfigError::Message`] naming the first bad key.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.reconcile.amount_epsilon.is_sign_negative() {
            return Err(config::ConfigError::Message(format!(
                "reconcile.amount_epsilon must not be negative, got {}",
                self.reconcile.amount_epsilon
            )));
        }
        let unit = Decimal::ZERO..=Decimal::ONE;
        for (key, value) in [
            ("categorization.acceptance_threshold", self.categorization.acceptance_threshold),
            ("categorization.agent_confidence", self.categorization.agent_confidence),
        ] {
            if !unit.contains(&value) {
                return Err(config::ConfigError::Message(format!(
                    "{key} must be between 0 and 1, got {value}"
                )));
            }
        }
        Ok(())
    }
}
