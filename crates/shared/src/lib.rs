//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Money and currency code types with decimal precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - The boundary error taxonomy
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
