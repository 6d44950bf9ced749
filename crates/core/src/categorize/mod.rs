//! Categorization: prioritized rules with a keyword-agent fallback.

pub mod agent;
pub mod matcher;
pub mod service;

pub use agent::{KeywordAgent, Suggestion};
pub use matcher::{Clause, CompiledPattern, MatchContext, Matcher};
pub use service::{CategorizationResult, Categorizer, ResultSource};
