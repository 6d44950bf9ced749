//! Categorizer: rules first, keyword agent second.

use std::cmp::Reverse;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::config::CategorizationConfig;
use tally_shared::types::{CategoryId, OwnerId, RuleId};
use tracing::{debug, info};

use super::agent::KeywordAgent;
use super::matcher::MatchContext;
use crate::ledger::BuiltEntry;
use crate::store::{CategoryLink, CategorySource, LedgerStore, Rule, StoreResult};

/// Where a categorization outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// A rule matched.
    Rule,
    /// The keyword agent made a suggestion.
    Agent,
    /// Nothing matched.
    None,
}

/// Outcome of categorizing one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizationResult {
    /// Whether the category was assigned to the entry.
    pub applied: bool,
    /// Origin of the outcome.
    pub source: ResultSource,
    /// Matched or suggested category.
    pub category_id: Option<CategoryId>,
    /// Confidence in `[0, 1]`; zero when nothing matched.
    pub confidence: Decimal,
    /// True when a suggestion was not confident enough to apply.
    pub needs_review: bool,
    /// Rule that matched, if any.
    pub rule_id: Option<RuleId>,
}

impl CategorizationResult {
    fn none() -> Self {
        Self {
            applied: false,
            source: ResultSource::None,
            category_id: None,
            confidence: Decimal::ZERO,
            needs_review: false,
            rule_id: None,
        }
    }
}

/// Assigns categories to built entries.
pub struct Categorizer<'a, S> {
    store: &'a S,
    agent: KeywordAgent,
    acceptance_threshold: Decimal,
}

impl<'a, S: LedgerStore> Categorizer<'a, S> {
    /// Creates a categorizer from configuration.
    pub fn new(store: &'a S, config: &CategorizationConfig) -> Self {
        Self::with_agent(
            store,
            KeywordAgent::from_config(config),
            config.acceptance_threshold,
        )
    }

    /// Creates a categorizer with an explicit agent.
    pub const fn with_agent(store: &'a S, agent: KeywordAgent, acceptance_threshold: Decimal) -> Self {
        Self {
            store,
            agent,
            acceptance_threshold,
        }
    }

    /// The owner's active rules, highest priority first, ties in creation order.
    pub fn ordered_rules(&self, owner_id: OwnerId) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .store
            .list_rules(owner_id)
            .into_iter()
            .filter(|r| r.is_active)
            .collect();
        rules.sort_by_key(|r| Reverse(r.priority));
        rules
    }

    /// Decides a category without touching the store's category links.
    #[must_use]
    pub fn evaluate(&self, owner_id: OwnerId, entry: &BuiltEntry) -> CategorizationResult {
        let ctx = MatchContext {
            description: &entry.entry.description,
            debit_total: entry.total_debit(),
        };

        if let Some(rule) = self
            .ordered_rules(owner_id)
            .into_iter()
            .find(|r| r.matcher.evaluate(&ctx))
        {
            debug!(rule_id = %rule.id, priority = rule.priority, "rule matched");
            return CategorizationResult {
                applied: true,
                source: ResultSource::Rule,
                category_id: Some(rule.action.category_id),
                confidence: rule.action.effective_confidence(),
                needs_review: false,
                rule_id: Some(rule.id),
            };
        }

        match self.agent.suggest(ctx.description) {
            Some(suggestion) => {
                let accepted = suggestion.confidence >= self.acceptance_threshold;
                debug!(
                    keyword = %suggestion.keyword,
                    confidence = %suggestion.confidence,
                    accepted,
                    "agent suggestion"
                );
                CategorizationResult {
                    applied: accepted,
                    source: ResultSource::Agent,
                    category_id: Some(suggestion.category_id),
                    confidence: suggestion.confidence,
                    needs_review: !accepted,
                    rule_id: None,
                }
            }
            None => CategorizationResult::none(),
        }
    }

    /// Categorizes an entry and stores an applied outcome as its category.
    ///
    /// # Errors
    ///
    /// Returns a store error if the entry is not stored.
    #[tracing::instrument(skip(self, entry), fields(entry_id = %entry.entry.id))]
    pub fn categorize(
        &self,
        owner_id: OwnerId,
        entry: &BuiltEntry,
    ) -> StoreResult<CategorizationResult> {
        let result = self.evaluate(owner_id, entry);
        if result.applied
            && let Some(category_id) = result.category_id
        {
            let source = match result.source {
                ResultSource::Agent => CategorySource::Agent,
                _ => CategorySource::Rule,
            };
            self.store.assign_category(CategoryLink {
                entry_id: entry.entry.id,
                category_id,
                source,
                confidence: result.confidence,
                rule_id: result.rule_id,
            })?;
            info!(%category_id, source = ?result.source, "entry categorized");
        }
        Ok(result)
    }
}
