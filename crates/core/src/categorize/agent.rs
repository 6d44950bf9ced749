//! Keyword agent: the fallback when no rule matches.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::config::CategorizationConfig;
use tally_shared::types::CategoryId;

/// A category proposed by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Proposed category.
    pub category_id: CategoryId,
    /// Agent confidence in `[0, 1]`.
    pub confidence: Decimal,
    /// Keyword that produced the hit.
    pub keyword: String,
}

/// Scans descriptions for configured keywords, first hit wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordAgent {
    // Lowercased keyword and its category, in configuration order.
    keywords: Vec<(String, CategoryId)>,
    confidence: Decimal,
}

impl KeywordAgent {
    /// Creates an agent reporting `confidence` for every hit.
    ///
    /// Blank keywords are dropped.
    #[must_use]
    pub fn new<I, K>(keywords: I, confidence: Decimal) -> Self
    where
        I: IntoIterator<Item = (K, CategoryId)>,
        K: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|(k, c)| (k.as_ref().trim().to_lowercase(), c))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self {
            keywords,
            confidence,
        }
    }

    /// Builds the agent from configuration.
    #[must_use]
    pub fn from_config(config: &CategorizationConfig) -> Self {
        Self::new(
            config
                .keywords
                .iter()
                .map(|k| (k.keyword.as_str(), k.category_id)),
            config.agent_confidence,
        )
    }

    /// Number of usable keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// True when the agent has no keywords.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Suggests a category for a description, if any keyword occurs in it.
    #[must_use]
    pub fn suggest(&self, description: &str) -> Option<Suggestion> {
        let haystack = description.to_lowercase();
        self.keywords
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(keyword, category_id)| Suggestion {
                category_id: *category_id,
                confidence: self.confidence,
                keyword: keyword.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_shared::config::KeywordConfig;

    #[test]
    fn test_first_keyword_wins() {
        let food = CategoryId::new();
        let transport = CategoryId::new();
        let agent = KeywordAgent::new([("taco", food), ("uber", transport)], dec!(0.65));

        let hit = agent.suggest("UBER to the TACO stand").unwrap();
        assert_eq!(hit.category_id, food);
        assert_eq!(hit.keyword, "taco");
        assert_eq!(hit.confidence, dec!(0.65));
        assert!(agent.suggest("Rent").is_none());
    }

    #[test]
    fn test_from_config_drops_blank_keywords() {
        let config = CategorizationConfig {
            keywords: vec![
                KeywordConfig {
                    keyword: "  ".into(),
                    category_id: CategoryId::new(),
                },
                KeywordConfig {
                    keyword: " Netflix ".into(),
                    category_id: CategoryId::new(),
                },
            ],
            ..CategorizationConfig::default()
        };
        let agent = KeywordAgent::from_config(&config);
        assert_eq!(agent.len(), 1);
        assert!(agent.suggest("netflix.com").is_some());
    }
}
