//! Rule matchers: boolean trees over entry clauses.

use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Longest accepted pattern, in characters.
pub const MAX_PATTERN_LEN: usize = 256;
/// Deepest accepted matcher tree.
pub const MAX_DEPTH: usize = 16;
/// Compiled program size limit for pattern clauses.
const REGEX_SIZE_LIMIT: usize = 1 << 16;
/// Group nesting limit for pattern clauses.
const REGEX_NEST_LIMIT: u32 = 32;

/// What a matcher looks at.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Entry description.
    pub description: &'a str,
    /// Sum of booked debit magnitudes of the entry.
    pub debit_total: Decimal,
}

/// A boolean tree of clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Matcher {
    /// True when every child is true. Empty is true.
    All(Vec<Matcher>),
    /// True when any child is true. Empty is false.
    Any(Vec<Matcher>),
    /// A leaf test.
    Clause(Clause),
}

/// A leaf test on an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Clause {
    /// Description contains `value`.
    DescriptionContains {
        /// Substring looked for.
        value: String,
        /// Compare exactly instead of case-insensitively.
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Description equals `value`, ignoring surrounding whitespace.
    DescriptionEquals {
        /// Expected description.
        value: String,
        /// Compare exactly instead of case-insensitively.
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Description matches a regular expression.
    DescriptionMatches {
        /// Pattern in `regex` syntax.
        pattern: String,
        /// Match exactly instead of case-insensitively.
        #[serde(default)]
        case_sensitive: bool,
        /// Compiled form, filled on first validation or evaluation.
        #[serde(skip)]
        compiled: CompiledPattern,
    },
    /// Entry total debit lies in an inclusive range. Open ends are unbounded.
    DebitTotalInRange {
        /// Lower bound.
        #[serde(default)]
        min: Option<Decimal>,
        /// Upper bound.
        #[serde(default)]
        max: Option<Decimal>,
    },
}

impl Clause {
    /// Case-insensitive "description contains".
    #[must_use]
    pub fn contains(value: impl Into<String>) -> Self {
        Self::DescriptionContains {
            value: value.into(),
            case_sensitive: false,
        }
    }

    /// Case-insensitive "description equals".
    #[must_use]
    pub fn equals(value: impl Into<String>) -> Self {
        Self::DescriptionEquals {
            value: value.into(),
            case_sensitive: false,
        }
    }

    /// Case-insensitive "description matches".
    #[must_use]
    pub fn matches(pattern: impl Into<String>) -> Self {
        Self::DescriptionMatches {
            pattern: pattern.into(),
            case_sensitive: false,
            compiled: CompiledPattern::default(),
        }
    }

    /// "Total debit between `min` and `max`", both inclusive.
    #[must_use]
    pub const fn debit_between(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self::DebitTotalInRange { min, max }
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> bool {
        match self {
            Self::DescriptionContains {
                value,
                case_sensitive,
            } => {
                if *case_sensitive {
                    ctx.description.contains(value.as_str())
                } else {
                    ctx.description
                        .to_lowercase()
                        .contains(&value.to_lowercase())
                }
            }
            Self::DescriptionEquals {
                value,
                case_sensitive,
            } => {
                let (left, right) = (ctx.description.trim(), value.trim());
                if *case_sensitive {
                    left == right
                } else {
                    left.to_lowercase() == right.to_lowercase()
                }
            }
            Self::DescriptionMatches {
                pattern,
                case_sensitive,
                compiled,
            } => compiled
                .get(pattern, *case_sensitive)
                .is_ok_and(|re| re.is_match(ctx.description)),
            Self::DebitTotalInRange { min, max } => {
                min.is_none_or(|m| ctx.debit_total >= m) && max.is_none_or(|m| ctx.debit_total <= m)
            }
        }
    }

    fn violations(&self, path: &str, out: &mut Vec<String>) {
        match self {
            Self::DescriptionContains { value, .. } | Self::DescriptionEquals { value, .. } => {
                if value.trim().is_empty() {
                    out.push(format!("{path}: text must not be empty"));
                }
            }
            Self::DescriptionMatches {
                pattern,
                case_sensitive,
                compiled,
            } => {
                if pattern.chars().count() > MAX_PATTERN_LEN {
                    out.push(format!(
                        "{path}: pattern must be at most {MAX_PATTERN_LEN} characters"
                    ));
                } else if let Err(e) = compiled.get(pattern, *case_sensitive) {
                    out.push(format!("{path}: invalid pattern: {e}"));
                }
            }
            Self::DebitTotalInRange { min, max } => match (min, max) {
                (None, None) => out.push(format!("{path}: range needs a min or a max")),
                (Some(lo), Some(hi)) if lo > hi => {
                    out.push(format!("{path}: min {lo} is greater than max {hi}"));
                }
                _ => {}
            },
        }
    }
}

/// Regex compiled once per clause and shared by its clones.
///
/// Always compares equal so clauses compare by their pattern text.
#[derive(Debug, Clone, Default)]
pub struct CompiledPattern(OnceCell<Result<Regex, regex::Error>>);

impl CompiledPattern {
    fn get(&self, pattern: &str, case_sensitive: bool) -> Result<&Regex, &regex::Error> {
        self.0
            .get_or_init(|| {
                RegexBuilder::new(pattern)
                    .case_insensitive(!case_sensitive)
                    .size_limit(REGEX_SIZE_LIMIT)
                    .nest_limit(REGEX_NEST_LIMIT)
                    .build()
            })
            .as_ref()
    }

    #[cfg(test)]
    fn is_compiled(&self) -> bool {
        self.0.get().is_some()
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for CompiledPattern {}

impl Matcher {
    /// Evaluates the tree against an entry.
    #[must_use]
    pub fn evaluate(&self, ctx: &MatchContext<'_>) -> bool {
        match self {
            Self::All(children) => children.iter().all(|m| m.evaluate(ctx)),
            Self::Any(children) => children.iter().any(|m| m.evaluate(ctx)),
            Self::Clause(clause) => clause.evaluate(ctx),
        }
    }

    /// Every structural problem in the tree; empty when the tree is usable.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_violations("matcher", 1, &mut out);
        out
    }

    fn collect_violations(&self, path: &str, depth: usize, out: &mut Vec<String>) {
        if depth > MAX_DEPTH {
            out.push(format!("{path}: nested deeper than {MAX_DEPTH} levels"));
            return;
        }
        match self {
            Self::All(children) | Self::Any(children) => {
                if children.is_empty() {
                    out.push(format!("{path}: group must not be empty"));
                }
                for (idx, child) in children.iter().enumerate() {
                    child.collect_violations(&format!("{path}.{idx}"), depth + 1, out);
                }
            }
            Self::Clause(clause) => clause.violations(path, out),
        }
    }
}

impl From<Clause> for Matcher {
    fn from(clause: Clause) -> Self {
        Self::Clause(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn ctx(description: &str, debit_total: Decimal) -> MatchContext<'_> {
        MatchContext {
            description,
            debit_total,
        }
    }

    #[rstest]
    #[case(Clause::contains("oxxo"), "OXXO Reforma", true)]
    #[case(Clause::contains("uber"), "Tacos", false)]
    #[case(Clause::DescriptionContains { value: "oxxo".into(), case_sensitive: true }, "OXXO", false)]
    #[case(Clause::equals("netflix"), "  Netflix ", true)]
    #[case(Clause::equals("netflix"), "Netflix MX", false)]
    #[case(Clause::matches(r"^uber\s*(eats)?"), "Uber Eats 123", true)]
    #[case(Clause::matches(r"^uber"), "Paid uber", false)]
    fn test_text_clauses(#[case] clause: Clause, #[case] description: &str, #[case] expected: bool) {
        assert_eq!(Matcher::from(clause).evaluate(&ctx(description, dec!(1))), expected);
    }

    #[rstest]
    #[case(Some(dec!(100)), Some(dec!(500)), dec!(100), true)]
    #[case(Some(dec!(100)), Some(dec!(500)), dec!(500), true)]
    #[case(Some(dec!(100)), Some(dec!(500)), dec!(500.01), false)]
    #[case(None, Some(dec!(50)), dec!(49.99), true)]
    #[case(Some(dec!(1000)), None, dec!(999), false)]
    fn test_debit_range_is_inclusive(
        #[case] min: Option<Decimal>,
        #[case] max: Option<Decimal>,
        #[case] total: Decimal,
        #[case] expected: bool,
    ) {
        let matcher = Matcher::from(Clause::debit_between(min, max));
        assert_eq!(matcher.evaluate(&ctx("x", total)), expected);
    }

    #[test]
    fn test_groups() {
        let tree = Matcher::All(vec![
            Clause::contains("oxxo").into(),
            Matcher::Any(vec![
                Clause::debit_between(None, Some(dec!(100))).into(),
                Clause::contains("snack").into(),
            ]),
        ]);
        assert!(tree.evaluate(&ctx("OXXO", dec!(80))));
        assert!(tree.evaluate(&ctx("oxxo snack", dec!(500))));
        assert!(!tree.evaluate(&ctx("oxxo", dec!(500))));

        assert!(Matcher::All(vec![]).evaluate(&ctx("x", dec!(1))));
        assert!(!Matcher::Any(vec![]).evaluate(&ctx("x", dec!(1))));
    }

    #[test]
    fn test_violations_are_collected() {
        let tree = Matcher::Any(vec![
            Matcher::All(vec![]),
            Clause::contains(" ").into(),
            Clause::matches("(unclosed").into(),
            Clause::matches("a".repeat(MAX_PATTERN_LEN + 1)).into(),
            Clause::debit_between(Some(dec!(10)), Some(dec!(1))).into(),
        ]);
        assert_eq!(tree.violations().len(), 5, "{:?}", tree.violations());
        assert!(Matcher::from(Clause::contains("ok")).violations().is_empty());
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut tree = Matcher::from(Clause::contains("x"));
        for _ in 0..MAX_DEPTH {
            tree = Matcher::All(vec![tree]);
        }
        assert_eq!(tree.violations().len(), 1);
    }

    #[test]
    fn test_pattern_compiles_once_and_clones_keep_it() {
        let clause = Clause::matches(r"\boxxo\b");
        let Clause::DescriptionMatches { compiled, .. } = &clause else {
            unreachable!()
        };
        assert!(!compiled.is_compiled());

        let matcher = Matcher::from(clause);
        assert!(matcher.violations().is_empty());
        let copy = matcher.clone();
        let Matcher::Clause(Clause::DescriptionMatches { compiled, .. }) = &copy else {
            unreachable!()
        };
        assert!(compiled.is_compiled());
        assert!(copy.evaluate(&ctx("OXXO Reforma", dec!(45))));
        assert_eq!(copy, Matcher::from(Clause::matches(r"\boxxo\b")));
    }

    #[test]
    fn test_serde_shape() {
        let tree = Matcher::Any(vec![Clause::contains("uber").into()]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["op"], "any");
        assert_eq!(json["args"][0]["op"], "clause");
        assert_eq!(json["args"][0]["args"]["kind"], "description_contains");
        let back: Matcher = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
