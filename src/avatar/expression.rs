//! Expression selection for the start of an utterance

use serde::{Deserialize, Serialize};

use crate::config::{ExpressionConfig, ExpressionMode};
use crate::random::RandomSource;

/// Maps any of a set of phrases to an expression id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Expression to show
    pub expression: String,
    /// Phrases to look for, matched case-insensitively anywhere in the text
    pub keywords: Vec<String>,
}

impl KeywordRule {
    /// Create a new rule
    pub fn new(expression: &str, keywords: &[&str]) -> Self {
        Self {
            expression: expression.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Check whether the (already lowercased) text contains any keyword
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
    }
}

/// Chooses the expression shown while speaking
#[derive(Debug, Clone)]
pub struct ExpressionSelector {
    mode: ExpressionMode,
    neutral: String,
    rules: Vec<KeywordRule>,
}

impl ExpressionSelector {
    /// Build a selector from configuration
    pub fn new(config: &ExpressionConfig) -> Self {
        Self {
            mode: config.mode,
            neutral: config.neutral.clone(),
            rules: config.rules.clone(),
        }
    }

    /// The expression restored when speech ends
    pub fn neutral(&self) -> &str {
        &self.neutral
    }

    /// Keyword lookup. Falls back to the neutral expression.
    pub fn for_text(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.expression.as_str())
            .unwrap_or(&self.neutral)
    }

    /// Uniform pick among `available`, or neutral if the model lists none
    pub fn random(&self, available: &[String], rng: &mut dyn RandomSource) -> String {
        rng.pick(available.len())
            .map(|i| available[i].clone())
            .unwrap_or_else(|| self.neutral.clone())
    }

    /// Select according to the configured mode. `None` when selection is off.
    pub fn select(
        &self,
        text: &str,
        available: &[String],
        rng: &mut dyn RandomSource,
    ) -> Option<String> {
        match self.mode {
            ExpressionMode::Keyword => Some(self.for_text(text).to_string()),
            ExpressionMode::Random => Some(self.random(available, rng)),
            ExpressionMode::Off => None,
        }
    }
}

impl Default for ExpressionSelector {
    fn default() -> Self {
        Self::new(&ExpressionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedSequence;

    #[test]
    fn test_keyword_mapping() {
        let selector = ExpressionSelector::default();
        assert_eq!(selector.for_text("Thank you for waiting"), "happy");
        assert_eq!(selector.for_text("thanks!"), "happy");
        assert_eq!(selector.for_text("I'm SORRY about that"), "sad");
        assert_eq!(selector.for_text("Your medicine is ready"), "neutral");
        assert_eq!(selector.for_text(""), "neutral");
    }

    #[test]
    fn test_first_rule_wins() {
        let selector = ExpressionSelector::default();
        assert_eq!(selector.for_text("sorry, and thank you"), "happy");
    }

    #[test]
    fn test_random_mode() {
        let config = ExpressionConfig {
            mode: ExpressionMode::Random,
            ..Default::default()
        };
        let selector = ExpressionSelector::new(&config);
        let available = vec!["f01".to_string(), "f02".to_string(), "f03".to_string()];

        let mut rng = FixedSequence::new(vec![0.5]);
        assert_eq!(
            selector.select("thank you", &available, &mut rng).as_deref(),
            Some("f02")
        );

        let mut rng = FixedSequence::new(vec![0.99]);
        assert_eq!(selector.select("", &[], &mut rng).as_deref(), Some("neutral"));
    }

    #[test]
    fn test_off_mode() {
        let config = ExpressionConfig {
            mode: ExpressionMode::Off,
            ..Default::default()
        };
        let selector = ExpressionSelector::new(&config);
        let mut rng = FixedSequence::new(vec![0.0]);
        assert!(selector.select("thank you", &[], &mut rng).is_none());
    }

    #[test]
    fn test_rule_parses_from_toml() {
        let rule: KeywordRule = toml::from_str(
            r#"
            expression = "angry"
            keywords = ["no way", "stop"]
            "#,
        )
        .unwrap();
        assert!(rule.matches("please stop that"));
        assert!(!rule.matches("go on"));
    }
}
