//! Intent and language classification.
//!
//! Classification is an ordered table of `(matcher, intent)` rows evaluated
//! top to bottom; the first row that fires decides the intent. Language is
//! Swahili when any Swahili marker appears, English otherwise.

use jambo_core::{Intent, Language};
use once_cell::sync::Lazy;

use crate::lexicon::{INTENT_TABLE, KeywordSet, SWAHILI_MARKERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub language: Language,
}

/// One row of the intent table.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    matcher: KeywordSet,
}

impl IntentRule {
    #[must_use]
    pub fn new(intent: Intent, keywords: &[&str]) -> Self {
        Self {
            intent,
            matcher: KeywordSet::new(keywords),
        }
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<IntentRule>,
    secondary_language: KeywordSet,
}

static DEFAULT: Lazy<Classifier> = Lazy::new(Classifier::new);

impl Classifier {
    /// Classifier over the built-in keyword tables.
    #[must_use]
    pub fn new() -> Self {
        let rules = INTENT_TABLE
            .iter()
            .map(|(intent, keywords)| IntentRule::new(*intent, keywords))
            .collect();
        Self::with_rules(rules, SWAHILI_MARKERS)
    }

    #[must_use]
    pub fn with_rules(rules: Vec<IntentRule>, secondary_markers: &[&str]) -> Self {
        Self {
            rules,
            secondary_language: KeywordSet::new(secondary_markers),
        }
    }

    /// Shared instance over the built-in tables.
    #[must_use]
    pub fn shared() -> &'static Self {
        &DEFAULT
    }

    #[must_use]
    pub fn classify(&self, text: &str) -> Classification {
        Classification {
            intent: self.intent(text),
            language: self.language(text),
        }
    }

    #[must_use]
    pub fn intent(&self, text: &str) -> Intent {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map_or(Intent::General, |rule| rule.intent)
    }

    #[must_use]
    pub fn language(&self, text: &str) -> Language {
        if self.secondary_language.is_match(text) {
            Language::Swahili
        } else {
            Language::English
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
