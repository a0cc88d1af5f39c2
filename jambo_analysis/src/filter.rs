//! Inbound message filter.
//!
//! A pure predicate over the raw transport event: nothing is read from or
//! written to conversation state.

use jambo_core::{ChatKind, InboundEvent};

use crate::lexicon::{KeywordSet, SCAM_KEYWORDS};

/// Address suffixes used by group, broadcast and status channels.
const NON_DIRECT_SUFFIXES: &[&str] = &["@g.us", "@broadcast", "@newsletter"];

#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Minimum trimmed length in characters.
    pub min_len: usize,
    /// Maximum trimmed length in characters.
    pub max_len: usize,
    /// A run of this many identical characters marks the body as spam.
    pub max_repeated_run: usize,
    /// Distinct scam keywords needed to mark the body as spam.
    pub scam_keyword_threshold: usize,
    /// The bot's own address; messages from it are dropped.
    pub self_address: Option<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_len: 2,
            max_len: 1000,
            max_repeated_run: 10,
            scam_keyword_threshold: 2,
            self_address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NonDirectChannel,
    OwnMessage,
    NoText,
    TooShort(usize),
    TooLong(usize),
    RepeatedCharacters,
    PunctuationOnly,
    ScamKeywords,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonDirectChannel => f.write_str("group, broadcast or status channel"),
            Self::OwnMessage => f.write_str("own message"),
            Self::NoText => f.write_str("no text body"),
            Self::TooShort(n) => write!(f, "too short ({n} chars)"),
            Self::TooLong(n) => write!(f, "too long ({n} chars)"),
            Self::RepeatedCharacters => f.write_str("repeated characters"),
            Self::PunctuationOnly => f.write_str("punctuation only"),
            Self::ScamKeywords => f.write_str("scam keywords"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Whether an address belongs to a group, broadcast or status channel.
#[must_use]
pub fn is_non_direct_address(address: &str) -> bool {
    address == "status@broadcast" || NON_DIRECT_SUFFIXES.iter().any(|s| address.ends_with(s))
}

#[derive(Debug, Clone)]
pub struct MessageFilter {
    config: FilterConfig,
    scam: KeywordSet,
}

impl MessageFilter {
    #[must_use]
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            scam: KeywordSet::new(SCAM_KEYWORDS),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Set the bot's own address once the transport reports it.
    pub fn set_self_address(&mut self, address: Option<String>) {
        self.config.self_address = address;
    }

    #[must_use]
    pub fn check(&self, event: &InboundEvent) -> Verdict {
        // Channel checks come first and ignore the body entirely.
        if event.chat_kind != ChatKind::Direct || is_non_direct_address(&event.from) {
            return Verdict::Reject(RejectReason::NonDirectChannel);
        }
        if event.from_me || self.config.self_address.as_deref() == Some(event.from.as_str()) {
            return Verdict::Reject(RejectReason::OwnMessage);
        }

        let Some(text) = event.text.as_deref().map(str::trim) else {
            return Verdict::Reject(RejectReason::NoText);
        };

        let len = text.chars().count();
        if len < self.config.min_len {
            return Verdict::Reject(RejectReason::TooShort(len));
        }
        if len > self.config.max_len {
            return Verdict::Reject(RejectReason::TooLong(len));
        }
        if longest_run(text) >= self.config.max_repeated_run {
            return Verdict::Reject(RejectReason::RepeatedCharacters);
        }
        if text
            .chars()
            .all(|c| c.is_ascii_punctuation() || c.is_whitespace())
        {
            return Verdict::Reject(RejectReason::PunctuationOnly);
        }
        if self.scam.distinct_matches(text) >= self.config.scam_keyword_threshold {
            return Verdict::Reject(RejectReason::ScamKeywords);
        }

        Verdict::Accept
    }
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

/// Length of the longest run of one repeated non-whitespace character.
fn longest_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<char> = None;
    for c in text.chars() {
        if c.is_whitespace() {
            previous = None;
            current = 0;
            continue;
        }
        if previous == Some(c) {
            current += 1;
        } else {
            previous = Some(c);
            current = 1;
        }
        longest = longest.max(current);
    }
    longest
}
