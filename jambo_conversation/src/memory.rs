//! Per-contact memory.
//!
//! The persisted [`ConversationContext`] is the source of truth; a
//! [`ContactMemory`] wraps it together with the pieces that only live in
//! process (the recap ring buffer and the conversation identity) and is
//! rebuilt from the store after a restart.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use jambo_core::{
    Conversation, ConversationContext, ConversationPatch, FieldCategory, Language, Message,
    Sender,
};
use uuid::Uuid;

/// Accumulated `category:value` fragments, pipe-delimited when rendered.
///
/// Append-only: a fragment already present is never appended again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDetails {
    fragments: Vec<(FieldCategory, String)>,
}

impl ClientDetails {
    /// Parse the persisted form. Fragments with an unknown category or an
    /// empty value are dropped.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut details = Self::default();
        for fragment in s.split('|') {
            let Some((key, value)) = fragment.split_once(':') else {
                continue;
            };
            if let Some(category) = FieldCategory::from_key(key.trim()) {
                details.push(category, value);
            }
        }
        details
    }

    /// Append a fragment. Returns `false` if it was empty or already known.
    pub fn push(&mut self, category: FieldCategory, value: &str) -> bool {
        let value = value.trim().replace('|', "/");
        if value.is_empty() || self.contains(category, &value) {
            return false;
        }
        self.fragments.push((category, value));
        true
    }

    #[must_use]
    pub fn contains(&self, category: FieldCategory, value: &str) -> bool {
        self.fragments
            .iter()
            .any(|(c, v)| *c == category && v.eq_ignore_ascii_case(value))
    }

    #[must_use]
    pub fn has(&self, category: FieldCategory) -> bool {
        self.fragments.iter().any(|(c, _)| *c == category)
    }

    /// Values recorded for `category`, in the order they arrived.
    pub fn values(&self, category: FieldCategory) -> impl Iterator<Item = &str> {
        self.fragments
            .iter()
            .filter(move |(c, _)| *c == category)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn categories(&self) -> BTreeSet<FieldCategory> {
        self.fragments.iter().map(|(c, _)| *c).collect()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl fmt::Display for ClientDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (category, value)) in self.fragments.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{category}:{value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Ring buffer of the most recent turns.
#[derive(Debug, Clone)]
pub struct History {
    turns: VecDeque<Turn>,
    limit: usize,
}

impl History {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Append a turn, dropping the oldest once the buffer is full.
    pub fn push(&mut self, turn: Turn) {
        if self.limit == 0 {
            return;
        }
        while self.turns.len() >= self.limit {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }
}

/// Everything the pipeline knows about one contact.
#[derive(Debug, Clone)]
pub struct ContactMemory {
    pub conversation_id: Uuid,
    pub contact_address: String,
    pub user_name: Option<String>,
    pub language: Language,
    pub last_message_at: DateTime<Utc>,
    pub context: ConversationContext,
    pub details: ClientDetails,
    pub history: History,
}

impl ContactMemory {
    /// Memory for a conversation with no message history loaded.
    #[must_use]
    pub fn new(conversation: Conversation, history_limit: usize) -> Self {
        Self::restore(conversation, Vec::new(), history_limit)
    }

    /// Rebuild memory from a persisted conversation and its most recent
    /// messages (oldest first).
    #[must_use]
    pub fn restore(
        conversation: Conversation,
        recent: Vec<Message>,
        history_limit: usize,
    ) -> Self {
        let mut history = History::new(history_limit);
        for message in recent {
            history.push(Turn {
                sender: message.sender,
                content: message.content,
                timestamp: message.timestamp,
            });
        }
        let details = ClientDetails::parse(&conversation.context.client_details);
        Self {
            conversation_id: conversation.id,
            contact_address: conversation.contact_address,
            user_name: conversation.customer_name,
            language: conversation.language,
            last_message_at: conversation.last_message_at,
            context: conversation.context,
            details,
            history,
        }
    }

    /// Inbound messages merged so far, including earlier process lifetimes.
    #[must_use]
    pub const fn message_count(&self) -> u64 {
        self.context.analytics.inbound_messages
    }

    #[must_use]
    pub const fn has_complete_info(&self) -> bool {
        self.context.has_complete_info
    }

    /// The context document with the accumulated details folded in.
    #[must_use]
    pub fn snapshot_context(&self) -> ConversationContext {
        let mut context = self.context.clone();
        context.client_details = self.details.to_string();
        context
    }

    #[must_use]
    pub fn patch(&self) -> ConversationPatch {
        ConversationPatch {
            context: self.snapshot_context(),
            customer_name: self.user_name.clone(),
            language: self.language,
            last_message_at: self.last_message_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> Turn {
        Turn {
            sender: Sender::User,
            content: format!("message {n}"),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn details_parse_and_render() {
        let details = ClientDetails::parse("service:visa|destination:Dubai|bogus:x|date:");
        assert_eq!(details.len(), 2);
        assert_eq!(details.to_string(), "service:visa|destination:Dubai");
    }

    #[test]
    fn details_do_not_repeat_fragments() {
        let mut details = ClientDetails::default();
        assert!(details.push(FieldCategory::Destination, "Dubai"));
        assert!(!details.push(FieldCategory::Destination, "dubai"));
        assert!(details.push(FieldCategory::Destination, "Doha"));
        assert!(!details.push(FieldCategory::Name, "  "));
        assert_eq!(
            details.values(FieldCategory::Destination).collect::<Vec<_>>(),
            vec!["Dubai", "Doha"]
        );
    }

    #[test]
    fn details_escape_the_delimiter() {
        let mut details = ClientDetails::default();
        details.push(FieldCategory::Cargo, "tea|coffee");
        assert_eq!(details.to_string(), "cargo:tea/coffee");
    }

    #[test]
    fn history_never_exceeds_its_limit() {
        let mut history = History::new(3);
        for n in 0..50 {
            history.push(turn(n));
            assert!(history.len() <= 3);
        }
        let contents: Vec<_> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["message 47", "message 48", "message 49"]);
    }

    #[test]
    fn zero_limit_history_stays_empty() {
        let mut history = History::new(0);
        history.push(turn(1));
        assert!(history.is_empty());
    }

    #[test]
    fn restore_keeps_only_the_newest_turns() {
        let mut conversation = Conversation::detached("254700000001", ConversationContext::default());
        conversation.context.client_details = "name:Amina".to_string();
        let messages = (0..5)
            .map(|n| Message {
                id: Uuid::now_v7(),
                conversation_id: conversation.id,
                content: format!("m{n}"),
                sender: Sender::User,
                intent: None,
                entities: Vec::new(),
                timestamp: Utc::now(),
            })
            .collect();
        let memory = ContactMemory::restore(conversation, messages, 2);
        assert_eq!(memory.history.len(), 2);
        assert!(memory.details.has(FieldCategory::Name));
        assert_eq!(memory.patch().context.client_details, "name:Amina");
    }
}
