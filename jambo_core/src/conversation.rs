//! Persisted conversation records and the context document they carry.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::{Intent, Language, ServiceType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationStatus {
    #[default]
    Active,
    Closed,
}

impl ConversationStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Closed => "CLOSED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("closed") {
            Self::Closed
        } else {
            Self::Active
        }
    }
}

/// One conversation per distinct contact address.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub contact_address: String,
    pub customer_name: Option<String>,
    pub status: ConversationStatus,
    pub language: Language,
    pub context: ConversationContext,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// A conversation that exists only in process, used when the store is
    /// unreachable at first contact.
    #[must_use]
    pub fn detached(contact_address: &str, context: ConversationContext) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            contact_address: contact_address.to_string(),
            customer_name: None,
            status: ConversationStatus::Active,
            language: context.preferences.language,
            context,
            last_message_at: now,
            created_at: now,
        }
    }
}

/// Fields written back after a processed message.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationPatch {
    pub context: ConversationContext,
    pub customer_name: Option<String>,
    pub language: Language,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Ai => "AI",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("ai") {
            Self::Ai
        } else {
            Self::User
        }
    }
}

/// Append-only message record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub intent: Option<String>,
    pub entities: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A message about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub intent: Option<String>,
    pub entities: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Customer relationship tier. Ordered so that escalation is `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    #[default]
    New,
    Ongoing,
    Returning,
    Vip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationFlow {
    #[default]
    Greeting,
    Inquiry,
    Negotiation,
    Closing,
}

impl ConversationFlow {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Inquiry => "inquiry",
            Self::Negotiation => "negotiation",
            Self::Closing => "closing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub language: Language,
    pub response_style: String,
    pub notes: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: Language::English,
            response_style: "friendly".to_string(),
            notes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
    pub inbound_messages: u64,
    pub outbound_messages: u64,
    pub completion_failures: u64,
    pub fallback_replies: u64,
    pub booking_intents: u64,
    pub takeovers: u64,
    /// Moving average of inbound message length in characters.
    pub avg_inbound_length: f64,
    /// Moving average of completion-service latency in milliseconds.
    pub avg_completion_ms: f64,
}

/// Structured summary of a conversation, persisted as a JSON document on
/// the conversation row.
///
/// The contact memory fields (`client_details`, `service_type`,
/// `asked_name`, `last_question`, `has_complete_info`) live here as well so
/// that a restarted process can rebuild its cache from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationContext {
    pub customer_type: CustomerType,
    pub last_intent: Option<Intent>,
    pub conversation_flow: ConversationFlow,
    pub interests: BTreeSet<String>,
    pub travel_dates: Vec<String>,
    pub group_size: Option<u32>,
    pub preferences: Preferences,
    pub is_human_takeover: bool,
    pub human_takeover_at: Option<DateTime<Utc>>,
    pub ai_paused_until: Option<DateTime<Utc>>,
    pub analytics: Analytics,
    pub client_details: String,
    pub service_type: Option<ServiceType>,
    pub asked_name: bool,
    pub last_question: Option<String>,
    pub has_complete_info: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_type_orders_by_tier() {
        assert!(CustomerType::New < CustomerType::Ongoing);
        assert!(CustomerType::Ongoing < CustomerType::Returning);
        assert!(CustomerType::Returning < CustomerType::Vip);
    }

    #[test]
    fn context_deserializes_from_partial_document() {
        let ctx: ConversationContext =
            serde_json::from_str(r#"{"customerType":"returning","isHumanTakeover":false}"#)
                .unwrap_or_default();
        assert_eq!(ctx.customer_type, CustomerType::Returning);
        assert_eq!(ctx.conversation_flow, ConversationFlow::Greeting);
        assert!(ctx.interests.is_empty());
    }

    #[test]
    fn context_uses_camel_case_keys() {
        let ctx = ConversationContext {
            is_human_takeover: true,
            ..ConversationContext::default()
        };
        let json = serde_json::to_value(&ctx).unwrap_or_default();
        assert_eq!(json["isHumanTakeover"], serde_json::Value::Bool(true));
        assert!(json.get("aiPausedUntil").is_some());
    }

    #[test]
    fn sender_parses_case_insensitively() {
        assert_eq!(Sender::parse("ai"), Sender::Ai);
        assert_eq!(Sender::parse("USER"), Sender::User);
    }
}
