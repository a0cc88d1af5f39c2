#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Shared domain types and capability traits for the jambo session engine.
//!
//! Every external collaborator (messaging transport, completion service,
//! persistence store, notification sink, credential storage) is consumed
//! through a trait defined here so the engine crates never depend on a
//! concrete backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod conversation;
pub mod credentials;
pub mod intent;
pub mod notify;
pub mod store;
pub mod transport;

pub use conversation::{
    Analytics, Conversation, ConversationContext, ConversationFlow, ConversationPatch,
    ConversationStatus, CustomerType, Message, NewMessage, Preferences, Sender,
};
pub use credentials::CredentialStore;
pub use intent::{FieldCategory, Intent, Language, ServiceType};
pub use notify::{EscalationNotice, Notifier};
pub use store::ConversationStore;
pub use transport::{
    ChatKind, CloseReason, EventSink, InboundEvent, InboundHandler, MessageSender, SendError,
    Transport, TransportEvent,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A fully assembled request for the completion service.
///
/// The far side keeps no memory between calls, so `body` carries the
/// conversation recap and the new message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub body: String,
}

impl Prompt {
    #[must_use]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.system.is_empty() {
            messages.push(ChatMessage {
                role: Role::System,
                content: self.system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: self.body.clone(),
        });
        messages
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> anyhow::Result<String>;
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_system_has_single_message() {
        let prompt = Prompt {
            system: String::new(),
            body: "hello".to_string(),
        };
        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn prompt_with_system_leads_with_system_role() {
        let prompt = Prompt {
            system: "You are a travel consultant.".to_string(),
            body: "hello".to_string(),
        };
        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "hello");
    }
}
