use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use jambo_core::{
    Conversation, ConversationContext, ConversationPatch, ConversationStatus, ConversationStore,
    Message, NewMessage,
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    conversations: HashMap<Uuid, Conversation>,
    by_contact: HashMap<String, Uuid>,
    messages: HashMap<Uuid, Vec<Message>>,
}

/// In-process store. Used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn conversation_count(&self) -> usize {
        self.state.read().await.conversations.len()
    }

    /// Every stored message of a conversation, oldest first.
    pub async fn messages(&self, id: &Uuid) -> Vec<Message> {
        self.state
            .read()
            .await
            .messages
            .get(id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_conversation_by_contact(
        &self,
        contact_address: &str,
    ) -> anyhow::Result<Option<Conversation>> {
        let state = self.state.read().await;
        Ok(state
            .by_contact
            .get(contact_address)
            .and_then(|id| state.conversations.get(id))
            .cloned())
    }

    async fn find_conversation(&self, id: &Uuid) -> anyhow::Result<Option<Conversation>> {
        Ok(self.state.read().await.conversations.get(id).cloned())
    }

    async fn create_conversation(
        &self,
        contact_address: &str,
        initial_context: &ConversationContext,
    ) -> anyhow::Result<Conversation> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .by_contact
            .get(contact_address)
            .and_then(|id| state.conversations.get(id))
        {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::now_v7(),
            contact_address: contact_address.to_string(),
            customer_name: None,
            status: ConversationStatus::Active,
            language: initial_context.preferences.language,
            context: initial_context.clone(),
            last_message_at: now,
            created_at: now,
        };
        state
            .by_contact
            .insert(contact_address.to_string(), conversation.id);
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn update_conversation_context(
        &self,
        id: &Uuid,
        patch: &ConversationPatch,
    ) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("conversation not found: {id}"))?;
        conversation.context = patch.context.clone();
        conversation.customer_name.clone_from(&patch.customer_name);
        conversation.language = patch.language;
        conversation.last_message_at = patch.last_message_at;
        Ok(())
    }

    async fn append_message(&self, message: &NewMessage) -> anyhow::Result<Message> {
        let mut state = self.state.write().await;
        if !state.conversations.contains_key(&message.conversation_id) {
            anyhow::bail!("conversation not found: {}", message.conversation_id);
        }
        let stored = Message {
            id: Uuid::now_v7(),
            conversation_id: message.conversation_id,
            content: message.content.clone(),
            sender: message.sender,
            intent: message.intent.clone(),
            entities: message.entities.clone(),
            timestamp: message.timestamp,
        };
        let log = state.messages.entry(message.conversation_id).or_default();
        // Keep timestamp order even when writes arrive out of order.
        let at = log.partition_point(|m| m.timestamp <= stored.timestamp);
        log.insert(at, stored.clone());
        Ok(stored)
    }

    async fn list_recent_messages(
        &self,
        id: &Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<Message>> {
        let state = self.state.read().await;
        let log = state.messages.get(id).map_or(&[][..], Vec::as_slice);
        Ok(log[log.len().saturating_sub(limit)..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jambo_core::Sender;

    fn message(conversation_id: Uuid, content: &str, offset_secs: i64) -> NewMessage {
        NewMessage {
            conversation_id,
            content: content.to_string(),
            sender: Sender::User,
            intent: None,
            entities: Vec::new(),
            timestamp: Utc::now() + chrono::Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn one_conversation_per_contact() {
        let store = MemoryStore::new();
        let a = store
            .create_conversation("254700000001", &ConversationContext::default())
            .await
            .expect("create");
        let b = store
            .create_conversation("254700000001", &ConversationContext::default())
            .await
            .expect("create again");
        assert_eq!(a.id, b.id);
        assert_eq!(store.conversation_count().await, 1);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn recent_messages_are_oldest_first_and_bounded() {
        let store = MemoryStore::new();
        let c = store
            .create_conversation("254700000001", &ConversationContext::default())
            .await
            .expect("create");
        store.append_message(&message(c.id, "second", 2)).await.expect("append");
        store.append_message(&message(c.id, "first", 1)).await.expect("append");
        store.append_message(&message(c.id, "third", 3)).await.expect("append");

        let recent = store.list_recent_messages(&c.id, 2).await.expect("list");
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["second", "third"]);
        assert_eq!(store.messages(&c.id).await.len(), 3);
    }

    #[tokio::test]
    async fn writes_to_unknown_conversations_fail() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        assert!(store.append_message(&message(id, "x", 0)).await.is_err());
        let patch = ConversationPatch {
            context: ConversationContext::default(),
            customer_name: None,
            language: jambo_core::Language::English,
            last_message_at: Utc::now(),
        };
        assert!(store.update_conversation_context(&id, &patch).await.is_err());
    }
}
