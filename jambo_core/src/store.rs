use async_trait::async_trait;
use uuid::Uuid;

use crate::conversation::{
    Conversation, ConversationContext, ConversationPatch, Message, NewMessage,
};

/// Persistence capability for conversations and their messages.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_conversation_by_contact(
        &self,
        contact_address: &str,
    ) -> anyhow::Result<Option<Conversation>>;

    async fn find_conversation(&self, id: &Uuid) -> anyhow::Result<Option<Conversation>>;

    /// Create the conversation for `contact_address`. Implementations must
    /// keep at most one conversation per address.
    async fn create_conversation(
        &self,
        contact_address: &str,
        initial_context: &ConversationContext,
    ) -> anyhow::Result<Conversation>;

    async fn update_conversation_context(
        &self,
        id: &Uuid,
        patch: &ConversationPatch,
    ) -> anyhow::Result<()>;

    async fn append_message(&self, message: &NewMessage) -> anyhow::Result<Message>;

    /// The most recent `limit` messages, oldest first.
    async fn list_recent_messages(&self, id: &Uuid, limit: usize)
    -> anyhow::Result<Vec<Message>>;
}
