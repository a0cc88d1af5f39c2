//! Recording doubles for the outbound collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use jambo_core::{
    Conversation, ConversationContext, ConversationPatch, ConversationStore, CredentialStore,
    EscalationNotice, Message, MessageSender, NewMessage, Notifier, SendError,
};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Captures every outbound text. Can be switched to fail.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn last_text(&self) -> Option<String> {
        self.sent.lock().await.last().map(|(_, text)| text.clone())
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, address: &str, text: &str) -> Result<(), SendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SendError::NotConnected);
        }
        self.sent
            .lock()
            .await
            .push((address.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<EscalationNotice>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices are still recorded when failing; only the result changes.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn notices(&self) -> Vec<EscalationNotice> {
        self.notices.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.notices.lock().await.len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &EscalationNotice) -> anyhow::Result<()> {
        self.notices.lock().await.push(notice.clone());
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("notification sink unavailable");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    blob: Mutex<Option<serde_json::Value>>,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, blob: &serde_json::Value) -> anyhow::Result<()> {
        *self.blob.lock().await = Some(blob.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.blob.lock().await.clone())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.blob.lock().await = None;
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A store whose every call fails, for exercising the degraded paths.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl ConversationStore for FailingStore {
    async fn find_conversation_by_contact(
        &self,
        _contact_address: &str,
    ) -> anyhow::Result<Option<Conversation>> {
        anyhow::bail!("store offline")
    }

    async fn find_conversation(&self, _id: &Uuid) -> anyhow::Result<Option<Conversation>> {
        anyhow::bail!("store offline")
    }

    async fn create_conversation(
        &self,
        _contact_address: &str,
        _initial_context: &ConversationContext,
    ) -> anyhow::Result<Conversation> {
        anyhow::bail!("store offline")
    }

    async fn update_conversation_context(
        &self,
        _id: &Uuid,
        _patch: &ConversationPatch,
    ) -> anyhow::Result<()> {
        anyhow::bail!("store offline")
    }

    async fn append_message(&self, _message: &NewMessage) -> anyhow::Result<Message> {
        anyhow::bail!("store offline")
    }

    async fn list_recent_messages(
        &self,
        _id: &Uuid,
        _limit: usize,
    ) -> anyhow::Result<Vec<Message>> {
        anyhow::bail!("store offline")
    }
}
