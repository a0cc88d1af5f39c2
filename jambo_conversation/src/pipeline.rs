//! The response pipeline.
//!
//! One inbound message in, at most one reply out. Every stage is a gate;
//! external failures are logged and resolved to silence or a fallback
//! reply, never propagated to the transport event loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jambo_analysis::{Classifier, Extractor, FilterConfig, MessageFilter, RejectReason, Verdict};
use jambo_core::{
    CompletionProvider, Conversation, ConversationContext, ConversationStore, EscalationNotice,
    InboundEvent, InboundHandler, Intent, MessageSender, NewMessage, Notifier, SendError, Sender,
    ServiceType,
};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::escalation::{EscalationEvaluator, EscalationPolicy, EscalationState};
use crate::memory::{ContactMemory, Turn};
use crate::merge::{MergePolicy, PromptContext, TurnInput, merge, record_completion_latency, record_reply};
use crate::prompt::PromptBuilder;
use crate::replies;
use crate::takeover::{ArbiterState, TakeoverArbiter};
use crate::writer::PersistenceQueue;

/// Human-like pause before a reply, proportional to its length.
#[derive(Debug, Clone, Copy)]
pub struct TypingDelay {
    pub min: Duration,
    pub max: Duration,
    pub per_char: Duration,
}

impl TypingDelay {
    pub const NONE: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
        per_char: Duration::ZERO,
    };

    #[must_use]
    pub fn delay_for(&self, reply: &str) -> Duration {
        let chars = u32::try_from(reply.chars().count()).unwrap_or(u32::MAX);
        let upper = self.max.max(self.min);
        self.per_char.saturating_mul(chars).clamp(self.min, upper)
    }
}

impl Default for TypingDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(6000),
            per_char: Duration::from_millis(35),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub agency_name: String,
    pub persona: String,
    pub filter: FilterConfig,
    /// Turns kept for the prompt recap.
    pub history_limit: usize,
    pub completion_timeout: Duration,
    pub notify_timeout: Duration,
    pub takeover_cooldown: chrono::Duration,
    pub merge: MergePolicy,
    pub escalation: EscalationPolicy,
    pub typing: TypingDelay,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            agency_name: "Jambo Travel".to_string(),
            persona: "You are a friendly travel consultant.".to_string(),
            filter: FilterConfig::default(),
            history_limit: 10,
            completion_timeout: Duration::from_secs(30),
            notify_timeout: Duration::from_secs(15),
            takeover_cooldown: chrono::Duration::minutes(30),
            merge: MergePolicy::default(),
            escalation: EscalationPolicy::default(),
            typing: TypingDelay::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to send reply: {0}")]
    Send(#[from] SendError),

    #[error("conversation not found: {0}")]
    UnknownConversation(Uuid),

    #[error("conversation store error: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Greeting,
    Handoff,
    Escalation,
    Completion,
    Fallback,
}

impl ReplyKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Handoff => "handoff",
            Self::Escalation => "escalation",
            Self::Completion => "completion",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dropped by the filter; nothing was touched.
    Rejected(RejectReason),
    /// Persisted without a reply.
    Ignored,
    /// Persisted and merged, but a human operator holds the conversation.
    Suppressed,
    Replied { kind: ReplyKind, text: String },
}

type Slot = Arc<Mutex<Option<ContactMemory>>>;

struct CacheEntry {
    slot: Slot,
    last_used: Instant,
}

pub struct ResponsePipeline {
    config: PipelineConfig,
    filter: RwLock<MessageFilter>,
    arbiter: TakeoverArbiter,
    escalation: EscalationEvaluator,
    prompts: PromptBuilder,
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn CompletionProvider>,
    sender: Arc<dyn MessageSender>,
    notifier: Arc<dyn Notifier>,
    writer: PersistenceQueue,
    contacts: Mutex<HashMap<String, CacheEntry>>,
    /// Conversation id to contact address, for cached conversations.
    index: Mutex<HashMap<Uuid, String>>,
}

impl ResponsePipeline {
    /// Build the pipeline and start its persistence writer. Must be called
    /// inside a tokio runtime.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn CompletionProvider>,
        sender: Arc<dyn MessageSender>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        info!(
            "Creating response pipeline for {} (model: {})",
            config.agency_name,
            provider.model()
        );
        Self {
            filter: RwLock::new(MessageFilter::new(config.filter.clone())),
            arbiter: TakeoverArbiter::new(config.takeover_cooldown),
            escalation: EscalationEvaluator::new(config.escalation.clone()),
            prompts: PromptBuilder::new(config.agency_name.clone(), config.persona.clone()),
            writer: PersistenceQueue::spawn(Arc::clone(&store)),
            store,
            provider,
            sender,
            notifier,
            contacts: Mutex::new(HashMap::new()),
            index: Mutex::new(HashMap::new()),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one inbound message through every stage.
    pub async fn process(&self, event: InboundEvent) -> Result<Outcome, PipelineError> {
        if let Verdict::Reject(reason) = self.filter.read().await.check(&event) {
            debug!("Rejected message from {}: {reason}", event.from);
            return Ok(Outcome::Rejected(reason));
        }

        let text = event.text.as_deref().unwrap_or_default().trim();
        let classification = Classifier::shared().classify(text);
        let extracted = Extractor::shared().extract(text);
        let trigger = self.arbiter.detect(text);
        let now = event.timestamp;
        debug!("Message from {}: {text:?}", event.from);

        let mut guard = self.contact(&event.from).await;
        let Some(memory) = guard.as_mut() else {
            return Ok(Outcome::Ignored);
        };

        let continuation = memory.context.last_question.is_some();
        let responds =
            classification.intent.warrants_reply() || continuation || trigger.is_some();

        self.writer.append(NewMessage {
            conversation_id: memory.conversation_id,
            content: text.to_string(),
            sender: Sender::User,
            intent: Some(classification.intent.as_str().to_string()),
            entities: extracted.entity_strings(),
            timestamp: now,
        });

        if !responds {
            debug!(
                "No reply needed for {} (intent: {})",
                event.from, classification.intent
            );
            return Ok(Outcome::Ignored);
        }

        let input = TurnInput {
            text,
            classification,
            extracted: &extracted,
            timestamp: now,
        };
        let prompt_ctx = merge(memory, &input, &self.config.merge);
        info!(
            "Message from {} intent={} language={} flow={}",
            event.from,
            classification.intent,
            classification.language.code(),
            prompt_ctx.flow.as_str()
        );

        if let ArbiterState::HumanActive { until } = TakeoverArbiter::state(&memory.context, now) {
            info!(
                "Conversation {} is with a human operator until {until}; not replying",
                memory.conversation_id
            );
            self.writer.update(memory.conversation_id, memory.patch());
            return Ok(Outcome::Suppressed);
        }

        if let Some(reason) = trigger {
            let until = self.arbiter.engage(&mut memory.context, now);
            warn!(
                "Human takeover requested by {} ({reason}); automated replies paused until {until}",
                memory.contact_address
            );
            let reply = replies::handoff(memory.language).to_string();
            return self.deliver(memory, reply, ReplyKind::Handoff, now).await;
        }

        if classification.intent == Intent::Greeting {
            let ask_name = memory.user_name.is_none() && !memory.context.asked_name;
            let reply = replies::greeting(
                memory.language,
                memory.message_count().saturating_sub(1),
                &self.config.agency_name,
                memory.user_name.as_deref(),
                ask_name,
            );
            if ask_name {
                memory.context.asked_name = true;
            }
            return self.deliver(memory, reply, ReplyKind::Greeting, now).await;
        }

        let missing = match self.escalation.evaluate(memory) {
            EscalationState::NewlyComplete => {
                self.escalate(memory).await;
                let service = memory.context.service_type.unwrap_or(ServiceType::Unknown);
                let reply =
                    replies::escalation_ack(memory.language, memory.user_name.as_deref(), service);
                return self.deliver(memory, reply, ReplyKind::Escalation, now).await;
            }
            EscalationState::AlreadyComplete => Vec::new(),
            EscalationState::Incomplete { missing } => missing,
        };
        let missing: Vec<String> = missing
            .iter()
            .map(|category| category.key().replace('_', " "))
            .collect();

        let (reply, kind) = self.complete(memory, &prompt_ctx, text, &missing).await;
        self.deliver(memory, reply, kind, now).await
    }

    /// Clear a human takeover immediately, ahead of the cool-down.
    pub async fn resume(&self, conversation_id: Uuid) -> Result<(), PipelineError> {
        let cached = self.index.lock().await.get(&conversation_id).cloned();
        let address = match cached {
            Some(address) => address,
            None => {
                self.store
                    .find_conversation(&conversation_id)
                    .await?
                    .ok_or(PipelineError::UnknownConversation(conversation_id))?
                    .contact_address
            }
        };

        let mut guard = self.contact(&address).await;
        let Some(memory) = guard.as_mut() else {
            return Err(PipelineError::UnknownConversation(conversation_id));
        };
        TakeoverArbiter::resume(&mut memory.context);
        self.writer.update(memory.conversation_id, memory.patch());
        info!("Automated replies resumed for conversation {conversation_id} ({address})");
        Ok(())
    }

    /// Send an operator-written message and record it on the conversation.
    /// The conversation stays with the operator for the cool-down window.
    pub async fn send_manual(&self, address: &str, text: &str) -> Result<(), PipelineError> {
        self.sender.send_text(address, text).await?;

        let mut guard = self.contact(address).await;
        let Some(memory) = guard.as_mut() else {
            return Ok(());
        };
        let now = Utc::now();
        if TakeoverArbiter::state(&memory.context, now) == ArbiterState::AiActive {
            self.arbiter.engage(&mut memory.context, now);
        }
        memory.history.push(Turn {
            sender: Sender::Ai,
            content: text.to_string(),
            timestamp: now,
        });
        memory.context.analytics.outbound_messages += 1;
        self.writer.append(NewMessage {
            conversation_id: memory.conversation_id,
            content: text.to_string(),
            sender: Sender::Ai,
            intent: Some("operator".to_string()),
            entities: Vec::new(),
            timestamp: now,
        });
        self.writer.update(memory.conversation_id, memory.patch());
        info!("Operator message sent to {address}");
        Ok(())
    }

    pub async fn set_self_address(&self, address: Option<String>) {
        self.filter.write().await.set_self_address(address);
    }

    /// Wait for queued persistence writes.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// A copy of the cached memory for `address`, if it has been loaded.
    pub async fn memory(&self, address: &str) -> Option<ContactMemory> {
        let slot = self
            .contacts
            .lock()
            .await
            .get(address)
            .map(|entry| Arc::clone(&entry.slot))?;
        let guard = slot.lock().await;
        guard.clone()
    }

    pub async fn cached_contacts(&self) -> usize {
        self.contacts.lock().await.len()
    }

    /// Drop cached memory for contacts untouched for at least `idle`.
    /// Memory is reloaded from the store on the contact's next message;
    /// queued writes are flushed first so the reload sees them. Returns the
    /// number of contacts dropped.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        self.writer.flush().await;
        let now = Instant::now();
        let mut evicted = Vec::new();
        self.contacts.lock().await.retain(|_, entry| {
            // Only the map holds the slot, and it cannot be cloned while
            // the map is locked.
            let unused = Arc::strong_count(&entry.slot) == 1;
            if unused && now.saturating_duration_since(entry.last_used) >= idle {
                let id = entry
                    .slot
                    .try_lock()
                    .ok()
                    .and_then(|memory| memory.as_ref().map(|m| m.conversation_id));
                evicted.push(id);
                return false;
            }
            true
        });
        if evicted.is_empty() {
            return 0;
        }
        let mut index = self.index.lock().await;
        for id in evicted.iter().flatten() {
            index.remove(id);
        }
        debug!("Evicted {} idle contacts from the cache", evicted.len());
        evicted.len()
    }

    /// Lock the contact's memory, loading it on first use. Holding the
    /// guard serializes processing per contact.
    async fn contact(&self, address: &str) -> OwnedMutexGuard<Option<ContactMemory>> {
        let slot = {
            let mut contacts = self.contacts.lock().await;
            let entry = contacts
                .entry(address.to_string())
                .or_insert_with(|| CacheEntry {
                    slot: Slot::default(),
                    last_used: Instant::now(),
                });
            entry.last_used = Instant::now();
            Arc::clone(&entry.slot)
        };
        let mut guard = slot.lock_owned().await;
        if guard.is_none() {
            let memory = self.load(address).await;
            self.index
                .lock()
                .await
                .insert(memory.conversation_id, address.to_string());
            *guard = Some(memory);
        }
        guard
    }

    async fn load(&self, address: &str) -> ContactMemory {
        let limit = self.config.history_limit;
        match self.store.find_conversation_by_contact(address).await {
            Ok(Some(conversation)) => {
                let recent = self
                    .store
                    .list_recent_messages(&conversation.id, limit)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Failed to load history for {address}: {e}");
                        Vec::new()
                    });
                debug!(
                    "Restored conversation {} for {address} with {} turns",
                    conversation.id,
                    recent.len()
                );
                ContactMemory::restore(conversation, recent, limit)
            }
            Ok(None) => {
                let conversation = self
                    .store
                    .create_conversation(address, &ConversationContext::default())
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Failed to create conversation for {address}: {e}; keeping it in memory");
                        Conversation::detached(address, ConversationContext::default())
                    });
                info!("New conversation {} for {address}", conversation.id);
                ContactMemory::new(conversation, limit)
            }
            Err(e) => {
                warn!("Failed to look up conversation for {address}: {e}; keeping it in memory");
                ContactMemory::new(
                    Conversation::detached(address, ConversationContext::default()),
                    limit,
                )
            }
        }
    }

    async fn escalate(&self, memory: &mut ContactMemory) {
        let notice = EscalationNotice {
            conversation_id: memory.conversation_id,
            contact_address: memory.contact_address.clone(),
            customer_name: memory.user_name.clone(),
            service_type: memory.context.service_type.unwrap_or(ServiceType::Unknown),
            details: memory.details.to_string(),
            language: memory.language,
        };
        match tokio::time::timeout(self.config.notify_timeout, self.notifier.notify(&notice)).await
        {
            Ok(Ok(())) => info!(
                "Escalated conversation {} ({}) to the sales team",
                notice.conversation_id, notice.service_type
            ),
            Ok(Err(e)) => warn!(
                "Escalation notice for conversation {} failed: {e}",
                notice.conversation_id
            ),
            Err(_) => warn!(
                "Escalation notice for conversation {} timed out after {:?}",
                notice.conversation_id, self.config.notify_timeout
            ),
        }
        EscalationEvaluator::mark_complete(memory);
    }

    async fn complete(
        &self,
        memory: &mut ContactMemory,
        ctx: &PromptContext,
        text: &str,
        missing: &[String],
    ) -> (String, ReplyKind) {
        let prompt = self.prompts.build(ctx, text, missing);
        let started = tokio::time::Instant::now();
        let result =
            tokio::time::timeout(self.config.completion_timeout, self.provider.complete(&prompt))
                .await;
        let failure = match result {
            Ok(Ok(reply)) if !reply.trim().is_empty() => {
                let millis = started.elapsed().as_secs_f64() * 1000.0;
                record_completion_latency(&mut memory.context, millis);
                return (reply.trim().to_string(), ReplyKind::Completion);
            }
            Ok(Ok(_)) => "empty completion".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.config.completion_timeout),
        };
        warn!(
            "Completion failed for {}: {failure}; using fallback reply",
            memory.contact_address
        );
        memory.context.analytics.completion_failures += 1;
        memory.context.analytics.fallback_replies += 1;
        (
            replies::fallback(ctx.intent, ctx.language).to_string(),
            ReplyKind::Fallback,
        )
    }

    async fn deliver(
        &self,
        memory: &mut ContactMemory,
        reply: String,
        kind: ReplyKind,
        received_at: DateTime<Utc>,
    ) -> Result<Outcome, PipelineError> {
        let delay = self.config.typing.delay_for(&reply);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Err(e) = self.sender.send_text(&memory.contact_address, &reply).await {
            warn!("Failed to send {kind} reply to {}: {e}", memory.contact_address);
            self.writer.update(memory.conversation_id, memory.patch());
            return Err(PipelineError::Send(e));
        }

        let sent_at = received_at.max(Utc::now());
        record_reply(memory, &reply, sent_at);
        self.writer.append(NewMessage {
            conversation_id: memory.conversation_id,
            content: reply.clone(),
            sender: Sender::Ai,
            intent: None,
            entities: Vec::new(),
            timestamp: sent_at,
        });
        self.writer.update(memory.conversation_id, memory.patch());
        info!("Sent {kind} reply to {}", memory.contact_address);
        Ok(Outcome::Replied { kind, text: reply })
    }
}

#[async_trait]
impl InboundHandler for ResponsePipeline {
    async fn handle(&self, event: InboundEvent) {
        let from = event.from.clone();
        match self.process(event).await {
            Ok(outcome) => debug!("Handled message from {from}: {outcome:?}"),
            Err(e) => warn!("Message from {from} not answered: {e}"),
        }
    }

    async fn connected(&self, self_address: Option<String>) {
        self.set_self_address(self_address).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_delay_is_bounded() {
        let typing = TypingDelay::default();
        assert_eq!(typing.delay_for("hi"), Duration::from_millis(1000));
        assert_eq!(typing.delay_for(&"x".repeat(100)), Duration::from_millis(3500));
        assert_eq!(typing.delay_for(&"x".repeat(1000)), Duration::from_millis(6000));
        assert_eq!(TypingDelay::NONE.delay_for("anything"), Duration::ZERO);
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let typing = TypingDelay {
            min: Duration::from_secs(2),
            max: Duration::from_secs(1),
            per_char: Duration::from_millis(10),
        };
        assert_eq!(typing.delay_for("hello"), Duration::from_secs(2));
    }
}
