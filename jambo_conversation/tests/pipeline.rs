use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jambo_analysis::RejectReason;
use jambo_conversation::{Outcome, PipelineConfig, ReplyKind, ResponsePipeline, TypingDelay};
use jambo_core::{
    ChatKind, ConversationStore, CustomerType, InboundEvent, Sender, ServiceType,
};
use jambo_storage::MemoryStore;
use jambo_test_utils::{FailingStore, RecordingNotifier, RecordingSender, ScriptedProvider};

const CONTACT: &str = "254700000001";

struct Harness {
    pipeline: ResponsePipeline,
    store: Arc<MemoryStore>,
    provider: Arc<ScriptedProvider>,
    sender: Arc<RecordingSender>,
    notifier: Arc<RecordingNotifier>,
}

fn config() -> PipelineConfig {
    PipelineConfig {
        typing: TypingDelay::NONE,
        ..PipelineConfig::default()
    }
}

fn harness_with(config: PipelineConfig, store: Arc<MemoryStore>) -> Harness {
    let provider = Arc::new(ScriptedProvider::new());
    let sender = Arc::new(RecordingSender::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let pipeline = ResponsePipeline::new(
        config,
        Arc::clone(&store) as Arc<dyn ConversationStore>,
        Arc::clone(&provider) as _,
        Arc::clone(&sender) as _,
        Arc::clone(&notifier) as _,
    );
    Harness {
        pipeline,
        store,
        provider,
        sender,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(config(), Arc::new(MemoryStore::new()))
}

impl Harness {
    async fn say(&self, text: &str) -> Outcome {
        self.pipeline
            .process(InboundEvent::direct(CONTACT, text))
            .await
            .expect("pipeline should not fail")
    }

    async fn conversation_id(&self) -> uuid::Uuid {
        self.store
            .find_conversation_by_contact(CONTACT)
            .await
            .expect("store lookup")
            .expect("conversation should exist")
            .id
    }
}

fn kind(outcome: &Outcome) -> Option<ReplyKind> {
    match outcome {
        Outcome::Replied { kind, .. } => Some(*kind),
        _ => None,
    }
}

#[tokio::test]
async fn first_hello_gets_a_greeting_and_creates_a_conversation() {
    let h = harness();

    let outcome = h.say("hello").await;
    let Outcome::Replied { kind, text } = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(kind, ReplyKind::Greeting);
    assert!(text.contains("Jambo Travel"));
    assert_eq!(h.provider.call_count().await, 0);
    assert_eq!(h.notifier.count().await, 0);
    assert_eq!(h.sender.sent_count().await, 1);

    h.pipeline.flush().await;
    let conversation = h
        .store
        .find_conversation_by_contact(CONTACT)
        .await
        .expect("store lookup")
        .expect("conversation should exist");
    assert_eq!(conversation.context.customer_type, CustomerType::New);
    assert!(conversation.context.asked_name);

    let messages = h.store.messages(&conversation.id).await;
    let senders: Vec<_> = messages.iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::User, Sender::Ai]);
    assert_eq!(messages[0].intent.as_deref(), Some("greeting"));
    assert_eq!(messages[1].intent, None);
}

#[tokio::test]
async fn visa_details_escalate_exactly_once() {
    let h = harness();
    h.provider.push_reply("Great! When are you travelling?").await;
    h.provider.push_reply("Thanks. May I have your name?").await;
    h.provider
        .push_reply("Nice to meet you, Amina. What is your nationality?")
        .await;

    assert_eq!(kind(&h.say("I need a visa to Dubai").await), Some(ReplyKind::Completion));
    assert_eq!(kind(&h.say("my travel date is 12/05").await), Some(ReplyKind::Completion));
    assert_eq!(kind(&h.say("my name is Amina").await), Some(ReplyKind::Completion));
    assert_eq!(h.notifier.count().await, 0);

    let outcome = h.say("email amina@x.com, passport Kenyan").await;
    assert_eq!(kind(&outcome), Some(ReplyKind::Escalation));
    let notices = h.notifier.notices().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].service_type, ServiceType::Visa);
    assert_eq!(notices[0].customer_name.as_deref(), Some("Amina"));
    let fields = notices[0].fields();
    assert!(fields.contains(&("destination", "Dubai")));
    assert!(fields.contains(&("date", "12/05")));
    assert!(fields.contains(&("nationality", "Kenyan")));

    h.say("how much is the visa fee?").await;
    assert_eq!(h.notifier.count().await, 1);

    let memory = h.pipeline.memory(CONTACT).await;
    assert!(memory.is_some_and(|m| m.has_complete_info()));
}

#[tokio::test]
async fn failed_notification_still_latches_completion() {
    let h = harness();
    h.notifier.set_failing(true);
    h.say("I need a visa to Dubai").await;
    h.say("my travel date is 12/05").await;
    h.say("my name is Amina").await;
    let outcome = h.say("email amina@x.com, passport Kenyan").await;

    assert_eq!(kind(&outcome), Some(ReplyKind::Escalation));
    h.say("what documents do I need for the visa?").await;
    assert_eq!(h.notifier.count().await, 1);
}

#[tokio::test]
async fn manager_request_hands_off_and_silences_the_bot() {
    let h = harness();

    let outcome = h.say("I want to speak to a manager, this is urgent").await;
    let Outcome::Replied { kind, text } = outcome else {
        panic!("expected a handoff reply, got {outcome:?}");
    };
    assert_eq!(kind, ReplyKind::Handoff);
    assert!(!text.contains('?'));

    for n in 0..10 {
        let outcome = h.say(&format!("hello, how much for a safari for {n} people?")).await;
        assert!(
            matches!(outcome, Outcome::Suppressed | Outcome::Ignored),
            "message {n} produced {outcome:?}"
        );
    }
    assert_eq!(h.sender.sent_count().await, 1);
    assert_eq!(h.provider.call_count().await, 0);

    h.pipeline.flush().await;
    let id = h.conversation_id().await;
    let inbound = h
        .store
        .messages(&id)
        .await
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count();
    assert_eq!(inbound, 11);

    let memory = h.pipeline.memory(CONTACT).await;
    let context = memory.map(|m| m.context).unwrap_or_default();
    assert!(context.is_human_takeover);
    assert_eq!(context.analytics.takeovers, 1);
}

#[tokio::test]
async fn resume_hands_the_conversation_back() {
    let h = harness();
    h.say("I have a complaint about my booking").await;
    assert!(matches!(h.say("hello there").await, Outcome::Suppressed));

    h.pipeline.flush().await;
    let id = h.conversation_id().await;
    assert!(h.pipeline.resume(id).await.is_ok());

    assert_eq!(kind(&h.say("hello there").await), Some(ReplyKind::Greeting));
    let memory = h.pipeline.memory(CONTACT).await;
    let context = memory.map(|m| m.context).unwrap_or_default();
    assert!(!context.is_human_takeover);
    assert_eq!(context.ai_paused_until, None);
}

#[tokio::test]
async fn resume_of_an_unknown_conversation_is_an_error() {
    let h = harness();
    assert!(h.pipeline.resume(uuid::Uuid::now_v7()).await.is_err());
}

#[tokio::test]
async fn takeover_expires_after_the_cool_down() {
    let h = harness();
    let mut trigger = InboundEvent::direct(CONTACT, "I want a real person");
    trigger.timestamp = Utc::now() - chrono::Duration::hours(2);
    let outcome = h.pipeline.process(trigger).await;
    assert!(matches!(
        outcome,
        Ok(Outcome::Replied {
            kind: ReplyKind::Handoff,
            ..
        })
    ));

    assert_eq!(kind(&h.say("hello").await), Some(ReplyKind::Greeting));
}

#[tokio::test]
async fn operator_message_keeps_the_bot_quiet() {
    let h = harness();
    h.say("hello").await;
    assert!(h.pipeline.send_manual(CONTACT, "Hi, this is Wanjiru from the office").await.is_ok());

    assert!(matches!(h.say("how much is a flight to London?").await, Outcome::Suppressed));
    assert_eq!(h.sender.sent_count().await, 2);
    assert_eq!(
        h.sender.last_text().await.as_deref(),
        Some("Hi, this is Wanjiru from the office")
    );
}

#[tokio::test]
async fn failed_completion_uses_a_fallback() {
    let h = harness();
    h.provider.push_failure("service unavailable").await;

    let outcome = h.say("how much is a safari to the Mara?").await;
    assert_eq!(kind(&outcome), Some(ReplyKind::Fallback));

    let memory = h.pipeline.memory(CONTACT).await;
    let analytics = memory.map(|m| m.context.analytics).unwrap_or_default();
    assert_eq!(analytics.completion_failures, 1);
    assert_eq!(analytics.fallback_replies, 1);
}

#[tokio::test(start_paused = true)]
async fn slow_completion_times_out_into_a_fallback() {
    let h = harness_with(
        PipelineConfig {
            completion_timeout: Duration::from_secs(5),
            ..config()
        },
        Arc::new(MemoryStore::new()),
    );
    h.provider.push_hang().await;

    let outcome = h.say("I want to ship a car to Mombasa").await;
    assert_eq!(kind(&outcome), Some(ReplyKind::Fallback));
}

#[tokio::test]
async fn prompt_carries_the_running_summary() {
    let h = harness();
    h.provider.push_reply("When would you like to travel?").await;
    h.say("I need a visa to Dubai").await;
    h.say("my name is Amina").await;

    let prompts = h.provider.prompts().await;
    assert_eq!(prompts.len(), 2);
    let body = &prompts[1].body;
    assert!(body.contains("Amina"));
    assert!(body.contains("destination:Dubai"));
    assert!(body.contains("When would you like to travel?"));
    assert!(body.contains("Customer: my name is Amina"));
}

#[tokio::test]
async fn chatter_without_a_question_is_not_answered() {
    let h = harness();
    h.provider.push_reply("Your visa is being processed.").await;
    h.say("I need a visa to Dubai").await;

    assert_eq!(h.say("ok thanks").await, Outcome::Ignored);
    assert_eq!(h.sender.sent_count().await, 1);
}

#[tokio::test]
async fn rejected_messages_touch_nothing() {
    let h = harness();
    let mut group = InboundEvent::direct("12345-678@g.us", "hello everyone");
    group.chat_kind = ChatKind::Group;

    let outcome = h.pipeline.process(group).await;
    assert!(matches!(
        outcome,
        Ok(Outcome::Rejected(RejectReason::NonDirectChannel))
    ));
    assert_eq!(h.pipeline.cached_contacts().await, 0);
    assert_eq!(h.store.conversation_count().await, 0);
}

#[tokio::test]
async fn own_messages_are_ignored_once_connected() {
    let h = harness();
    h.pipeline.set_self_address(Some(CONTACT.to_string())).await;
    assert!(matches!(
        h.say("hello").await,
        Outcome::Rejected(RejectReason::OwnMessage)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_from_one_contact_are_not_lost() {
    const N: usize = 20;
    let Harness {
        pipeline,
        store,
        provider,
        sender,
        ..
    } = harness_with(
        PipelineConfig {
            history_limit: 4,
            ..config()
        },
        Arc::new(MemoryStore::new()),
    );
    let pipeline = Arc::new(pipeline);

    let tasks: Vec<_> = (0..N)
        .map(|n| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline
                    .process(InboundEvent::direct(
                        CONTACT,
                        format!("how much is a safari for {} people?", n + 2),
                    ))
                    .await
            })
        })
        .collect();
    for task in tasks {
        let outcome = task.await.expect("task should not panic");
        assert!(matches!(outcome, Ok(Outcome::Replied { .. })));
    }
    pipeline.flush().await;

    let memory = pipeline.memory(CONTACT).await.expect("memory should be cached");
    assert_eq!(memory.context.analytics.inbound_messages, N as u64);
    assert_eq!(memory.history.len(), 4);
    assert_eq!(store.conversation_count().await, 1);
    assert_eq!(pipeline.cached_contacts().await, 1);
    assert_eq!(provider.call_count().await, N);
    assert_eq!(sender.sent_count().await, N);

    let id = memory.conversation_id;
    let inbound = store
        .messages(&id)
        .await
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count();
    assert_eq!(inbound, N);
}

#[tokio::test]
async fn idle_contacts_are_evicted_and_reloaded() {
    let h = harness();
    h.say("hello").await;
    h.say("how much is a safari?").await;
    assert_eq!(h.pipeline.cached_contacts().await, 1);

    assert_eq!(h.pipeline.evict_idle(Duration::from_secs(3600)).await, 0);
    assert_eq!(h.pipeline.evict_idle(Duration::ZERO).await, 1);
    assert_eq!(h.pipeline.cached_contacts().await, 0);

    h.say("and a flight to Mombasa?").await;
    let memory = h.pipeline.memory(CONTACT).await.expect("memory reloaded");
    assert_eq!(memory.context.analytics.inbound_messages, 3);
    assert!(memory.context.asked_name);
    assert_eq!(h.store.conversation_count().await, 1);

    let id = h.conversation_id().await;
    h.pipeline.evict_idle(Duration::ZERO).await;
    assert!(h.pipeline.resume(id).await.is_ok());
}

#[tokio::test]
async fn history_stays_bounded() {
    let h = harness_with(
        PipelineConfig {
            history_limit: 4,
            ..config()
        },
        Arc::new(MemoryStore::new()),
    );
    for n in 0..6 {
        h.say(&format!("how much is a flight for {n} people?")).await;
    }

    let memory = h.pipeline.memory(CONTACT).await;
    let history = memory.map(|m| m.history.to_vec()).unwrap_or_default();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].sender, Sender::Ai);
}

#[tokio::test]
async fn send_failure_is_reported_and_state_kept() {
    let h = harness();
    h.sender.set_failing(true);

    let result = h
        .pipeline
        .process(InboundEvent::direct(CONTACT, "hello"))
        .await;
    assert!(result.is_err());

    let memory = h.pipeline.memory(CONTACT).await;
    let analytics = memory.map(|m| m.context.analytics).unwrap_or_default();
    assert_eq!(analytics.inbound_messages, 1);
    assert_eq!(analytics.outbound_messages, 0);
}

#[tokio::test]
async fn context_survives_a_restart() {
    let store = Arc::new(MemoryStore::new());
    let first = harness_with(config(), Arc::clone(&store));
    first.say("I need a visa to Dubai").await;
    first.say("my name is Amina").await;
    first.pipeline.flush().await;
    drop(first);

    let second = harness_with(config(), store);
    second.say("my travel date is 12/05").await;
    let memory = second.pipeline.memory(CONTACT).await;
    let Some(memory) = memory else {
        panic!("memory should be loaded");
    };
    assert_eq!(memory.user_name.as_deref(), Some("Amina"));
    assert_eq!(memory.context.service_type, Some(ServiceType::Visa));
    assert!(memory.history.len() >= 4);
}

#[tokio::test]
async fn unreachable_store_degrades_to_memory() {
    let provider = Arc::new(ScriptedProvider::new());
    let sender = Arc::new(RecordingSender::new());
    let pipeline = ResponsePipeline::new(
        config(),
        Arc::new(FailingStore),
        provider,
        Arc::clone(&sender) as _,
        Arc::new(RecordingNotifier::new()),
    );

    let outcome = pipeline
        .process(InboundEvent::direct(CONTACT, "hello"))
        .await;
    assert!(matches!(
        outcome,
        Ok(Outcome::Replied {
            kind: ReplyKind::Greeting,
            ..
        })
    ));
    pipeline.flush().await;
    assert_eq!(sender.sent_count().await, 1);
}
