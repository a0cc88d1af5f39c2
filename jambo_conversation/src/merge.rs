//! Context merging.
//!
//! Folds one classified and extracted inbound message into the contact's
//! memory and produces the [`PromptContext`] the completion service sees.

use chrono::{DateTime, Duration, Utc};
use jambo_analysis::{Classification, ExtractedEntities};
use jambo_core::{
    ConversationContext, ConversationFlow, CustomerType, FieldCategory, Intent, Language, Sender,
    ServiceType,
};

use crate::memory::{ContactMemory, Turn};

const MAX_NOTES: usize = 10;
const MIN_NOTE_WORDS: usize = 3;
/// Weight of the newest sample in the completion latency average.
const LATENCY_SMOOTHING: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct MergePolicy {
    /// Gap after which a contact counts as returning.
    pub returning_after: Duration,
    /// Booking intents needed for VIP status.
    pub vip_booking_threshold: u64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            returning_after: Duration::hours(24),
            vip_booking_threshold: 3,
        }
    }
}

/// One inbound message after classification and extraction.
#[derive(Debug, Clone, Copy)]
pub struct TurnInput<'a> {
    pub text: &'a str,
    pub classification: Classification,
    pub extracted: &'a ExtractedEntities,
    pub timestamp: DateTime<Utc>,
}

/// What the completion prompt is built from.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub contact_name: Option<String>,
    /// Turns before the current message, oldest first.
    pub recent_turns: Vec<Turn>,
    pub intent: Intent,
    pub language: Language,
    pub flow: ConversationFlow,
    pub customer_type: CustomerType,
    pub service_type: Option<ServiceType>,
    pub client_details: String,
    pub last_question: Option<String>,
}

/// Merge an inbound message into `memory`.
pub fn merge(memory: &mut ContactMemory, input: &TurnInput<'_>, policy: &MergePolicy) -> PromptContext {
    let intent = input.classification.intent;
    let language = input.classification.language;
    let recent_turns = memory.history.to_vec();
    let had_messages = memory.message_count() > 0;
    let gap = input.timestamp - memory.last_message_at;

    let ctx = &mut memory.context;
    record_inbound(ctx, input.text);
    if intent == Intent::Booking {
        ctx.analytics.booking_intents += 1;
    }

    let derived = derive_customer_type(ctx, had_messages, gap, policy);
    ctx.customer_type = ctx.customer_type.max(derived);
    ctx.conversation_flow = next_flow(ctx.conversation_flow, intent);
    ctx.last_intent = Some(intent);
    ctx.preferences.language = language;
    memory.language = language;

    if ctx.service_type.is_none() {
        ctx.service_type = input
            .extracted
            .primary_service()
            .or_else(|| intent.service_type());
        if let Some(service) = ctx.service_type {
            memory.details.push(FieldCategory::Service, service.as_str());
        }
    }

    for (category, value) in input.extracted.fragments() {
        memory.details.push(category, &value);
    }
    if let Some(name) = &input.extracted.name {
        memory.user_name = Some(name.clone());
    }

    let ctx = &mut memory.context;
    for service in &input.extracted.service_types {
        ctx.interests.insert(service.as_str().to_string());
    }
    for place in &input.extracted.destinations {
        ctx.interests.insert(place.to_lowercase());
    }
    for date in &input.extracted.dates {
        if !ctx.travel_dates.contains(date) {
            ctx.travel_dates.push(date.clone());
        }
    }
    if input.extracted.group_size.is_some() {
        ctx.group_size = input.extracted.group_size;
    }
    if matches!(intent, Intent::General | Intent::Closing) {
        add_note(ctx, &input.extracted.remainder);
    }

    memory.history.push(Turn {
        sender: Sender::User,
        content: input.text.to_string(),
        timestamp: input.timestamp,
    });
    memory.last_message_at = input.timestamp;

    PromptContext {
        contact_name: memory.user_name.clone(),
        recent_turns,
        intent,
        language,
        flow: memory.context.conversation_flow,
        customer_type: memory.context.customer_type,
        service_type: memory.context.service_type,
        client_details: memory.details.to_string(),
        last_question: memory.context.last_question.clone(),
    }
}

/// Record an outbound reply in memory.
pub fn record_reply(memory: &mut ContactMemory, reply: &str, timestamp: DateTime<Utc>) {
    memory.history.push(Turn {
        sender: Sender::Ai,
        content: reply.to_string(),
        timestamp,
    });
    memory.context.analytics.outbound_messages += 1;
    memory.context.last_question = trailing_question(reply);
}

/// Record how long a successful completion took.
pub fn record_completion_latency(context: &mut ConversationContext, millis: f64) {
    let avg = &mut context.analytics.avg_completion_ms;
    *avg = if *avg <= 0.0 {
        millis
    } else {
        LATENCY_SMOOTHING.mul_add(millis - *avg, *avg)
    };
}

fn record_inbound(ctx: &mut ConversationContext, text: &str) {
    let analytics = &mut ctx.analytics;
    analytics.inbound_messages += 1;
    #[expect(
        clippy::cast_precision_loss,
        reason = "Message counts and lengths stay far below f64 precision limits"
    )]
    let (n, len) = (
        analytics.inbound_messages as f64,
        text.chars().count() as f64,
    );
    analytics.avg_inbound_length += (len - analytics.avg_inbound_length) / n;
}

fn derive_customer_type(
    ctx: &ConversationContext,
    had_messages: bool,
    gap: Duration,
    policy: &MergePolicy,
) -> CustomerType {
    if ctx.analytics.booking_intents >= policy.vip_booking_threshold {
        CustomerType::Vip
    } else if had_messages && gap > policy.returning_after {
        CustomerType::Returning
    } else if ctx.analytics.inbound_messages > 1 {
        CustomerType::Ongoing
    } else {
        CustomerType::New
    }
}

const fn next_flow(current: ConversationFlow, intent: Intent) -> ConversationFlow {
    match intent {
        Intent::Booking | Intent::Pricing => ConversationFlow::Negotiation,
        Intent::Closing => ConversationFlow::Closing,
        Intent::Greeting | Intent::General => current,
        _ => match current {
            ConversationFlow::Negotiation => ConversationFlow::Negotiation,
            _ => ConversationFlow::Inquiry,
        },
    }
}

fn add_note(ctx: &mut ConversationContext, remainder: &str) {
    let note = remainder.trim();
    if note.split_whitespace().count() < MIN_NOTE_WORDS {
        return;
    }
    let notes = &mut ctx.preferences.notes;
    if notes.iter().any(|n| n.eq_ignore_ascii_case(note)) {
        return;
    }
    if notes.len() >= MAX_NOTES {
        notes.remove(0);
    }
    notes.push(note.to_string());
}

/// The last sentence of `reply` if it is a question.
fn trailing_question(reply: &str) -> Option<String> {
    let trimmed = reply.trim_end();
    if !trimmed.ends_with('?') {
        return None;
    }
    let body = &trimmed[..trimmed.len() - 1];
    let start = body
        .rfind(['.', '!', '?', '\n'])
        .map_or(0, |i| i + 1);
    let question = trimmed[start..].trim();
    (!question.is_empty()).then(|| question.to_string())
}
