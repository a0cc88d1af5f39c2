//! Human takeover arbitration.
//!
//! Trigger phrases hand a conversation to a human operator and pause
//! automated replies for a cool-down window. Only an explicit resume
//! clears the pause early.

use chrono::{DateTime, Duration, Utc};
use jambo_analysis::KeywordSet;
use jambo_core::ConversationContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeoverReason {
    HumanRequest,
    Complaint,
    Refund,
    Urgency,
}

impl TakeoverReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HumanRequest => "human request",
            Self::Complaint => "complaint",
            Self::Refund => "refund or cancellation",
            Self::Urgency => "urgency",
        }
    }
}

impl std::fmt::Display for TakeoverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const TRIGGERS: &[(TakeoverReason, &[&str])] = &[
    (
        TakeoverReason::HumanRequest,
        &[
            "human",
            "real person",
            "agent",
            "manager",
            "supervisor",
            "customer care",
            "someone real",
            "mtu halisi",
            "meneja",
            "mhudumu",
        ],
    ),
    (
        TakeoverReason::Complaint,
        &[
            "complaint",
            "complain",
            "unacceptable",
            "disappointed",
            "terrible service",
            "poor service",
            "scam",
            "fraud",
            "lalamiko",
            "malalamiko",
        ],
    ),
    (
        TakeoverReason::Refund,
        &[
            "refund",
            "cancel",
            "cancellation",
            "money back",
            "chargeback",
            "rudisha pesa",
            "ghairi",
        ],
    ),
    (
        TakeoverReason::Urgency,
        &[
            "urgent",
            "urgently",
            "emergency",
            "asap",
            "immediately",
            "right now",
            "haraka",
            "dharura",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterState {
    AiActive,
    HumanActive { until: DateTime<Utc> },
}

#[derive(Debug, Clone)]
pub struct TakeoverArbiter {
    triggers: Vec<(TakeoverReason, KeywordSet)>,
    cooldown: Duration,
}

impl TakeoverArbiter {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            triggers: TRIGGERS
                .iter()
                .map(|(reason, phrases)| (*reason, KeywordSet::new(phrases)))
                .collect(),
            cooldown,
        }
    }

    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// The first trigger group that matches `text`.
    #[must_use]
    pub fn detect(&self, text: &str) -> Option<TakeoverReason> {
        self.triggers
            .iter()
            .find(|(_, phrases)| phrases.is_match(text))
            .map(|(reason, _)| *reason)
    }

    #[must_use]
    pub fn state(context: &ConversationContext, now: DateTime<Utc>) -> ArbiterState {
        match context.ai_paused_until {
            Some(until) if context.is_human_takeover && now < until => {
                ArbiterState::HumanActive { until }
            }
            _ => ArbiterState::AiActive,
        }
    }

    /// Hand the conversation to a human. The pause end never moves
    /// backwards.
    pub fn engage(&self, context: &mut ConversationContext, now: DateTime<Utc>) -> DateTime<Utc> {
        let until = context
            .ai_paused_until
            .map_or(now + self.cooldown, |current| current.max(now + self.cooldown));
        context.is_human_takeover = true;
        context.human_takeover_at = Some(now);
        context.ai_paused_until = Some(until);
        context.analytics.takeovers += 1;
        until
    }

    /// Return control to the assistant immediately.
    pub const fn resume(context: &mut ConversationContext) {
        context.is_human_takeover = false;
        context.human_takeover_at = None;
        context.ai_paused_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbiter() -> TakeoverArbiter {
        TakeoverArbiter::new(Duration::minutes(30))
    }

    #[test]
    fn detects_trigger_groups() {
        let a = arbiter();
        assert_eq!(
            a.detect("I want to speak to a manager, this is urgent"),
            Some(TakeoverReason::HumanRequest)
        );
        assert_eq!(a.detect("I want a refund"), Some(TakeoverReason::Refund));
        assert_eq!(a.detect("this is unacceptable"), Some(TakeoverReason::Complaint));
        assert_eq!(a.detect("Nahitaji msaada haraka"), Some(TakeoverReason::Urgency));
        assert_eq!(a.detect("I need a visa to Dubai"), None);
        // Word boundaries keep "agency" from matching "agent".
        assert_eq!(a.detect("is your agency open"), None);
    }

    #[test]
    fn engage_pauses_for_the_cooldown() {
        let a = arbiter();
        let mut ctx = ConversationContext::default();
        let now = Utc::now();
        let until = a.engage(&mut ctx, now);
        assert_eq!(until, now + Duration::minutes(30));
        assert!(ctx.is_human_takeover);
        assert_eq!(ctx.human_takeover_at, Some(now));
        assert_eq!(
            TakeoverArbiter::state(&ctx, now + Duration::minutes(29)),
            ArbiterState::HumanActive { until }
        );
        assert_eq!(
            TakeoverArbiter::state(&ctx, now + Duration::minutes(30)),
            ArbiterState::AiActive
        );
        // Expiry does not clear the record.
        assert!(ctx.ai_paused_until.is_some());
    }

    #[test]
    fn pause_end_never_moves_backwards() {
        let a = arbiter();
        let mut ctx = ConversationContext::default();
        let now = Utc::now();
        ctx.ai_paused_until = Some(now + Duration::hours(2));
        let until = a.engage(&mut ctx, now);
        assert_eq!(until, now + Duration::hours(2));
        assert_eq!(ctx.analytics.takeovers, 1);
    }

    #[test]
    fn resume_clears_immediately() {
        let a = arbiter();
        let mut ctx = ConversationContext::default();
        let now = Utc::now();
        a.engage(&mut ctx, now);
        TakeoverArbiter::resume(&mut ctx);
        assert_eq!(TakeoverArbiter::state(&ctx, now), ArbiterState::AiActive);
        assert!(ctx.human_takeover_at.is_none());
        assert!(ctx.ai_paused_until.is_none());
    }
}
