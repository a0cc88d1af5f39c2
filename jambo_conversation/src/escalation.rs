//! Escalation evaluation.
//!
//! Each service type has a checklist of required detail categories. When
//! the accumulated details first satisfy it, the conversation is handed to
//! the sales team exactly once.

use jambo_core::{FieldCategory, ServiceType};

use crate::memory::{ClientDetails, ContactMemory};

/// One checklist entry, satisfied by any of the listed categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement(&'static [FieldCategory]);

impl Requirement {
    #[must_use]
    pub fn is_met(&self, details: &ClientDetails) -> bool {
        self.0.iter().any(|category| details.has(*category))
    }

    /// The category named first, used when reporting what is missing.
    #[must_use]
    pub fn primary(&self) -> Option<FieldCategory> {
        self.0.first().copied()
    }

    #[must_use]
    pub const fn alternatives(&self) -> &'static [FieldCategory] {
        self.0
    }
}

const CARGO: &[Requirement] = &[
    Requirement(&[FieldCategory::Origin]),
    Requirement(&[FieldCategory::Destination]),
    Requirement(&[FieldCategory::Date]),
    Requirement(&[FieldCategory::Name]),
    Requirement(&[FieldCategory::Cargo]),
];

const VISA: &[Requirement] = &[
    Requirement(&[FieldCategory::Destination]),
    Requirement(&[FieldCategory::Date]),
    Requirement(&[FieldCategory::Name]),
    Requirement(&[FieldCategory::Nationality]),
];

const FLIGHT: &[Requirement] = &[
    Requirement(&[FieldCategory::Origin]),
    Requirement(&[FieldCategory::Destination]),
    Requirement(&[FieldCategory::Date]),
    Requirement(&[FieldCategory::Name]),
    Requirement(&[FieldCategory::Email, FieldCategory::Phone]),
];

const SAFARI: &[Requirement] = &[
    Requirement(&[FieldCategory::Destination]),
    Requirement(&[FieldCategory::Date]),
    Requirement(&[FieldCategory::GroupSize]),
    Requirement(&[FieldCategory::Name]),
];

/// The checklist for `service`. Unknown services have no fixed checklist
/// and fall back to a category count.
#[must_use]
pub const fn checklist(service: ServiceType) -> &'static [Requirement] {
    match service {
        ServiceType::Cargo => CARGO,
        ServiceType::Visa => VISA,
        ServiceType::Flight => FLIGHT,
        ServiceType::Safari => SAFARI,
        ServiceType::Unknown => &[],
    }
}

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    /// Distinct detail categories needed when no service type is known.
    pub fallback_min_categories: usize,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            fallback_min_categories: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationState {
    /// Escalated on an earlier message; never fires again.
    AlreadyComplete,
    /// Complete as of this message.
    NewlyComplete,
    Incomplete { missing: Vec<FieldCategory> },
}

#[derive(Debug, Clone, Default)]
pub struct EscalationEvaluator {
    policy: EscalationPolicy,
}

impl EscalationEvaluator {
    #[must_use]
    pub const fn new(policy: EscalationPolicy) -> Self {
        Self { policy }
    }

    /// Categories still missing for `service`.
    #[must_use]
    pub fn missing(&self, service: ServiceType, details: &ClientDetails) -> Vec<FieldCategory> {
        if service == ServiceType::Unknown {
            let have = details
                .categories()
                .into_iter()
                .filter(|c| *c != FieldCategory::Service)
                .count();
            return if have >= self.policy.fallback_min_categories {
                Vec::new()
            } else {
                [
                    FieldCategory::Destination,
                    FieldCategory::Date,
                    FieldCategory::Name,
                    FieldCategory::Phone,
                ]
                .into_iter()
                .filter(|c| !details.has(*c))
                .collect()
            };
        }
        checklist(service)
            .iter()
            .filter(|r| !r.is_met(details))
            .filter_map(Requirement::primary)
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self, service: ServiceType, details: &ClientDetails) -> bool {
        if service == ServiceType::Unknown {
            return details
                .categories()
                .into_iter()
                .filter(|c| *c != FieldCategory::Service)
                .count()
                >= self.policy.fallback_min_categories;
        }
        checklist(service).iter().all(|r| r.is_met(details))
    }

    /// Evaluate without changing anything. Use [`Self::mark_complete`]
    /// once the notification has been attempted.
    #[must_use]
    pub fn evaluate(&self, memory: &ContactMemory) -> EscalationState {
        if memory.has_complete_info() {
            return EscalationState::AlreadyComplete;
        }
        let service = memory.context.service_type.unwrap_or(ServiceType::Unknown);
        if self.is_complete(service, &memory.details) {
            EscalationState::NewlyComplete
        } else {
            EscalationState::Incomplete {
                missing: self.missing(service, &memory.details),
            }
        }
    }

    /// Latch the completeness flag. It is never cleared.
    pub const fn mark_complete(memory: &mut ContactMemory) {
        memory.context.has_complete_info = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jambo_core::{Conversation, ConversationContext};

    fn details(s: &str) -> ClientDetails {
        ClientDetails::parse(s)
    }

    #[test]
    fn visa_checklist() {
        let e = EscalationEvaluator::default();
        let partial = details("service:visa|destination:Dubai|date:12/05|name:Amina");
        assert!(!e.is_complete(ServiceType::Visa, &partial));
        assert_eq!(
            e.missing(ServiceType::Visa, &partial),
            vec![FieldCategory::Nationality]
        );
        let full = details("service:visa|destination:Dubai|date:12/05|name:Amina|nationality:Kenyan");
        assert!(e.is_complete(ServiceType::Visa, &full));
    }

    #[test]
    fn cargo_needs_a_description() {
        let e = EscalationEvaluator::default();
        let d = details("origin:Japan|destination:Mombasa|date:next week|name:Otieno");
        assert_eq!(e.missing(ServiceType::Cargo, &d), vec![FieldCategory::Cargo]);
    }

    #[test]
    fn flight_accepts_email_or_phone() {
        let e = EscalationEvaluator::default();
        let base = "origin:Nairobi|destination:London|date:Dec 20|name:Baraka";
        assert!(!e.is_complete(ServiceType::Flight, &details(base)));
        assert!(e.is_complete(ServiceType::Flight, &details(&format!("{base}|phone:+254712345678"))));
        assert!(e.is_complete(ServiceType::Flight, &details(&format!("{base}|email:b@x.com"))));
    }

    #[test]
    fn unknown_service_counts_distinct_categories() {
        let e = EscalationEvaluator::new(EscalationPolicy {
            fallback_min_categories: 3,
        });
        let d = details("destination:Dubai|destination:Doha|service:unknown|date:kesho");
        assert!(!e.is_complete(ServiceType::Unknown, &d));
        let d = details("destination:Dubai|date:kesho|name:Amina");
        assert!(e.is_complete(ServiceType::Unknown, &d));
        assert!(e.missing(ServiceType::Unknown, &d).is_empty());
    }

    #[test]
    fn evaluation_is_edge_triggered() {
        let e = EscalationEvaluator::default();
        let mut conversation = Conversation::detached("254700000001", ConversationContext::default());
        conversation.context.service_type = Some(ServiceType::Safari);
        conversation.context.client_details =
            "destination:Maasai Mara|date:next month|group_size:4|name:Wanjiru".to_string();
        let mut memory = ContactMemory::new(conversation, 10);

        assert_eq!(e.evaluate(&memory), EscalationState::NewlyComplete);
        EscalationEvaluator::mark_complete(&mut memory);
        assert_eq!(e.evaluate(&memory), EscalationState::AlreadyComplete);
        assert_eq!(e.evaluate(&memory), EscalationState::AlreadyComplete);
    }
}
