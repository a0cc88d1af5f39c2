//! Notification capability used when a conversation becomes complete.

use async_trait::async_trait;
use uuid::Uuid;

use crate::intent::{Language, ServiceType};

/// Payload handed to the sales team when a contact has supplied enough
/// detail to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationNotice {
    pub conversation_id: Uuid,
    pub contact_address: String,
    pub customer_name: Option<String>,
    pub service_type: ServiceType,
    /// Accumulated `category:value` fragments, pipe-delimited.
    pub details: String,
    pub language: Language,
}

impl EscalationNotice {
    /// Split the detail string into `(category, value)` pairs.
    #[must_use]
    pub fn fields(&self) -> Vec<(&str, &str)> {
        self.details
            .split('|')
            .filter_map(|fragment| {
                let (category, value) = fragment.split_once(':')?;
                let value = value.trim();
                (!value.is_empty()).then_some((category.trim(), value))
            })
            .collect()
    }

    #[must_use]
    pub fn subject(&self) -> String {
        let who = self
            .customer_name
            .as_deref()
            .unwrap_or(self.contact_address.as_str());
        format!("New {} lead: {who}", self.service_type.label())
    }

    /// Plain-text rendering shared by the email and log sinks.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut body = String::new();
        body.push_str(&format!("Service: {}\n", self.service_type.label()));
        body.push_str(&format!("Contact: {}\n", self.contact_address));
        if let Some(name) = &self.customer_name {
            body.push_str(&format!("Name: {name}\n"));
        }
        body.push_str(&format!("Language: {}\n", self.language.code()));
        body.push_str(&format!("Conversation: {}\n\n", self.conversation_id));
        for (category, value) in self.fields() {
            body.push_str(&format!("- {category}: {value}\n"));
        }
        body
    }
}

/// Fire-and-forget alert dispatch.
///
/// Idempotency is the caller's responsibility; a sink may be invoked again
/// for the same conversation if the caller's completeness flag is lost.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &EscalationNotice) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(details: &str) -> EscalationNotice {
        EscalationNotice {
            conversation_id: Uuid::nil(),
            contact_address: "254700000001".to_string(),
            customer_name: Some("Amina".to_string()),
            service_type: ServiceType::Visa,
            details: details.to_string(),
            language: Language::English,
        }
    }

    #[test]
    fn fields_skip_malformed_fragments() {
        let n = notice("service:visa|destination:Dubai|garbage|date:");
        assert_eq!(n.fields(), vec![("service", "visa"), ("destination", "Dubai")]);
    }

    #[test]
    fn render_lists_every_field() {
        let text = notice("destination:Dubai|nationality:Kenyan").render_text();
        assert!(text.contains("Name: Amina"));
        assert!(text.contains("- destination: Dubai"));
        assert!(text.contains("- nationality: Kenyan"));
    }

    #[test]
    fn subject_falls_back_to_address() {
        let mut n = notice("");
        n.customer_name = None;
        assert_eq!(n.subject(), "New visa lead: 254700000001");
    }
}
