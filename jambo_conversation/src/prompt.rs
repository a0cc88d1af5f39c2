//! Completion prompt assembly.
//!
//! The completion service keeps no state between calls, so every prompt
//! restates who the contact is, the recent turns and what is still missing.

use std::fmt::Write;

use jambo_core::{Language, Prompt, Sender};

use crate::merge::PromptContext;

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    agency_name: String,
    persona: String,
}

impl PromptBuilder {
    #[must_use]
    pub const fn new(agency_name: String, persona: String) -> Self {
        Self {
            agency_name,
            persona,
        }
    }

    #[must_use]
    pub fn build(&self, ctx: &PromptContext, message: &str, missing: &[String]) -> Prompt {
        let mut system = format!("{}\n\nYou are writing on behalf of {}.", self.persona, self.agency_name);
        system.push_str(match ctx.language {
            Language::English => " Reply in English.",
            Language::Swahili => " Jibu kwa Kiswahili.",
        });
        system.push_str(" Keep replies under 80 words and do not use markdown.");

        let mut body = String::new();
        let _ = writeln!(body, "# Contact");
        let _ = writeln!(
            body,
            "Name: {}",
            ctx.contact_name.as_deref().unwrap_or("unknown")
        );
        let _ = writeln!(body, "Customer type: {:?}", ctx.customer_type);
        let _ = writeln!(body, "Conversation stage: {}", ctx.flow.as_str());
        let _ = writeln!(body, "Detected intent: {}", ctx.intent);
        let _ = writeln!(body, "Detected language: {}", ctx.language.code());
        if let Some(service) = ctx.service_type {
            let _ = writeln!(body, "Service: {}", service.label());
        }
        if !ctx.client_details.is_empty() {
            let _ = writeln!(body, "Known details: {}", ctx.client_details);
        }
        if !missing.is_empty() {
            let _ = writeln!(
                body,
                "Still needed: {} (ask for one at a time)",
                missing.join(", ")
            );
        }

        if !ctx.recent_turns.is_empty() {
            let _ = writeln!(body, "\n# Recent conversation");
            for turn in &ctx.recent_turns {
                let who = match turn.sender {
                    Sender::User => "Customer",
                    Sender::Ai => "You",
                };
                let _ = writeln!(body, "{who}: {}", turn.content);
            }
        }
        if let Some(question) = &ctx.last_question {
            let _ = writeln!(body, "\nYour last question was: {question}");
        }

        let _ = writeln!(body, "\n# New message\nCustomer: {message}");
        Prompt { system, body }
    }
}
