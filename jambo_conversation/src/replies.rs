//! Fixed reply templates, in English and Swahili.

use jambo_core::{Intent, Language, ServiceType};

const GREETINGS_EN: &[&str] = &[
    "Hello and welcome to {agency}! How can we help with your travel plans today?",
    "Hi there! Thanks for reaching out to {agency}. Are you looking for a safari, a flight, a visa or cargo shipping?",
    "Welcome back to {agency}! What can we arrange for you today?",
];

const GREETINGS_SW: &[&str] = &[
    "Habari! Karibu {agency}. Tunaweza kukusaidiaje na safari yako leo?",
    "Jambo! Asante kwa kuwasiliana na {agency}. Unatafuta safari, tiketi ya ndege, viza au usafirishaji wa mizigo?",
    "Karibu tena {agency}! Tukuandalie nini leo?",
];

/// Greeting template, rotated by how many messages the contact has sent.
/// `ask_name` appends a request for the contact's name.
#[must_use]
pub fn greeting(
    language: Language,
    rotation: u64,
    agency: &str,
    name: Option<&str>,
    ask_name: bool,
) -> String {
    let templates = match language {
        Language::English => GREETINGS_EN,
        Language::Swahili => GREETINGS_SW,
    };
    let index = usize::try_from(rotation).unwrap_or_default() % templates.len();
    let mut reply = templates[index].replace("{agency}", agency);
    if let Some(name) = name {
        reply = format!("{name}, {}", lowercase_first(&reply));
    } else if ask_name {
        reply.push_str(match language {
            Language::English => " May I have your name, please?",
            Language::Swahili => " Naomba jina lako tafadhali?",
        });
    }
    reply
}

/// Acknowledgment sent when a conversation is handed to a human.
#[must_use]
pub const fn handoff(language: Language) -> &'static str {
    match language {
        Language::English => {
            "Thank you, I have passed your message to one of our team members. \
             A consultant will get back to you here shortly."
        }
        Language::Swahili => {
            "Asante, nimepeleka ujumbe wako kwa mmoja wa wafanyakazi wetu. \
             Mshauri atakujibu hapa hivi punde."
        }
    }
}

/// Acknowledgment sent when enough details have been collected.
#[must_use]
pub fn escalation_ack(language: Language, name: Option<&str>, service: ServiceType) -> String {
    let label = service.label();
    match (language, name) {
        (Language::English, Some(name)) => format!(
            "Thank you {name}! We have everything we need for your {label} request. \
             Our team will contact you shortly with the details."
        ),
        (Language::English, None) => format!(
            "Thank you! We have everything we need for your {label} request. \
             Our team will contact you shortly with the details."
        ),
        (Language::Swahili, Some(name)) => format!(
            "Asante {name}! Tumepokea taarifa zote za ombi lako. \
             Timu yetu itawasiliana nawe hivi punde."
        ),
        (Language::Swahili, None) => "Asante! Tumepokea taarifa zote za ombi lako. \
             Timu yetu itawasiliana nawe hivi punde."
            .to_string(),
    }
}

/// Static reply used when the completion service fails.
#[must_use]
pub const fn fallback(intent: Intent, language: Language) -> &'static str {
    match language {
        Language::English => match intent {
            Intent::Booking => {
                "We'd be glad to book that for you. Could you share your travel dates and full name?"
            }
            Intent::Pricing => {
                "Prices depend on dates and group size. When are you planning to travel, and for how many people?"
            }
            Intent::CargoInquiry => {
                "We handle cargo and logistics. What are you shipping, and from where to where?"
            }
            Intent::VisaInquiry => {
                "We can help with your visa. Which country are you travelling to, and what is your nationality?"
            }
            Intent::FlightInquiry => {
                "We can find you a flight. Where are you flying from and to, and on which date?"
            }
            Intent::SafariInquiry => {
                "We'd love to plan your safari. Where would you like to go, and how many people are travelling?"
            }
            Intent::ContactRequest => {
                "A member of our team will reach out to you shortly on this number."
            }
            Intent::Greeting | Intent::Help | Intent::Closing | Intent::General => {
                "Thanks for your message! We offer safaris, flights, visas and cargo shipping. How can we help?"
            }
        },
        Language::Swahili => match intent {
            Intent::Booking => "Tutafurahi kukuwekea nafasi. Tafadhali tuma tarehe za safari na jina lako kamili?",
            Intent::Pricing => "Bei inategemea tarehe na idadi ya watu. Mnapanga kusafiri lini, na mko wangapi?",
            Intent::CargoInquiry => "Tunashughulikia usafirishaji wa mizigo. Unasafirisha nini, kutoka wapi kwenda wapi?",
            Intent::VisaInquiry => "Tunaweza kukusaidia na viza. Unasafiri kwenda nchi gani, na uraia wako ni upi?",
            Intent::FlightInquiry => "Tunaweza kukutafutia tiketi ya ndege. Unasafiri kutoka wapi kwenda wapi, na tarehe gani?",
            Intent::SafariInquiry => "Tungependa kupanga safari yako. Ungependa kwenda wapi, na mko wangapi?",
            Intent::ContactRequest => "Mmoja wa wafanyakazi wetu atawasiliana nawe hivi punde kupitia namba hii.",
            Intent::Greeting | Intent::Help | Intent::Closing | Intent::General => {
                "Asante kwa ujumbe wako! Tunatoa safari, tiketi za ndege, viza na usafirishaji wa mizigo. Tukusaidieje?"
            }
        },
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map_or_else(String::new, |first| first.to_lowercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_rotate() {
        let first = greeting(Language::English, 0, "Jambo Travel", None, false);
        let second = greeting(Language::English, 1, "Jambo Travel", None, false);
        let wrapped = greeting(Language::English, 3, "Jambo Travel", None, false);
        assert_ne!(first, second);
        assert_eq!(first, wrapped);
        assert!(first.contains("Jambo Travel"));
    }

    #[test]
    fn greeting_asks_for_name_only_when_asked() {
        let asked = greeting(Language::English, 0, "Jambo Travel", None, true);
        assert!(asked.ends_with("May I have your name, please?"));
        let known = greeting(Language::Swahili, 0, "Jambo Travel", Some("Amina"), true);
        assert!(known.starts_with("Amina, habari!"));
        assert!(!known.contains("jina"));
    }

    #[test]
    fn every_intent_has_a_fallback_in_both_languages() {
        let intents = [
            Intent::Booking,
            Intent::Pricing,
            Intent::CargoInquiry,
            Intent::VisaInquiry,
            Intent::FlightInquiry,
            Intent::SafariInquiry,
            Intent::ContactRequest,
            Intent::Help,
            Intent::Greeting,
            Intent::Closing,
            Intent::General,
        ];
        for intent in intents {
            assert!(!fallback(intent, Language::English).is_empty());
            assert!(!fallback(intent, Language::Swahili).is_empty());
        }
    }

    #[test]
    fn escalation_ack_mentions_the_service() {
        let ack = escalation_ack(Language::English, Some("Amina"), ServiceType::Visa);
        assert!(ack.starts_with("Thank you Amina!"));
        assert!(ack.contains("visa request"));
        assert!(!ack.contains('?'));
    }
}
