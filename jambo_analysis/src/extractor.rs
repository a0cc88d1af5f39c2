//! Entity extraction.
//!
//! A fixed set of matchers (gazetteers for places, services and demonyms;
//! regular patterns for dates, quantities, emails and phone numbers) run
//! over the message. Whatever fires is returned; nothing fires means an
//! empty [`ExtractedEntities`].

use std::collections::HashMap;

use jambo_core::{FieldCategory, ServiceType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::lexicon::{DEMONYMS, KeywordSet, NOT_NAMES, PLACES, SERVICE_KEYWORDS};

const MONTHS: &str = "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub service_types: Vec<ServiceType>,
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    pub dates: Vec<String>,
    pub group_size: Option<u32>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub name: Option<String>,
    pub nationality: Option<String>,
    pub cargo_description: Option<String>,
    pub cargo_weight: Option<String>,
    /// Message text with every matched span removed.
    pub remainder: String,
}

impl ExtractedEntities {
    /// Extracted values as `(category, value)` fragments, in a stable order.
    #[must_use]
    pub fn fragments(&self) -> Vec<(FieldCategory, String)> {
        let mut out = Vec::new();
        for service in &self.service_types {
            out.push((FieldCategory::Service, service.as_str().to_string()));
        }
        for origin in &self.origins {
            out.push((FieldCategory::Origin, origin.clone()));
        }
        for destination in &self.destinations {
            out.push((FieldCategory::Destination, destination.clone()));
        }
        for date in &self.dates {
            out.push((FieldCategory::Date, date.clone()));
        }
        if let Some(size) = self.group_size {
            out.push((FieldCategory::GroupSize, size.to_string()));
        }
        if let Some(email) = &self.contact_email {
            out.push((FieldCategory::Email, email.clone()));
        }
        if let Some(phone) = &self.contact_phone {
            out.push((FieldCategory::Phone, phone.clone()));
        }
        if let Some(name) = &self.name {
            out.push((FieldCategory::Name, name.clone()));
        }
        if let Some(nationality) = &self.nationality {
            out.push((FieldCategory::Nationality, nationality.clone()));
        }
        if let Some(cargo) = &self.cargo_description {
            out.push((FieldCategory::Cargo, cargo.clone()));
        }
        if let Some(weight) = &self.cargo_weight {
            out.push((FieldCategory::Weight, weight.clone()));
        }
        out
    }

    /// Fragments rendered as `category:value` strings, as stored on messages.
    #[must_use]
    pub fn entity_strings(&self) -> Vec<String> {
        self.fragments()
            .into_iter()
            .map(|(category, value)| format!("{category}:{value}"))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments().is_empty()
    }

    /// The first service type mentioned, if any.
    #[must_use]
    pub fn primary_service(&self) -> Option<ServiceType> {
        self.service_types.first().copied()
    }
}

struct Patterns {
    place: Option<Regex>,
    place_names: HashMap<String, &'static str>,
    demonym: Option<Regex>,
    demonym_names: HashMap<String, &'static str>,
    dates: Vec<Regex>,
    group_size: Vec<Regex>,
    email: Option<Regex>,
    phone: Option<Regex>,
    name_intro: Option<Regex>,
    self_intro: Option<Regex>,
    cargo: Option<Regex>,
    weight: Option<Regex>,
}

fn alternation(words: &[&str]) -> String {
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by_key(|w| std::cmp::Reverse(w.len()));
    sorted
        .iter()
        .map(|w| regex::escape(w).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|")
}

fn canonical_map(words: &[&'static str]) -> HashMap<String, &'static str> {
    words.iter().map(|w| (normalize_key(w), *w)).collect()
}

fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compile a built-in pattern. A pattern that fails to compile is logged
/// and its matcher stays silent.
fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| warn!("Extraction pattern failed to compile: {e}"))
        .ok()
}

static PATTERNS: Lazy<Patterns> = Lazy::new(|| Patterns {
    place: compile(&format!(r"(?i)\b(from\s+)?({})\b", alternation(PLACES))),
    place_names: canonical_map(PLACES),
    demonym: compile(&format!(r"(?i)\b({})\b", alternation(DEMONYMS))),
    demonym_names: canonical_map(DEMONYMS),
    dates: [
        compile(r"\b\d{1,2}[/\-]\d{1,2}(?:[/\-]\d{2,4})?\b"),
        compile(&format!(
            r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:of\s+)?(?:{MONTHS})\b(?:\s+\d{{4}})?"
        )),
        compile(&format!(
            r"(?i)\b(?:{MONTHS})\s+\d{{1,2}}(?:st|nd|rd|th)?\b(?:,?\s+\d{{4}})?"
        )),
        compile(&format!(
            r"(?i)\b(?:today|tomorrow|tonight|this\s+weekend|(?:next|this)\s+(?:week|month|year|{WEEKDAYS})|in\s+\d{{1,2}}\s+(?:days|weeks|months)|kesho|wiki\s+ijayo|mwezi\s+ujao|mwaka\s+ujao)\b"
        )),
        compile(
            r"(?i)\b(?:in|during|for)\s+(january|february|march|april|june|july|august|september|october|november|december)\b",
        ),
    ]
    .into_iter()
    .flatten()
    .collect(),
    group_size: [
        compile(
            r"(?i)\b(\d{1,3}|one|two|three|four|five|six|seven|eight|nine|ten|twelve|twenty)\s+(?:people|persons|pax|adults|guests|travell?ers|of\s+us|watu)\b",
        ),
        compile(
            r"(?i)\b(?:we\s+are|we're|group\s+of|family\s+of|party\s+of|tuko)\s+(\d{1,3}|two|three|four|five|six|seven|eight|nine|ten|twelve|twenty)\b",
        ),
    ]
    .into_iter()
    .flatten()
    .collect(),
    email: compile(r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b"),
    phone: compile(r"\+?\d[\d\s\-]{7,16}\d"),
    name_intro: compile(
        r"(?i:\b(?:my\s+name\s+is|my\s+name's|call\s+me|jina\s+langu\s+ni|naitwa|name\s*:))\s*([A-Za-z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+)?)",
    ),
    self_intro: compile(r"\b(?:I\s+am|I'm|This\s+is|this\s+is)\s+([A-Z][a-z]{1,20})\b"),
    cargo: compile(
        r"(?i)\b(?:ship|shipping|export|exporting|import|importing|freight|cargo\s+of|consignment\s+of|goods:)\s+(?:my\s+|some\s+|a\s+|an\s+|the\s+|our\s+)?([a-z0-9][a-z0-9 ]{1,40}?)(?:\s+(?:from|to|via|by|on|weighing|worth|next|this|in)\b|[.,!?;]|$)",
    ),
    weight: compile(r"(?i)\b(\d+(?:\.\d+)?)\s*(kg|kgs|kilograms?|kilos?|tons?|tonnes?)\b"),
});

fn patterns() -> &'static Patterns {
    &PATTERNS
}

fn word_number(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    if let Ok(n) = lower.parse::<u32>() {
        return Some(n);
    }
    Some(match lower.as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "twelve" => 12,
        "twenty" => 20,
        _ => return None,
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
        list.push(value);
    }
}

/// Byte ranges already claimed by a matcher.
#[derive(Default)]
struct Spans(Vec<(usize, usize)>);

impl Spans {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.0.iter().any(|&(s, e)| start < e && s < end)
    }

    fn claim(&mut self, start: usize, end: usize) {
        self.0.push((start, end));
    }

    fn remainder(mut self, text: &str) -> String {
        self.0.sort_unstable();
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end) in self.0 {
            if start > cursor {
                out.push_str(&text[cursor..start]);
                out.push(' ');
            }
            cursor = cursor.max(end);
        }
        if cursor < text.len() {
            out.push_str(&text[cursor..]);
        }
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct Extractor {
    services: Vec<(ServiceType, KeywordSet)>,
}

static DEFAULT: Lazy<Extractor> = Lazy::new(Extractor::new);

impl Extractor {
    #[must_use]
    pub fn shared() -> &'static Self {
        &DEFAULT
    }

    #[must_use]
    pub fn new() -> Self {
        Self {
            services: SERVICE_KEYWORDS
                .iter()
                .map(|(service, keywords)| (*service, KeywordSet::new(keywords)))
                .collect(),
        }
    }

    #[must_use]
    pub fn extract(&self, text: &str) -> ExtractedEntities {
        let p = patterns();
        let mut out = ExtractedEntities::default();
        let mut spans = Spans::default();

        for (service, keywords) in &self.services {
            if keywords.is_match(text) && !out.service_types.contains(service) {
                out.service_types.push(*service);
            }
        }

        if let Some(email) = p.email.as_ref().and_then(|re| re.find(text)) {
            out.contact_email = Some(email.as_str().to_lowercase());
            spans.claim(email.start(), email.end());
        }

        for m in p.phone.iter().flat_map(|re| re.find_iter(text)) {
            if spans.overlaps(m.start(), m.end()) {
                continue;
            }
            let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
            if (9..=15).contains(&digits.len()) {
                let prefix = if m.as_str().starts_with('+') { "+" } else { "" };
                out.contact_phone = Some(format!("{prefix}{digits}"));
                spans.claim(m.start(), m.end());
                break;
            }
        }

        let mut dates: Vec<(usize, usize)> = Vec::new();
        for re in &p.dates {
            for m in re.find_iter(text) {
                if !spans.overlaps(m.start(), m.end())
                    && !dates.iter().any(|&(s, e)| m.start() < e && s < m.end())
                {
                    dates.push((m.start(), m.end()));
                }
            }
        }
        dates.sort_unstable();
        for (start, end) in dates {
            let date = text[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
            push_unique(&mut out.dates, date);
            spans.claim(start, end);
        }

        for caps in p.place.iter().flat_map(|re| re.captures_iter(text)) {
            let (Some(whole), Some(place)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            let canonical = p
                .place_names
                .get(&normalize_key(place.as_str()))
                .map_or_else(|| title_case(place.as_str()), |c| (*c).to_string());
            if caps.get(1).is_some() {
                push_unique(&mut out.origins, canonical);
            } else {
                push_unique(&mut out.destinations, canonical);
            }
            spans.claim(whole.start(), whole.end());
        }

        for re in &p.group_size {
            let Some(caps) = re.captures(text) else {
                continue;
            };
            let (Some(whole), Some(n)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Some(size) = word_number(n.as_str()).filter(|n| *n > 0) {
                out.group_size = Some(size);
                spans.claim(whole.start(), whole.end());
                break;
            }
        }

        if let Some(caps) = p.weight.as_ref().and_then(|re| re.captures(text)) {
            if let (Some(whole), Some(amount), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2)) {
                out.cargo_weight = Some(format!(
                    "{} {}",
                    amount.as_str(),
                    unit.as_str().to_lowercase()
                ));
                spans.claim(whole.start(), whole.end());
            }
        }

        if let Some(goods) = p
            .cargo
            .as_ref()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
        {
            let trimmed = goods.as_str().trim();
            if !trimmed.is_empty() && !spans.overlaps(goods.start(), goods.end()) {
                out.cargo_description = Some(trimmed.to_lowercase());
                spans.claim(goods.start(), goods.end());
            }
        }

        if let Some(m) = p
            .demonym
            .as_ref()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
        {
            let canonical = p
                .demonym_names
                .get(&normalize_key(m.as_str()))
                .map_or_else(|| title_case(m.as_str()), |c| (*c).to_string());
            out.nationality = Some(canonical);
            spans.claim(m.start(), m.end());
        }

        out.name = self.extract_name(text, &out, &mut spans);
        out.remainder = spans.remainder(text);
        out
    }

    fn extract_name(
        &self,
        text: &str,
        found: &ExtractedEntities,
        spans: &mut Spans,
    ) -> Option<String> {
        let p = patterns();
        let (whole, candidate) = p
            .name_intro
            .as_ref()
            .and_then(|re| re.captures(text))
            .or_else(|| p.self_intro.as_ref().and_then(|re| re.captures(text)))
            .and_then(|caps| Some((caps.get(0)?, caps.get(1)?)))?;
        let name = title_case(candidate.as_str());
        let first = name.split_whitespace().next().unwrap_or_default();
        let is_known_word = NOT_NAMES.contains(&first)
            || found.nationality.as_deref() == Some(first)
            || found.destinations.iter().any(|d| d == first)
            || found.origins.iter().any(|o| o == first)
            || self.services.iter().any(|(_, k)| k.is_match(first));
        if is_known_word {
            return None;
        }
        spans.claim(whole.start(), whole.end());
        Some(name)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractedEntities {
        Extractor::new().extract(text)
    }

    #[test]
    fn static_patterns_compile() {
        let p = patterns();
        assert_eq!(p.dates.len(), 5);
        assert_eq!(p.group_size.len(), 2);
        for matcher in [
            &p.place,
            &p.demonym,
            &p.email,
            &p.phone,
            &p.name_intro,
            &p.self_intro,
            &p.cargo,
            &p.weight,
        ] {
            assert!(matcher.is_some());
        }
    }

    #[test]
    fn visa_request_with_destination() {
        let e = extract("I need a visa to Dubai");
        assert_eq!(e.service_types, vec![ServiceType::Visa]);
        assert_eq!(e.destinations, vec!["Dubai".to_string()]);
        assert!(e.origins.is_empty());
    }

    #[test]
    fn origin_and_destination() {
        let e = extract("flight from nairobi to london next week");
        assert_eq!(e.origins, vec!["Nairobi".to_string()]);
        assert_eq!(e.destinations, vec!["London".to_string()]);
        assert_eq!(e.dates, vec!["next week".to_string()]);
        assert_eq!(e.primary_service(), Some(ServiceType::Flight));
    }

    #[test]
    fn dates_in_several_shapes() {
        assert_eq!(extract("my travel date is 12/05").dates, vec!["12/05".to_string()]);
        assert_eq!(
            extract("arriving 3rd of March 2025").dates,
            vec!["3rd of March 2025".to_string()]
        );
        assert_eq!(extract("leaving Dec 20").dates, vec!["Dec 20".to_string()]);
        assert_eq!(extract("tunasafiri kesho").dates, vec!["kesho".to_string()]);
        assert_eq!(extract("sometime in August").dates, vec!["in August".to_string()]);
    }

    #[test]
    fn names_from_introductions() {
        assert_eq!(extract("my name is Amina").name.as_deref(), Some("Amina"));
        assert_eq!(extract("my name is amina").name.as_deref(), Some("Amina"));
        assert_eq!(extract("Naitwa Baraka").name.as_deref(), Some("Baraka"));
        assert_eq!(extract("Hi, I'm Otieno").name.as_deref(), Some("Otieno"));
        assert_eq!(extract("I am Looking for a safari").name, None);
        assert_eq!(extract("I am Kenyan").name, None);
    }

    #[test]
    fn contact_fields_and_nationality() {
        let e = extract("email amina@x.com, passport Kenyan");
        assert_eq!(e.contact_email.as_deref(), Some("amina@x.com"));
        assert_eq!(e.nationality.as_deref(), Some("Kenyan"));
        assert_eq!(e.service_types, vec![ServiceType::Visa]);

        let e = extract("call me on +254 712 345 678");
        assert_eq!(e.contact_phone.as_deref(), Some("+254712345678"));
    }

    #[test]
    fn group_size_patterns() {
        assert_eq!(extract("we are 4 people").group_size, Some(4));
        assert_eq!(extract("a family of five").group_size, Some(5));
        assert_eq!(extract("safari for 12 adults").group_size, Some(12));
        assert_eq!(extract("we are going").group_size, None);
    }

    #[test]
    fn cargo_details() {
        let e = extract("I want to ship 2 cars from Japan to Mombasa, about 3000 kg");
        assert_eq!(e.cargo_description.as_deref(), Some("2 cars"));
        assert_eq!(e.cargo_weight.as_deref(), Some("3000 kg"));
        assert_eq!(e.origins, vec!["Japan".to_string()]);
        assert_eq!(e.destinations, vec!["Mombasa".to_string()]);
        assert_eq!(e.primary_service(), Some(ServiceType::Cargo));
    }

    #[test]
    fn nothing_to_extract() {
        let e = extract("ok");
        assert!(e.is_empty());
        assert_eq!(e.remainder, "ok");
    }

    #[test]
    fn remainder_drops_matched_spans() {
        let e = extract("I need a visa to Dubai please");
        assert_eq!(e.remainder, "I need a visa to please");
    }

    #[test]
    fn fragments_render_as_category_value() {
        let e = extract("my name is Amina");
        assert_eq!(e.entity_strings(), vec!["name:Amina".to_string()]);
    }
}
