//! Keyword gazetteers used by the classifier, extractor and filter.
//!
//! These are hand-tuned heuristics; extend the tables rather than adding
//! branches to the matchers.

use jambo_core::{Intent, ServiceType};
use regex::Regex;

/// A case-insensitive, word-bounded alternation over a keyword list.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    regex: Option<Regex>,
}

impl KeywordSet {
    #[must_use]
    pub fn new(keywords: &[&str]) -> Self {
        if keywords.is_empty() {
            return Self { regex: None };
        }
        let mut sorted: Vec<&str> = keywords.to_vec();
        // Longest first so multi-word entries win over their prefixes.
        sorted.sort_by_key(|k| std::cmp::Reverse(k.len()));
        let alternation = sorted
            .iter()
            .map(|k| regex::escape(k).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok();
        if regex.is_none() {
            tracing::warn!("Keyword set failed to compile; it will never match");
        }
        Self { regex }
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Number of distinct keywords (lowercased) present in `text`.
    #[must_use]
    pub fn distinct_matches(&self, text: &str) -> usize {
        let Some(re) = &self.regex else {
            return 0;
        };
        let mut seen: Vec<String> = Vec::new();
        for m in re.find_iter(text) {
            let key = m.as_str().to_lowercase();
            if !seen.contains(&key) {
                seen.push(key);
            }
        }
        seen.len()
    }
}

/// Intent keyword table. Order is the tie-break: the first row with a
/// matching keyword wins.
pub const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::Booking,
        &[
            "book",
            "booking",
            "reserve",
            "reservation",
            "confirm my",
            "weka nafasi",
            "nataka kulipia",
        ],
    ),
    (
        Intent::Pricing,
        &[
            "price",
            "prices",
            "pricing",
            "cost",
            "costs",
            "how much",
            "rate",
            "rates",
            "quote",
            "quotation",
            "charges",
            "budget",
            "bei",
            "gharama",
            "ngapi",
        ],
    ),
    (
        Intent::CargoInquiry,
        &[
            "cargo",
            "shipping",
            "ship",
            "freight",
            "logistics",
            "courier",
            "parcel",
            "container",
            "consignment",
            "clearing",
            "mzigo",
            "kusafirisha",
        ],
    ),
    (
        Intent::VisaInquiry,
        &["visa", "visas", "e-visa", "evisa", "work permit", "passport", "viza"],
    ),
    (
        Intent::FlightInquiry,
        &[
            "flight",
            "flights",
            "fly",
            "air ticket",
            "ticket",
            "tickets",
            "airline",
            "plane",
            "return ticket",
            "one way",
            "ndege",
            "tiketi",
        ],
    ),
    (
        Intent::SafariInquiry,
        &[
            "safari",
            "safaris",
            "tour",
            "tours",
            "game drive",
            "holiday",
            "package",
            "excursion",
            "honeymoon",
            "vacation",
            "getaway",
            "utalii",
        ],
    ),
    (
        Intent::ContactRequest,
        &[
            "contact",
            "call me",
            "call you",
            "speak to",
            "talk to",
            "phone number",
            "your number",
            "office",
            "location",
            "address",
            "email you",
            "nipigie",
            "wasiliana",
            "namba yenu",
        ],
    ),
    (
        Intent::Help,
        &[
            "help",
            "assist",
            "assistance",
            "support",
            "services",
            "what do you offer",
            "what do you do",
            "information",
            "info",
            "saidia",
            "msaada",
            "huduma",
        ],
    ),
    (
        Intent::Greeting,
        &[
            "hi",
            "hello",
            "hey",
            "hallo",
            "good morning",
            "good afternoon",
            "good evening",
            "greetings",
            "habari",
            "jambo",
            "hujambo",
            "mambo",
            "niaje",
            "sasa",
            "salaam",
            "salam",
            "shikamoo",
        ],
    ),
    (
        Intent::Closing,
        &[
            "thanks",
            "thank you",
            "bye",
            "goodbye",
            "see you",
            "later",
            "cheers",
            "asante",
            "kwaheri",
            "tutaonana",
        ],
    ),
];

/// Any one of these marks a message as Swahili.
pub const SWAHILI_MARKERS: &[&str] = &[
    "habari",
    "jambo",
    "hujambo",
    "mambo",
    "niaje",
    "shikamoo",
    "asante",
    "sana",
    "sawa",
    "ndiyo",
    "ndio",
    "hapana",
    "karibu",
    "nataka",
    "ningependa",
    "tafadhali",
    "naomba",
    "bei",
    "gani",
    "ngapi",
    "nini",
    "wapi",
    "lini",
    "kesho",
    "mzigo",
    "ndege",
    "tiketi",
    "kwaheri",
    "naitwa",
    "jina langu",
    "msaada",
    "saidia",
    "gharama",
    "watu",
    "wiki ijayo",
    "mwezi ujao",
    "nipigie",
    "rafiki",
];

pub const SERVICE_KEYWORDS: &[(ServiceType, &[&str])] = &[
    (
        ServiceType::Cargo,
        &[
            "cargo",
            "shipping",
            "ship",
            "freight",
            "logistics",
            "courier",
            "parcel",
            "container",
            "consignment",
            "clearing",
            "mzigo",
        ],
    ),
    (
        ServiceType::Visa,
        &["visa", "visas", "e-visa", "evisa", "work permit", "passport", "viza"],
    ),
    (
        ServiceType::Flight,
        &[
            "flight",
            "flights",
            "fly",
            "air ticket",
            "ticket",
            "tickets",
            "airline",
            "plane",
            "ndege",
            "tiketi",
        ],
    ),
    (
        ServiceType::Safari,
        &[
            "safari",
            "safaris",
            "tour",
            "tours",
            "game drive",
            "holiday",
            "honeymoon",
            "excursion",
            "vacation",
            "utalii",
        ],
    ),
];

/// Known places, in canonical spelling.
pub const PLACES: &[&str] = &[
    "Nairobi",
    "Mombasa",
    "Kisumu",
    "Eldoret",
    "Malindi",
    "Diani",
    "Lamu",
    "Watamu",
    "Naivasha",
    "Nakuru",
    "Nanyuki",
    "Maasai Mara",
    "Masai Mara",
    "Amboseli",
    "Tsavo",
    "Samburu",
    "Ol Pejeta",
    "Serengeti",
    "Ngorongoro",
    "Kilimanjaro",
    "Zanzibar",
    "Arusha",
    "Dar es Salaam",
    "Kampala",
    "Entebbe",
    "Kigali",
    "Addis Ababa",
    "Johannesburg",
    "Cape Town",
    "Cairo",
    "Lagos",
    "Dubai",
    "Abu Dhabi",
    "Doha",
    "Jeddah",
    "Riyadh",
    "Mecca",
    "Istanbul",
    "London",
    "Paris",
    "Amsterdam",
    "Frankfurt",
    "New York",
    "Toronto",
    "Mumbai",
    "Delhi",
    "Bangkok",
    "Guangzhou",
    "Shanghai",
    "Beijing",
    "Kenya",
    "Tanzania",
    "Uganda",
    "Rwanda",
    "Ethiopia",
    "South Africa",
    "Egypt",
    "Nigeria",
    "UAE",
    "Qatar",
    "Saudi Arabia",
    "Turkey",
    "UK",
    "USA",
    "Canada",
    "India",
    "China",
    "Japan",
    "Thailand",
    "Schengen",
    "Europe",
];

/// Demonyms accepted as nationality, in canonical spelling.
pub const DEMONYMS: &[&str] = &[
    "Kenyan",
    "Tanzanian",
    "Ugandan",
    "Rwandan",
    "Burundian",
    "Somali",
    "Ethiopian",
    "South Sudanese",
    "Congolese",
    "Nigerian",
    "Ghanaian",
    "South African",
    "Egyptian",
    "Indian",
    "Pakistani",
    "Chinese",
    "British",
    "American",
    "Canadian",
    "German",
    "French",
    "Italian",
];

/// Keyword clusters typical of scam broadcasts. Two or more distinct hits
/// mark a message as spam.
pub const SCAM_KEYWORDS: &[&str] = &[
    "bitcoin",
    "crypto",
    "forex",
    "investment opportunity",
    "double your",
    "guaranteed returns",
    "lottery",
    "jackpot",
    "you have won",
    "winner",
    "claim your prize",
    "click here",
    "free money",
    "instant loan",
    "betting tips",
    "casino",
    "wire transfer",
    "send your pin",
];

/// Words that look like a name after "I am" but are not one.
pub const NOT_NAMES: &[&str] = &[
    "Going", "Looking", "Interested", "Planning", "Travelling", "Traveling", "Coming", "Here",
    "From", "Not", "Just", "Still", "Also", "So", "Very", "Fine", "Good", "Okay", "Ok",
    "Ready", "Available", "Sure", "Trying", "Asking", "Writing", "Thinking", "Back", "In",
    "At", "On", "A", "An", "The", "Currently", "Hoping", "Flying",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_set_respects_word_boundaries() {
        let set = KeywordSet::new(&["hi"]);
        assert!(set.is_match("Hi there"));
        assert!(!set.is_match("this is a shipment"));
    }

    #[test]
    fn multi_word_keywords_tolerate_extra_spaces() {
        let set = KeywordSet::new(&["how much"]);
        assert!(set.is_match("HOW   MUCH is it"));
    }

    #[test]
    fn distinct_matches_counts_each_keyword_once() {
        let set = KeywordSet::new(SCAM_KEYWORDS);
        assert_eq!(set.distinct_matches("crypto crypto crypto"), 1);
        assert_eq!(set.distinct_matches("Crypto and forex, click here"), 3);
    }

    #[test]
    fn empty_set_never_matches() {
        let set = KeywordSet::new(&[]);
        assert!(!set.is_match("anything"));
        assert_eq!(set.distinct_matches("anything"), 0);
    }
}
