//! Coarse message classification tags shared by the analysis and
//! conversation crates.

use serde::{Deserialize, Serialize};

/// Coarse intent of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Booking,
    Pricing,
    CargoInquiry,
    VisaInquiry,
    FlightInquiry,
    SafariInquiry,
    ContactRequest,
    Help,
    Greeting,
    Closing,
    General,
}

impl Intent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Pricing => "pricing",
            Self::CargoInquiry => "cargo_inquiry",
            Self::VisaInquiry => "visa_inquiry",
            Self::FlightInquiry => "flight_inquiry",
            Self::SafariInquiry => "safari_inquiry",
            Self::ContactRequest => "contact_request",
            Self::Help => "help",
            Self::Greeting => "greeting",
            Self::Closing => "closing",
            Self::General => "general",
        }
    }

    /// Booking and pricing questions count as service inquiries.
    #[must_use]
    pub const fn is_service_inquiry(&self) -> bool {
        matches!(
            self,
            Self::Booking
                | Self::Pricing
                | Self::CargoInquiry
                | Self::VisaInquiry
                | Self::FlightInquiry
                | Self::SafariInquiry
        )
    }

    /// Whether a message with this intent warrants a reply on its own,
    /// without being a continuation of a bot question.
    #[must_use]
    pub const fn warrants_reply(&self) -> bool {
        self.is_service_inquiry()
            || matches!(self, Self::ContactRequest | Self::Help | Self::Greeting)
    }

    #[must_use]
    pub const fn service_type(&self) -> Option<ServiceType> {
        match self {
            Self::CargoInquiry => Some(ServiceType::Cargo),
            Self::VisaInquiry => Some(ServiceType::Visa),
            Self::FlightInquiry => Some(ServiceType::Flight),
            Self::SafariInquiry => Some(ServiceType::Safari),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply language. English is the default; Swahili is the secondary
/// regional language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Swahili,
}

impl Language {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Swahili => "sw",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "sw" | "swahili" => Self::Swahili,
            _ => Self::English,
        }
    }
}

/// Service line a conversation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Cargo,
    Visa,
    Flight,
    Safari,
    Unknown,
}

impl ServiceType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Visa => "visa",
            Self::Flight => "flight",
            Self::Safari => "safari",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cargo => "cargo & logistics",
            Self::Visa => "visa",
            Self::Flight => "flight ticket",
            Self::Safari => "safari & tour",
            Self::Unknown => "travel",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "cargo" => Some(Self::Cargo),
            "visa" => Some(Self::Visa),
            "flight" => Some(Self::Flight),
            "safari" => Some(Self::Safari),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of an extracted client detail fragment (`category:value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Service,
    Origin,
    Destination,
    Date,
    Name,
    Email,
    Phone,
    GroupSize,
    Nationality,
    Cargo,
    Weight,
}

impl FieldCategory {
    pub const ALL: [Self; 11] = [
        Self::Service,
        Self::Origin,
        Self::Destination,
        Self::Date,
        Self::Name,
        Self::Email,
        Self::Phone,
        Self::GroupSize,
        Self::Nationality,
        Self::Cargo,
        Self::Weight,
    ];

    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Origin => "origin",
            Self::Destination => "destination",
            Self::Date => "date",
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::GroupSize => "group_size",
            Self::Nationality => "nationality",
            Self::Cargo => "cargo",
            Self::Weight => "weight",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl std::fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
