//! Configuration file schema for the jambo engine.
//!
//! The file lives at `~/jambo/config.json`; `jambo init` writes a template.

mod schema;

pub use schema::{
    AgencyConfig, Config, DatabaseConfig, EmailConfig, EscalationSettings, NotificationConfig,
    PipelineSettings, ProviderConfig, ProvidersConfig, SessionSettings, TelegramConfig,
    TypingSettings,
};
