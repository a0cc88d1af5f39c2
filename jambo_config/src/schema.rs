use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_DIR: &str = "jambo";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub agency: AgencyConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub escalation: EscalationSettings,
    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgencyConfig {
    #[serde(default = "AgencyConfig::default_name")]
    pub name: String,
    #[serde(default = "AgencyConfig::default_persona")]
    pub persona: String,
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            persona: Self::default_persona(),
        }
    }
}

impl AgencyConfig {
    fn default_name() -> String {
        "Jambo Travel".to_string()
    }

    fn default_persona() -> String {
        "You are a friendly travel consultant for a travel agency that arranges safaris, \
         flights, visas and cargo shipping. Answer briefly, ask one question at a time, \
         and never invent prices."
            .to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub zhipu: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default = "ProviderConfig::default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    fn default_model() -> String {
        "glm-4-flash".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Empty means conversations are kept in process only.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionSettings {
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
    pub max_attempts: u32,
    pub send_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_dir: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            backoff_base_secs: 3,
            backoff_cap_secs: 60,
            max_attempts: 10,
            send_timeout_secs: 20,
            auth_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineSettings {
    pub min_message_len: usize,
    pub max_message_len: usize,
    pub history_limit: usize,
    pub completion_timeout_secs: u64,
    pub takeover_cooldown_mins: i64,
    pub returning_after_hours: i64,
    pub vip_booking_threshold: u64,
    /// Cached contact memory idle this long is dropped and reloaded on demand.
    pub cache_idle_mins: u64,
    pub typing: TypingSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_message_len: 2,
            max_message_len: 1000,
            history_limit: 10,
            completion_timeout_secs: 30,
            takeover_cooldown_mins: 30,
            returning_after_hours: 24,
            vip_booking_threshold: 3,
            cache_idle_mins: 60,
            typing: TypingSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TypingSettings {
    pub min_ms: u64,
    pub max_ms: u64,
    pub per_char_ms: u64,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            min_ms: 1000,
            max_ms: 6000,
            per_char_ms: 35,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EscalationSettings {
    pub fallback_min_categories: usize,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            fallback_min_categories: 4,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NotificationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "EmailConfig::default_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

impl EmailConfig {
    const fn default_port() -> u16 {
        587
    }
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'jambo init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        tracing::debug!("Parsed configuration");
        Ok(config)
    }

    /// Directory for persisted transport credentials.
    pub fn auth_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.session.auth_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("auth")),
        }
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, Self::template())?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add your completion API key under providers.zhipu.api_key");
        println!("   2. Set telegram.token and telegram.enabled");
        println!("   3. Optionally set database.url (empty keeps conversations in memory)");
        println!("   4. Run 'jambo run' to start the assistant");
        println!();
        Ok(())
    }

    #[must_use]
    pub const fn template() -> &'static str {
        r#"{
  "agency": {
    "name": "Jambo Travel",
    "persona": "You are a friendly travel consultant for a travel agency that arranges safaris, flights, visas and cargo shipping. Answer briefly, ask one question at a time, and never invent prices."
  },
  "providers": {
    "zhipu": {
      "api_key": "your-api-key-here",
      "model": "glm-4-flash"
    }
  },
  "telegram": {
    "enabled": true,
    "token": ""
  },
  "database": {
    "url": "sqlite://jambo.db?mode=rwc"
  },
  "session": {
    "backoff_base_secs": 3,
    "backoff_cap_secs": 60,
    "max_attempts": 10,
    "send_timeout_secs": 20
  },
  "pipeline": {
    "min_message_len": 2,
    "max_message_len": 1000,
    "history_limit": 10,
    "completion_timeout_secs": 30,
    "takeover_cooldown_mins": 30,
    "returning_after_hours": 24,
    "vip_booking_threshold": 3,
    "cache_idle_mins": 60,
    "typing": {
      "min_ms": 1000,
      "max_ms": 6000,
      "per_char_ms": 35
    }
  },
  "escalation": {
    "fallback_min_categories": 4
  },
  "notification": {
    "webhook_url": null
  }
}"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses() {
        let config = Config::from_json(Config::template());
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|e| panic!("template should parse: {e}"));
        assert_eq!(config.session.backoff_base_secs, 3);
        assert_eq!(config.session.backoff_cap_secs, 60);
        assert!(config.notification.webhook_url.is_none());
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config = Config::from_json(r#"{"providers":{"zhipu":{"api_key":"k"}}}"#)
            .unwrap_or_else(|e| panic!("minimal config should parse: {e}"));
        assert_eq!(config.providers.zhipu.model, "glm-4-flash");
        assert_eq!(config.pipeline.history_limit, 10);
        assert_eq!(config.escalation.fallback_min_categories, 4);
        assert!(config.database.url.is_empty());
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::from_json(
            r#"{"providers":{"zhipu":{"api_key":"k"}},"session":{"max_attempts":2}}"#,
        )
        .unwrap_or_else(|e| panic!("config should parse: {e}"));
        assert_eq!(config.session.max_attempts, 2);
        assert_eq!(config.session.send_timeout_secs, 20);
    }

    #[test]
    fn explicit_auth_dir_wins() {
        let mut config = Config::from_json(r#"{"providers":{"zhipu":{"api_key":"k"}}}"#)
            .unwrap_or_else(|e| panic!("config should parse: {e}"));
        config.session.auth_dir = Some(PathBuf::from("/tmp/jambo-auth"));
        assert_eq!(
            config.auth_dir().ok(),
            Some(PathBuf::from("/tmp/jambo-auth"))
        );
    }
}
