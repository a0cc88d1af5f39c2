use jambo_config::Config;
use tracing::info;

/// Prints the effective configuration with secrets masked, and checks
/// that the database is reachable.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== jambo Configuration ===\n");

        println!("Agency:");
        println!("  Name: {}", config.agency.name);
        println!("  Persona: {}", truncate(&config.agency.persona, 60));
        println!();

        println!("Completion provider:");
        println!("  API Key: {}", mask_secret(&config.providers.zhipu.api_key));
        println!("  Model: {}", config.providers.zhipu.model);
        if let Some(base_url) = &config.providers.zhipu.base_url {
            println!("  Base URL: {base_url}");
        }
        println!();

        println!("Database:");
        let db_url = &config.database.url;
        if db_url.is_empty() {
            println!("  URL: (none - conversations kept in memory)");
        } else {
            println!("  URL: {}", mask_database_url(db_url));
            info!("Testing database connection");
            match jambo_storage::open(db_url).await {
                Ok(_) => println!("  Status: Connected"),
                Err(e) => {
                    println!("  Status: Connection failed");
                    println!("  Error: {e}");
                }
            }
        }
        println!();

        let session = &config.session;
        println!("Session:");
        println!(
            "  Backoff: {}s base, {}s cap, {} attempts",
            session.backoff_base_secs, session.backoff_cap_secs, session.max_attempts
        );
        println!("  Send Timeout: {}s", session.send_timeout_secs);
        println!("  Auth Dir: {}", config.auth_dir()?.display());
        println!();

        let pipeline = &config.pipeline;
        println!("Pipeline:");
        println!(
            "  Message Length: {}..={}",
            pipeline.min_message_len, pipeline.max_message_len
        );
        println!("  History Limit: {}", pipeline.history_limit);
        println!("  Completion Timeout: {}s", pipeline.completion_timeout_secs);
        println!("  Takeover Cool-down: {}min", pipeline.takeover_cooldown_mins);
        println!(
            "  Returning After: {}h, VIP After: {} bookings",
            pipeline.returning_after_hours, pipeline.vip_booking_threshold
        );
        println!(
            "  Typing: {}..={}ms, {}ms/char",
            pipeline.typing.min_ms, pipeline.typing.max_ms, pipeline.typing.per_char_ms
        );
        println!(
            "  Fallback Escalation Categories: {}",
            config.escalation.fallback_min_categories
        );
        println!();

        println!("Telegram:");
        println!("  Enabled: {}", config.telegram.enabled);
        println!("  Token: {}", mask_secret(&config.telegram.token));
        println!();

        println!("Notification:");
        println!(
            "  Webhook: {}",
            config.notification.webhook_url.as_deref().unwrap_or("(not set)")
        );
        match &config.notification.email {
            Some(email) => println!(
                "  Email: {}:{} -> {}",
                email.smtp_host,
                email.smtp_port,
                email.to.join(", ")
            ),
            None => println!("  Email: (not set)"),
        }

        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        "(not set)".to_string()
    } else if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

fn mask_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let Some((credentials, after_at)) = rest.split_once('@') else {
        return url.to_string();
    };

    let Some((username, _password)) = credentials.split_once(':') else {
        return url.to_string();
    };

    format!("{scheme}://{username}:***@{after_at}")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
