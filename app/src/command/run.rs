use std::sync::Arc;
use std::time::Duration;

use jambo_analysis::FilterConfig;
use jambo_config::Config;
use jambo_conversation::{
    EscalationPolicy, MergePolicy, PipelineConfig, ResponsePipeline, TypingDelay,
};
use jambo_core::{InboundHandler, MessageSender, Notifier};
use jambo_notify::{EmailNotifier, EmailSettings, FanoutNotifier, LogNotifier, WebhookNotifier};
use jambo_providers::ZhipuProvider;
use jambo_session::{
    BackoffPolicy, FileCredentialStore, Operator, SessionConfig, SessionManager, TerminalQrSink,
    run_console,
};
use jambo_telegram::TelegramTransport;
use tokio::io::BufReader;
use tracing::{error, info, warn};

use crate::command::CommandStrategy;

pub struct RunInput {
    /// Optional bot token (overrides config)
    pub token: Option<String>,
}

/// Wires the engine together and runs until Ctrl-C or `quit`.
pub struct RunStrategy;

fn pipeline_config(config: &Config) -> PipelineConfig {
    let p = &config.pipeline;
    PipelineConfig {
        agency_name: config.agency.name.clone(),
        persona: config.agency.persona.clone(),
        filter: FilterConfig {
            min_len: p.min_message_len,
            max_len: p.max_message_len,
            ..FilterConfig::default()
        },
        history_limit: p.history_limit,
        completion_timeout: Duration::from_secs(p.completion_timeout_secs),
        takeover_cooldown: chrono::Duration::minutes(p.takeover_cooldown_mins),
        merge: MergePolicy {
            returning_after: chrono::Duration::hours(p.returning_after_hours),
            vip_booking_threshold: p.vip_booking_threshold,
        },
        escalation: EscalationPolicy {
            fallback_min_categories: config.escalation.fallback_min_categories,
        },
        typing: TypingDelay {
            min: Duration::from_millis(p.typing.min_ms),
            max: Duration::from_millis(p.typing.max_ms),
            per_char: Duration::from_millis(p.typing.per_char_ms),
        },
        ..PipelineConfig::default()
    }
}

fn session_config(config: &Config) -> SessionConfig {
    let s = &config.session;
    SessionConfig {
        backoff: BackoffPolicy {
            base: Duration::from_secs(s.backoff_base_secs),
            cap: Duration::from_secs(s.backoff_cap_secs),
            max_attempts: s.max_attempts,
        },
        send_timeout: Duration::from_secs(s.send_timeout_secs),
    }
}

fn notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    let mut fanout = FanoutNotifier::new().with("log", Arc::new(LogNotifier));
    if let Some(url) = &config.notification.webhook_url {
        fanout = fanout.with("webhook", Arc::new(WebhookNotifier::new(url.clone())));
    }
    if let Some(email) = &config.notification.email {
        let settings = EmailSettings {
            smtp_host: email.smtp_host.clone(),
            smtp_port: email.smtp_port,
            username: email.username.clone(),
            password: email.password.clone(),
            from: email.from.clone(),
            to: email.to.clone(),
        };
        fanout = fanout.with("email", Arc::new(EmailNotifier::new(&settings)?));
    }
    info!("Lead notifications go to: {}", fanout.names().join(", "));
    Ok(Arc::new(fanout))
}

impl CommandStrategy for RunStrategy {
    type Input = RunInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        info!("Loaded config from ~/jambo/config.json");

        let token = match input.token {
            Some(token) => token,
            None if config.telegram.enabled => config.telegram.token.clone(),
            None => anyhow::bail!("No transport enabled. Set telegram.enabled and telegram.token"),
        };
        if token.is_empty() {
            anyhow::bail!("Telegram token is empty. Set telegram.token or pass --token");
        }
        let zhipu = &config.providers.zhipu;
        if zhipu.api_key.is_empty() {
            anyhow::bail!("Completion API key is empty. Set providers.zhipu.api_key");
        }

        let store = jambo_storage::open(&config.database.url).await?;
        let mut provider = ZhipuProvider::new(zhipu.api_key.clone(), zhipu.model.clone());
        if let Some(base_url) = &zhipu.base_url {
            provider = provider.with_base_url(base_url.clone());
        }
        let notifier = notifier(&config)?;

        let auth_dir = config.auth_dir()?;
        info!("Credentials directory: {}", auth_dir.display());
        let session = Arc::new(SessionManager::new(
            Arc::new(TelegramTransport::new(token)),
            Arc::new(FileCredentialStore::new(auth_dir)),
            Arc::new(TerminalQrSink),
            session_config(&config),
        ));
        let pipeline = Arc::new(ResponsePipeline::new(
            pipeline_config(&config),
            store,
            Arc::new(provider),
            Arc::clone(&session) as Arc<dyn MessageSender>,
            notifier,
        ));
        let operator = Operator::new(Arc::clone(&session), Arc::clone(&pipeline));

        let runner = {
            let session = Arc::clone(&session);
            let handler = Arc::clone(&pipeline) as Arc<dyn InboundHandler>;
            tokio::spawn(async move { session.run(handler).await })
        };

        let sweeper = {
            let pipeline = Arc::clone(&pipeline);
            let mins = config.pipeline.cache_idle_mins.max(1);
            let idle = Duration::from_secs(mins.saturating_mul(60));
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(idle);
                tick.tick().await;
                loop {
                    tick.tick().await;
                    pipeline.evict_idle(idle).await;
                }
            })
        };

        println!("jambo is running. Type 'help' for operator commands.");
        let console = run_console(&operator, BufReader::new(tokio::io::stdin()));
        tokio::pin!(console);
        let mut console_open = true;
        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for Ctrl-C: {e}");
                    }
                    info!("Ctrl-C received");
                    break;
                }
                quit = &mut console, if console_open => {
                    if quit {
                        break;
                    }
                    info!("Console input closed; press Ctrl-C to stop");
                    console_open = false;
                }
            }
        }

        sweeper.abort();
        if session.shutdown().is_err() {
            warn!("Session loop had already stopped");
        }
        match runner.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Session ended with an error: {e}"),
            Err(e) => error!("Session task failed: {e}"),
        }
        pipeline.flush().await;
        info!("Pending writes flushed; goodbye");
        Ok(())
    }
}
