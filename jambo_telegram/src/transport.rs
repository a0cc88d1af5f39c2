use std::sync::Mutex;

use async_trait::async_trait;
use jambo_core::{ChatKind, CloseReason, EventSink, InboundEvent, Transport, TransportEvent};
use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{Message, UpdateKind};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Long-polling timeout for `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Transport over the Telegram Bot API. The contact address is the chat
/// id in decimal.
pub struct TelegramTransport {
    bot: Bot,
    me: Mutex<Option<UserId>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramTransport {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            bot: Bot::new(token),
            me: Mutex::new(None),
            poller: Mutex::new(None),
        }
    }

    fn stop_poller(&self) -> bool {
        let handle = self.poller.lock().ok().and_then(|mut p| p.take());
        handle.is_some_and(|h| {
            h.abort();
            true
        })
    }

    async fn send_message(&self, address: &str, text: &str) -> Result<()> {
        let chat = parse_address(address)?;
        self.bot.send_message(chat, text).await?;
        Ok(())
    }
}

fn parse_address(address: &str) -> Result<ChatId> {
    address
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::InvalidAddress(address.to_string()))
}

/// Map a Bot API failure onto the transport close vocabulary.
fn close_reason(error: &RequestError) -> CloseReason {
    match error {
        RequestError::Api(ApiError::InvalidToken) => CloseReason::LoggedOut,
        RequestError::Api(ApiError::TerminatedByOtherGetUpdates) => {
            CloseReason::ConnectionReplaced
        }
        RequestError::RetryAfter(_) => CloseReason::TimedOut,
        other => CloseReason::ConnectionLost(other.to_string()),
    }
}

fn chat_kind(message: &Message) -> ChatKind {
    if message.chat.is_private() {
        ChatKind::Direct
    } else if message.chat.is_channel() {
        ChatKind::Broadcast
    } else {
        ChatKind::Group
    }
}

fn to_inbound(message: &Message, me: UserId) -> InboundEvent {
    let from = message.from.as_ref();
    InboundEvent {
        id: message.id.0.to_string(),
        from: message.chat.id.0.to_string(),
        chat_kind: chat_kind(message),
        from_me: from.is_some_and(|user| user.id == me),
        text: message.text().map(str::to_string),
        sender_name: from.map(teloxide::types::User::full_name),
        timestamp: message.date,
    }
}

async fn poll(bot: Bot, me: UserId, events: EventSink) {
    let mut offset: i32 = 0;
    loop {
        let updates = match bot
            .get_updates()
            .offset(offset)
            .timeout(POLL_TIMEOUT_SECS)
            .await
        {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Telegram polling stopped: {e}");
                let _ = events.send(TransportEvent::Close(close_reason(&e)));
                return;
            }
        };
        for update in updates {
            offset = i32::try_from(update.id.0)
                .unwrap_or(i32::MAX)
                .saturating_add(1);
            if let UpdateKind::Message(message) = update.kind {
                debug!("Telegram update {} from chat {}", update.id.0, message.chat.id);
                if events
                    .send(TransportEvent::Message(to_inbound(&message, me)))
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn connect(&self, events: EventSink) -> anyhow::Result<()> {
        if self.stop_poller() {
            debug!("Replaced previous Telegram poller");
        }
        let bot = self.bot.clone();
        let me = match bot.get_me().await {
            Ok(me) => me,
            Err(e) => {
                let _ = events.send(TransportEvent::Close(close_reason(&e)));
                return Ok(());
            }
        };
        let id = me.user.id;
        info!(
            "Connected to Telegram API: @{} (id: {id})",
            me.user.username.as_deref().unwrap_or("no username")
        );
        if let Ok(mut slot) = self.me.lock() {
            *slot = Some(id);
        }
        let _ = events.send(TransportEvent::CredentialsUpdate(serde_json::json!({
            "botId": id.0,
            "username": me.user.username,
        })));
        let _ = events.send(TransportEvent::Open);

        let handle = tokio::spawn(poll(bot, id, events));
        if let Ok(mut poller) = self.poller.lock() {
            *poller = Some(handle);
        }
        Ok(())
    }

    async fn destroy(&self) -> anyhow::Result<()> {
        if self.stop_poller() {
            info!("Telegram polling stopped");
        }
        Ok(())
    }

    async fn send(&self, address: &str, text: &str) -> anyhow::Result<()> {
        self.send_message(address, text).await?;
        Ok(())
    }

    fn self_address(&self) -> Option<String> {
        self.me
            .lock()
            .ok()
            .and_then(|me| me.map(|id| id.0.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_token_is_a_logout() {
        assert_eq!(
            close_reason(&RequestError::Api(ApiError::InvalidToken)),
            CloseReason::LoggedOut
        );
        assert_eq!(
            close_reason(&RequestError::Api(ApiError::TerminatedByOtherGetUpdates)),
            CloseReason::ConnectionReplaced
        );
        assert!(!close_reason(&RequestError::Api(ApiError::BotBlocked)).is_auth_revocation());
    }

    #[test]
    fn addresses_are_chat_ids() {
        assert!(matches!(parse_address("123456789"), Ok(ChatId(123_456_789))));
        assert!(matches!(parse_address("-100200300"), Ok(ChatId(-100_200_300))));
        assert!(matches!(parse_address("254700000001@s.whatsapp.net"), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn unconnected_transport_has_no_address() {
        let transport = TelegramTransport::new("123:abc".to_string());
        assert_eq!(transport.self_address(), None);
    }
}
