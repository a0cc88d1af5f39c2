//! Messaging transport capability.
//!
//! A transport is a duplex connection to a chat platform. It reports
//! connection-state changes and inbound messages as [`TransportEvent`]s on
//! the sink handed to [`Transport::connect`], and accepts outbound text.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

/// Kind of channel an inbound message was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Direct,
    Group,
    Broadcast,
    Status,
}

/// Raw inbound message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub id: String,
    /// Contact address (chat identifier) the message came from.
    pub from: String,
    pub chat_kind: ChatKind,
    pub from_me: bool,
    pub text: Option<String>,
    /// Display name the platform reports for the sender, if any.
    pub sender_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    /// A plain direct text message, the common case.
    #[must_use]
    pub fn direct(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            from: from.into(),
            chat_kind: ChatKind::Direct,
            from_me: false,
            text: Some(text.into()),
            sender_name: None,
            timestamp: Utc::now(),
        }
    }
}

/// Why the transport connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Credentials were revoked; a fresh authentication code is required.
    LoggedOut,
    TimedOut,
    ConnectionClosed,
    ConnectionReplaced,
    BadSession,
    /// The platform asked for an immediate reconnect.
    RestartRequired,
    ConnectionLost(String),
}

impl CloseReason {
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            401 => Self::LoggedOut,
            408 => Self::TimedOut,
            428 => Self::ConnectionClosed,
            440 => Self::ConnectionReplaced,
            500 => Self::BadSession,
            515 => Self::RestartRequired,
            other => Self::ConnectionLost(format!("close code {other}")),
        }
    }

    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::LoggedOut => Some(401),
            Self::TimedOut => Some(408),
            Self::ConnectionClosed => Some(428),
            Self::ConnectionReplaced => Some(440),
            Self::BadSession => Some(500),
            Self::RestartRequired => Some(515),
            Self::ConnectionLost(_) => None,
        }
    }

    #[must_use]
    pub const fn is_auth_revocation(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }

    /// Reconnect without waiting out the backoff delay.
    #[must_use]
    pub const fn reconnects_immediately(&self) -> bool {
        matches!(self, Self::RestartRequired)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("logged out"),
            Self::TimedOut => f.write_str("timed out"),
            Self::ConnectionClosed => f.write_str("connection closed"),
            Self::ConnectionReplaced => f.write_str("connection replaced"),
            Self::BadSession => f.write_str("bad session"),
            Self::RestartRequired => f.write_str("restart required"),
            Self::ConnectionLost(detail) => write!(f, "connection lost: {detail}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// An authentication code (QR payload) to show the operator.
    AuthCode(String),
    Open,
    Close(CloseReason),
    /// Opaque credential blob to persist.
    CredentialsUpdate(serde_json::Value),
    Message(InboundEvent),
}

pub type EventSink = mpsc::UnboundedSender<TransportEvent>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Start connecting. Progress is reported on `events`; returning `Ok`
    /// only means the attempt was started.
    async fn connect(&self, events: EventSink) -> anyhow::Result<()>;

    /// Hand previously persisted credentials back before connecting.
    /// Transports that authenticate statically can ignore them.
    async fn restore_credentials(&self, _blob: serde_json::Value) -> anyhow::Result<()> {
        Ok(())
    }

    /// Tear down the current connection, if any.
    async fn destroy(&self) -> anyhow::Result<()>;

    async fn send(&self, address: &str, text: &str) -> anyhow::Result<()>;

    /// The bot's own address, once known.
    fn self_address(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport send failed: {0}")]
    Transport(anyhow::Error),
}

/// Outbound side of the live connection, as seen by the response pipeline.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, address: &str, text: &str) -> Result<(), SendError>;
}

/// Receiver of accepted inbound messages. Implementations must not panic
/// or propagate failures; the caller is the transport event loop.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, event: InboundEvent);

    /// Called on every successful connection with the bot's own address.
    async fn connected(&self, _self_address: Option<String>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_logged_out_revokes_auth() {
        for code in [408, 428, 440, 500, 515, 1006] {
            assert!(!CloseReason::from_code(code).is_auth_revocation());
        }
        assert!(CloseReason::from_code(401).is_auth_revocation());
    }

    #[test]
    fn known_codes_round_trip() {
        for code in [401, 408, 428, 440, 500, 515] {
            assert_eq!(CloseReason::from_code(code).code(), Some(code));
        }
        assert_eq!(CloseReason::from_code(1006).code(), None);
    }

    #[test]
    fn restart_required_skips_backoff() {
        assert!(CloseReason::RestartRequired.reconnects_immediately());
        assert!(!CloseReason::TimedOut.reconnects_immediately());
    }
}
