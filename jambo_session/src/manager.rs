//! The session manager.
//!
//! Owns the single transport connection. Transport events and operator
//! controls are handled on one event loop, so connection state is only
//! ever mutated from one place; the atomics exist so status and sends
//! can be read from other tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jambo_core::{
    CloseReason, CredentialStore, EventSink, InboundHandler, MessageSender, SendError, Transport,
    TransportEvent,
};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::auth::AuthCodeSink;
use crate::backoff::BackoffPolicy;
use crate::error::{Result, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// An authentication code is on display, waiting to be scanned.
    AuthPending,
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    /// Retries exhausted; only an operator re-authentication restarts.
    Failed { attempts: u32 },
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AuthPending => "auth_pending",
            Self::Connected => "connected",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reconnecting { attempt, delay } => {
                write!(f, "reconnecting (attempt {attempt}, in {delay:?})")
            }
            Self::Failed { attempts } => write!(f, "failed after {attempts} attempts"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub connected: bool,
    pub state: ConnectionState,
    /// Consecutive failed attempts since the last successful connection.
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub backoff: BackoffPolicy,
    pub send_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            send_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug)]
enum Control {
    ForceReauth,
    /// A send failed in a way that means the connection is gone.
    Reconnect(String),
    Shutdown,
}

struct Receivers {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    control: mpsc::UnboundedReceiver<Control>,
}

pub struct SessionManager {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    auth_sink: Arc<dyn AuthCodeSink>,
    config: SessionConfig,
    state: watch::Sender<ConnectionState>,
    attempt: AtomicU32,
    /// Set while a retry is scheduled; further close events are ignored.
    reconnecting: AtomicBool,
    /// Logouts since the last successful connection.
    revocations: AtomicU32,
    events: EventSink,
    control: mpsc::UnboundedSender<Control>,
    receivers: Mutex<Option<Receivers>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        auth_sink: Arc<dyn AuthCodeSink>,
        config: SessionConfig,
    ) -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (control, control_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            credentials,
            auth_sink,
            config,
            state,
            attempt: AtomicU32::new(0),
            reconnecting: AtomicBool::new(false),
            revocations: AtomicU32::new(0),
            events,
            control,
            receivers: Mutex::new(Some(Receivers {
                events: events_rx,
                control: control_rx,
            })),
        }
    }

    #[must_use]
    pub fn get_status(&self) -> SessionStatus {
        let state = self.state.borrow().clone();
        SessionStatus {
            connected: state == ConnectionState::Connected,
            state,
            attempt: self.attempt.load(Ordering::SeqCst),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    /// Watch connection state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Drop the stored credentials and reconnect now, cancelling any
    /// pending retry. Also the way out of the failed state.
    pub fn force_reauthentication(&self) -> Result<()> {
        self.request(Control::ForceReauth)
    }

    /// Stop the event loop and tear down the transport.
    pub fn shutdown(&self) -> Result<()> {
        self.request(Control::Shutdown)
    }

    fn request(&self, control: Control) -> Result<()> {
        self.control
            .send(control)
            .map_err(|_| SessionError::NotRunning)
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("Session state: {state}");
        self.state.send_replace(state);
    }

    /// Run the event loop until shutdown. Inbound messages are dispatched
    /// to `handler` on their own tasks.
    pub async fn run(&self, handler: Arc<dyn InboundHandler>) -> Result<()> {
        let Some(Receivers {
            mut events,
            mut control,
        }) = self.receivers.lock().await.take()
        else {
            return Err(SessionError::AlreadyRunning);
        };

        match self.credentials.load().await {
            Ok(Some(blob)) => {
                info!("Restoring saved credentials");
                if let Err(e) = self.transport.restore_credentials(blob).await {
                    warn!("Saved credentials were rejected: {e}");
                }
            }
            Ok(None) => info!("No saved credentials; a new authentication code will be needed"),
            Err(e) => warn!("Failed to read saved credentials: {e}"),
        }

        let mut retry_at: Option<Instant> = None;
        self.connect().await;

        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    self.on_event(event, &handler, &mut retry_at).await;
                }
                Some(request) = control.recv() => match request {
                    Control::ForceReauth => {
                        self.revocations.store(0, Ordering::SeqCst);
                        self.reauthenticate(&mut retry_at).await;
                    }
                    Control::Reconnect(reason) => {
                        self.destroy().await;
                        self.on_close(CloseReason::ConnectionLost(reason), &mut retry_at).await;
                    }
                    Control::Shutdown => break,
                },
                () = wait_until(retry_at) => {
                    retry_at = None;
                    self.reconnecting.store(false, Ordering::SeqCst);
                    self.connect().await;
                }
            }
        }

        info!("Shutting down session");
        self.destroy().await;
        self.reconnecting.store(false, Ordering::SeqCst);
        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    /// Start a connection attempt. A failure to start is fed back through
    /// the event queue as a close.
    async fn connect(&self) {
        self.set_state(ConnectionState::Connecting);
        info!(
            "Connecting transport (attempt {})",
            self.attempt.load(Ordering::SeqCst) + 1
        );
        if let Err(e) = self.transport.connect(self.events.clone()).await {
            warn!("Transport failed to start connecting: {e}");
            let _ = self
                .events
                .send(TransportEvent::Close(CloseReason::ConnectionLost(e.to_string())));
        }
    }

    async fn destroy(&self) {
        if let Err(e) = self.transport.destroy().await {
            warn!("Failed to tear down transport: {e}");
        }
    }

    async fn on_event(
        &self,
        event: TransportEvent,
        handler: &Arc<dyn InboundHandler>,
        retry_at: &mut Option<Instant>,
    ) {
        match event {
            TransportEvent::AuthCode(code) => {
                self.set_state(ConnectionState::AuthPending);
                self.auth_sink.show(&code);
            }
            TransportEvent::Open => {
                self.attempt.store(0, Ordering::SeqCst);
                self.revocations.store(0, Ordering::SeqCst);
                self.reconnecting.store(false, Ordering::SeqCst);
                *retry_at = None;
                self.set_state(ConnectionState::Connected);
                let me = self.transport.self_address();
                info!(
                    "Transport connected as {}",
                    me.as_deref().unwrap_or("unknown address")
                );
                handler.connected(me).await;
            }
            TransportEvent::Close(reason) => self.on_close(reason, retry_at).await,
            TransportEvent::CredentialsUpdate(blob) => {
                if let Err(e) = self.credentials.save(&blob).await {
                    warn!("Failed to persist credentials: {e}");
                }
            }
            TransportEvent::Message(message) => {
                let handler = Arc::clone(handler);
                tokio::spawn(async move { handler.handle(message).await });
            }
        }
    }

    async fn on_close(&self, reason: CloseReason, retry_at: &mut Option<Instant>) {
        if reason.is_auth_revocation() {
            let revocations = self.revocations.fetch_add(1, Ordering::SeqCst) + 1;
            let policy = self.config.backoff;
            if policy.is_exhausted(revocations) {
                error!(
                    "Session logged out {revocations} times without connecting; giving up. Use reauth to retry"
                );
                self.give_up(retry_at).await;
                return;
            }
            error!("Session was logged out; credentials discarded, a new code must be scanned");
            self.reauthenticate(retry_at).await;
            return;
        }

        if self
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Close ({reason}) while a reconnect is already scheduled; ignoring");
            return;
        }

        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let policy = self.config.backoff;
        if policy.is_exhausted(attempt) {
            error!(
                "Transport closed ({reason}); giving up after {} attempts. Use reauth to retry",
                policy.max_attempts
            );
            *retry_at = None;
            self.reconnecting.store(false, Ordering::SeqCst);
            self.attempt.store(policy.max_attempts, Ordering::SeqCst);
            self.set_state(ConnectionState::Failed {
                attempts: policy.max_attempts,
            });
            return;
        }

        let delay = if reason.reconnects_immediately() {
            Duration::ZERO
        } else {
            policy.delay_for(attempt)
        };
        warn!(
            "Transport closed ({reason}); reconnect attempt {attempt}/{} in {delay:?}",
            policy.max_attempts
        );
        *retry_at = Some(Instant::now() + delay);
        self.set_state(ConnectionState::Reconnecting { attempt, delay });
    }

    /// Terminal: drop the revoked credentials and stay down until the
    /// operator asks for re-authentication.
    async fn give_up(&self, retry_at: &mut Option<Instant>) {
        let attempts = self.config.backoff.max_attempts;
        *retry_at = None;
        self.reconnecting.store(false, Ordering::SeqCst);
        self.attempt.store(attempts, Ordering::SeqCst);
        if let Err(e) = self.credentials.clear().await {
            warn!("Failed to clear credentials: {e}");
        }
        self.destroy().await;
        self.set_state(ConnectionState::Failed { attempts });
    }

    async fn reauthenticate(&self, retry_at: &mut Option<Instant>) {
        if retry_at.take().is_some() {
            debug!("Cancelled pending reconnect");
        }
        self.reconnecting.store(false, Ordering::SeqCst);
        self.attempt.store(0, Ordering::SeqCst);
        if let Err(e) = self.credentials.clear().await {
            warn!("Failed to clear credentials: {e}");
        }
        self.destroy().await;
        self.set_state(ConnectionState::Disconnected);
        self.connect().await;
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl MessageSender for SessionManager {
    async fn send_text(&self, address: &str, text: &str) -> std::result::Result<(), SendError> {
        if !self.is_connected() {
            return Err(SendError::NotConnected);
        }
        let timeout = self.config.send_timeout;
        match tokio::time::timeout(timeout, self.transport.send(address, text)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SendError::Transport(e)),
            Err(_) => {
                warn!("Send to {address} timed out after {timeout:?}; reconnecting");
                if self
                    .request(Control::Reconnect(format!("send timed out after {timeout:?}")))
                    .is_err()
                {
                    debug!("Session loop not running; skipping reconnect");
                }
                Err(SendError::Timeout(timeout))
            }
        }
    }
}
