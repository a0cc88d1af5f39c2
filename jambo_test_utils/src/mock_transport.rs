//! Scriptable messaging transport.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use jambo_core::{CloseReason, EventSink, InboundEvent, Transport, TransportEvent};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// What the transport reports after the next `connect` call.
#[derive(Debug, Clone)]
pub enum ConnectScript {
    Open,
    /// Show an authentication code, then open.
    AuthThenOpen(String),
    /// Report nothing; the test drives events with [`MockTransport::emit`].
    Silent,
    Close(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    Ok,
    Fail,
    /// Never completes; exercises the caller's send timeout.
    Hang,
}

#[derive(Default)]
struct State {
    scripts: VecDeque<ConnectScript>,
    sink: Option<EventSink>,
    connect_times: Vec<Instant>,
    destroy_count: usize,
    sent: Vec<(String, String)>,
    send_behavior: Option<SendBehavior>,
}

/// Transport double. Each `connect` pops one script (default: open) and
/// records when it happened, so tests can assert backoff gaps under a
/// paused clock.
pub struct MockTransport {
    state: Mutex<State>,
    self_address: Option<String>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            self_address: Some("bot".to_string()),
        }
    }

    #[must_use]
    pub fn with_scripts(scripts: Vec<ConnectScript>) -> Self {
        Self {
            state: Mutex::new(State {
                scripts: scripts.into(),
                ..State::default()
            }),
            self_address: Some("bot".to_string()),
        }
    }

    pub async fn push_script(&self, script: ConnectScript) {
        self.state.lock().await.scripts.push_back(script);
    }

    pub async fn set_send_behavior(&self, behavior: SendBehavior) {
        self.state.lock().await.send_behavior = Some(behavior);
    }

    /// Push an event onto the sink of the most recent connection.
    /// Returns false if no connection has been made yet.
    pub async fn emit(&self, event: TransportEvent) -> bool {
        let state = self.state.lock().await;
        state
            .sink
            .as_ref()
            .is_some_and(|sink| sink.send(event).is_ok())
    }

    pub async fn deliver(&self, event: InboundEvent) -> bool {
        self.emit(TransportEvent::Message(event)).await
    }

    pub async fn connect_count(&self) -> usize {
        self.state.lock().await.connect_times.len()
    }

    pub async fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().await.connect_times.clone()
    }

    /// Gaps between consecutive connect calls.
    pub async fn connect_gaps(&self) -> Vec<Duration> {
        let times = self.connect_times().await;
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub async fn destroy_count(&self) -> usize {
        self.state.lock().await.destroy_count
    }

    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.state.lock().await.sent.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, events: EventSink) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.connect_times.push(Instant::now());
        let script = state.scripts.pop_front().unwrap_or(ConnectScript::Open);
        let emitted = match script {
            ConnectScript::Open => vec![TransportEvent::Open],
            ConnectScript::AuthThenOpen(code) => {
                vec![TransportEvent::AuthCode(code), TransportEvent::Open]
            }
            ConnectScript::Silent => Vec::new(),
            ConnectScript::Close(reason) => vec![TransportEvent::Close(reason)],
        };
        for event in emitted {
            let _ = events.send(event);
        }
        state.sink = Some(events);
        Ok(())
    }

    async fn destroy(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.destroy_count += 1;
        state.sink = None;
        Ok(())
    }

    async fn send(&self, address: &str, text: &str) -> anyhow::Result<()> {
        let behavior = {
            let mut state = self.state.lock().await;
            let behavior = state.send_behavior.unwrap_or(SendBehavior::Ok);
            if behavior == SendBehavior::Ok {
                state.sent.push((address.to_string(), text.to_string()));
            }
            behavior
        };
        match behavior {
            SendBehavior::Ok => Ok(()),
            SendBehavior::Fail => anyhow::bail!("mock transport refused the send"),
            SendBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                anyhow::bail!("mock send hang elapsed")
            }
        }
    }

    fn self_address(&self) -> Option<String> {
        self.self_address.clone()
    }
}
