use std::sync::Arc;

use async_trait::async_trait;
use jambo_core::{EscalationNotice, Notifier};
use tracing::warn;

/// Delivers to every sink. Fails only if every sink failed.
pub struct FanoutNotifier {
    sinks: Vec<(&'static str, Arc<dyn Notifier>)>,
}

impl FanoutNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    #[must_use]
    pub fn with(mut self, name: &'static str, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push((name, sink));
        self
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|(name, _)| *name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Default for FanoutNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notice: &EscalationNotice) -> anyhow::Result<()> {
        let mut failures = Vec::new();
        for (name, sink) in &self.sinks {
            if let Err(e) = sink.notify(notice).await {
                warn!("{name} notification failed: {e}");
                failures.push(*name);
            }
        }
        if !self.sinks.is_empty() && failures.len() == self.sinks.len() {
            anyhow::bail!("all notification sinks failed: {}", failures.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogNotifier;
    use crate::test_support::notice;

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        async fn notify(&self, _notice: &EscalationNotice) -> anyhow::Result<()> {
            anyhow::bail!("down")
        }
    }

    #[tokio::test]
    async fn one_working_sink_is_enough() {
        let fanout = FanoutNotifier::new()
            .with("webhook", Arc::new(Broken))
            .with("log", Arc::new(LogNotifier));
        assert!(fanout.notify(&notice()).await.is_ok());
        assert_eq!(fanout.names(), vec!["webhook", "log"]);
    }

    #[tokio::test]
    async fn all_failing_is_an_error() {
        let fanout = FanoutNotifier::new()
            .with("webhook", Arc::new(Broken))
            .with("email", Arc::new(Broken));
        let result = fanout.notify(&notice()).await;
        assert!(result.is_err_and(|e| e.to_string().contains("webhook, email")));
    }
}
