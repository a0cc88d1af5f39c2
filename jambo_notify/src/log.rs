use async_trait::async_trait;
use jambo_core::{EscalationNotice, Notifier};
use tracing::info;

/// Writes the lead to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &EscalationNotice) -> anyhow::Result<()> {
        info!("{}\n{}", notice.subject(), notice.render_text());
        Ok(())
    }
}
