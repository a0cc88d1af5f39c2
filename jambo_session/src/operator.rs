use std::sync::Arc;

use jambo_conversation::{PipelineError, ResponsePipeline};
use uuid::Uuid;

use crate::error::Result;
use crate::manager::{SessionManager, SessionStatus};

/// The control surface exposed to a human operator.
#[derive(Clone)]
pub struct Operator {
    session: Arc<SessionManager>,
    pipeline: Arc<ResponsePipeline>,
}

impl Operator {
    #[must_use]
    pub const fn new(session: Arc<SessionManager>, pipeline: Arc<ResponsePipeline>) -> Self {
        Self { session, pipeline }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.session.get_status()
    }

    pub fn force_reauthentication(&self) -> Result<()> {
        self.session.force_reauthentication()
    }

    pub async fn resume_automated_control(
        &self,
        conversation_id: Uuid,
    ) -> std::result::Result<(), PipelineError> {
        self.pipeline.resume(conversation_id).await
    }

    pub async fn send_manual_message(
        &self,
        address: &str,
        text: &str,
    ) -> std::result::Result<(), PipelineError> {
        self.pipeline.send_manual(address, text).await
    }

    pub async fn cached_contacts(&self) -> usize {
        self.pipeline.cached_contacts().await
    }
}
