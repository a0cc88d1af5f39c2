//! Write-behind persistence.
//!
//! Message appends and context write-backs are queued to a single
//! background task so the reply never waits on the store. Writes are
//! applied in submission order; failures are logged and dropped.

use std::sync::Arc;

use jambo_core::{ConversationPatch, ConversationStore, NewMessage};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

enum WriteOp {
    Append(NewMessage),
    Update { id: Uuid, patch: Box<ConversationPatch> },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl PersistenceQueue {
    /// Start the background writer. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(store: Arc<dyn ConversationStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(store, rx));
        Self { tx }
    }

    pub fn append(&self, message: NewMessage) {
        self.submit(WriteOp::Append(message));
    }

    pub fn update(&self, id: Uuid, patch: ConversationPatch) {
        self.submit(WriteOp::Update {
            id,
            patch: Box::new(patch),
        });
    }

    /// Wait until every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.submit(WriteOp::Flush(done));
        let _ = wait.await;
    }

    fn submit(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            warn!("Persistence writer has stopped; dropping write");
        }
    }
}

async fn run(store: Arc<dyn ConversationStore>, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Append(message) => match store.append_message(&message).await {
                Ok(stored) => debug!(
                    "Stored {} message {} for conversation {}",
                    stored.sender.as_str(),
                    stored.id,
                    stored.conversation_id
                ),
                Err(e) => warn!(
                    "Failed to store message for conversation {}: {e}",
                    message.conversation_id
                ),
            },
            WriteOp::Update { id, patch } => {
                if let Err(e) = store.update_conversation_context(&id, &patch).await {
                    warn!("Failed to update context for conversation {id}: {e}");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Persistence writer stopped");
}
