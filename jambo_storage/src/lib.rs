#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! [`ConversationStore`](jambo_core::ConversationStore) implementations.

mod database;
mod memory;

use std::sync::Arc;

use jambo_core::ConversationStore;
use tracing::info;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

/// Open the configured store. An empty URL keeps everything in process.
pub async fn open(database_url: &str) -> anyhow::Result<Arc<dyn ConversationStore>> {
    if database_url.trim().is_empty() {
        info!("No database configured; conversations are kept in memory");
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(DatabaseStore::connect(database_url).await?))
}
