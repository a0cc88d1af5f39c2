use async_trait::async_trait;

/// Storage for the transport's opaque authentication state.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(&self, blob: &serde_json::Value) -> anyhow::Result<()>;
    async fn load(&self) -> anyhow::Result<Option<serde_json::Value>>;
    /// Discard everything; the next connection must re-authenticate.
    async fn clear(&self) -> anyhow::Result<()>;
}
