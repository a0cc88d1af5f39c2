use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jambo_core::CredentialStore;
use tracing::{debug, info};

const CREDENTIALS_FILE: &str = "creds.json";

/// Keeps the transport's credential blob as JSON in the auth directory.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(&self, blob: &serde_json::Value) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(blob)?;
        // Atomic replace.
        let tmp = self.dir.join(format!("{CREDENTIALS_FILE}.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, self.path()).await?;
        debug!("Saved credentials to {}", self.path().display());
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<Option<serde_json::Value>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(self.path()).await {
            Ok(()) => {
                info!("Removed stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
