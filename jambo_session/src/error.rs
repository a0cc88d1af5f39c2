use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session event loop is already running")]
    AlreadyRunning,

    #[error("session event loop is not running")]
    NotRunning,

    #[error("credential store error: {0}")]
    Credentials(anyhow::Error),
}
