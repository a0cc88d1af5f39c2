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

//! Connection lifecycle for the messaging transport, and the operator
//! surface on top of it.

mod auth;
mod backoff;
mod console;
mod credentials;
mod error;
mod manager;
mod operator;

pub use auth::{AuthCodeSink, LogAuthSink, TerminalQrSink};
pub use backoff::BackoffPolicy;
pub use console::{ConsoleReply, OperatorCommand, run_console};
pub use credentials::FileCredentialStore;
pub use error::{Result, SessionError};
pub use manager::{ConnectionState, SessionConfig, SessionManager, SessionStatus};
pub use operator::Operator;
