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

//! Sinks that tell the sales team a lead is ready.

mod email;
mod fanout;
mod log;
mod webhook;

pub use email::{EmailNotifier, EmailSettings};
pub use fanout::FanoutNotifier;
pub use log::LogNotifier;
pub use webhook::WebhookNotifier;
