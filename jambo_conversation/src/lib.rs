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

//! Per-contact conversation handling.
//!
//! The [`ResponsePipeline`] takes each accepted inbound message through
//! classification, context merging, human-takeover arbitration and
//! escalation before deciding whether to reply, and with what.
//!
//! # Key pieces
//! - [`ContactMemory`]: cached per-contact state, rebuilt from the store
//! - [`merge`]: folds a message into memory and builds the prompt context
//! - [`EscalationEvaluator`]: per-service completeness checklists
//! - [`TakeoverArbiter`]: trigger phrases and the cool-down window
//! - [`PersistenceQueue`]: ordered write-behind persistence

mod escalation;
mod memory;
mod merge;
mod pipeline;
mod prompt;
pub mod replies;
mod takeover;
mod writer;

pub use escalation::{EscalationEvaluator, EscalationPolicy, EscalationState, Requirement, checklist};
pub use memory::{ClientDetails, ContactMemory, History, Turn};
pub use merge::{MergePolicy, PromptContext, TurnInput, merge, record_reply};
pub use pipeline::{Outcome, PipelineConfig, PipelineError, ReplyKind, ResponsePipeline, TypingDelay};
pub use prompt::PromptBuilder;
pub use takeover::{ArbiterState, TakeoverArbiter, TakeoverReason};
pub use writer::PersistenceQueue;
