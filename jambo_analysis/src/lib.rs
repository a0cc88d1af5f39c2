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

//! Pure text analysis applied to every inbound message before any
//! conversation state is touched.
//!
//! - [`MessageFilter`] rejects non-direct traffic, own messages, spam and
//!   out-of-length bodies.
//! - [`Classifier`] maps text to a coarse [`Intent`](jambo_core::Intent)
//!   and a [`Language`](jambo_core::Language) using ordered keyword tables.
//! - [`Extractor`] pulls structured travel details out of free text.
//!
//! Nothing here fails: every matcher returns an empty or default result
//! when nothing fires.

mod classifier;
mod extractor;
mod filter;
mod lexicon;

pub use classifier::{Classification, Classifier, IntentRule};
pub use extractor::{ExtractedEntities, Extractor};
pub use filter::{FilterConfig, MessageFilter, RejectReason, Verdict, is_non_direct_address};
pub use lexicon::KeywordSet;
