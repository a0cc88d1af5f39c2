//! sea-orm entities for persisted conversations and messages.

pub mod conversations;
pub mod messages;
