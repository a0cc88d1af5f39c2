//! Deterministic stand-ins for the external collaborators, so pipeline and
//! session tests run without a network or a chat platform.

mod mock_provider;
mod mock_transport;
mod recording;

pub use mock_provider::ScriptedProvider;
pub use mock_transport::{ConnectScript, MockTransport, SendBehavior};
pub use recording::{FailingStore, MemoryCredentialStore, RecordingNotifier, RecordingSender};
