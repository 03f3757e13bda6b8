pub mod fake_connection;
pub mod fixtures;
pub mod recording_notifier;

pub use fake_connection::{FakeConnection, FakeConnectionStats, FakeQueryOutcome};
pub use recording_notifier::RecordingNotifier;
