use gridlink_core::{NotificationKind, Notifier};
use std::sync::{Arc, Mutex};

/// Notifier that keeps every message for later assertions.
///
/// Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    entries: Arc<Mutex<Vec<(NotificationKind, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(NotificationKind, String)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poison_error) => poison_error.into_inner().clone(),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages_of(NotificationKind::Warning)
    }

    pub fn infos(&self) -> Vec<String> {
        self.messages_of(NotificationKind::Info)
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn messages_of(&self, kind: NotificationKind) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match self.entries.lock() {
            Ok(mut guard) => guard.push((kind, message.to_string())),
            Err(poison_error) => poison_error
                .into_inner()
                .push((kind, message.to_string())),
        }
    }
}
