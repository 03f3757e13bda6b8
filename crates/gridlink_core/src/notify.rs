/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Warning,
}

/// Side channel for messages shown to the user (toasts, status bar).
pub trait Notifier {
    fn notify(&self, kind: NotificationKind, message: &str);

    fn info(&self, message: &str) {
        self.notify(NotificationKind::Info, message);
    }

    fn warn(&self, message: &str) {
        self.notify(NotificationKind::Warning, message);
    }
}

/// Routes notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Info => log::info!("{}", message),
            NotificationKind::Warning => log::warn!("{}", message),
        }
    }
}
