//! User-visible notices.
//!
//! Assistants never return provider failures to their callers. They report
//! them through a [`Notifier`] and resolve to an empty result instead.

use tracing::warn;

/// Sink for short, user-facing messages (a toast, a status line, stderr).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that only logs. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!(notice = message, "user notice");
    }
}

impl<F> Notifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        self(message)
    }
}
