/// Outcome of a notification: shown to the end user as a toast or similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            level: Level::Failure,
            message: message.into(),
        }
    }
}

/// Fire-and-forget channel for user-facing outcome messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Sends notifications to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            Level::Success => tracing::info!(target: "notification", "{}", notification.message),
            Level::Failure => tracing::warn!(target: "notification", "{}", notification.message),
        }
    }
}
