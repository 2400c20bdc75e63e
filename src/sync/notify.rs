//! sync::notify
//!
//! User-facing notifications.
//!
//! Coordinator and workflow methods never return errors to their callers;
//! every state-changing failure (and a few successes) is reported as a
//! [`Notification`] through an injected [`Notifier`]. Logging is separate and
//! goes through `tracing`.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// A short title plus the underlying message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, title, message)
    }
}

/// Receives notifications. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Notifications at `Level::Error`.
    pub fn errors(&self) -> Vec<Notification> {
        self.lock()
            .iter()
            .filter(|n| n.level == Level::Error)
            .cloned()
            .collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.lock().iter().map(|n| n.title.clone()).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.lock().push(notification);
    }
}
