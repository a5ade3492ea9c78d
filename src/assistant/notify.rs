//! Notification surface collaborator (toasts in the host UI).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What the notification is about, so the host can attach the right affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentCreated,
    DispatchFailed,
    /// Dismissible prompt offering a manual switch to offline mode.
    OfflineSuggested,
    ModeChanged,
    ModeSwitchRefused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that only logs. Used by the console host.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::error!(kind = ?notification.kind, "{}", notification.message)
            }
            NotificationLevel::Warning => {
                tracing::warn!(kind = ?notification.kind, "{}", notification.message)
            }
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(kind = ?notification.kind, "{}", notification.message)
            }
        }
    }
}
