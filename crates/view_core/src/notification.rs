//! User-facing message channels (error, success, warning).

use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTitles {
    pub error: String,
    pub success: String,
    pub warning: String,
}

impl Default for NotificationTitles {
    fn default() -> Self {
        Self {
            error: "Error".into(),
            success: "Success".into(),
            warning: "Warning".into(),
        }
    }
}

impl NotificationTitles {
    fn notification(&self, severity: Severity, message: &str, detail: Option<&str>) -> Notification {
        let title = match severity {
            Severity::Error => &self.error,
            Severity::Success => &self.success,
            Severity::Warning => &self.warning,
        };
        Notification {
            severity,
            title: title.clone(),
            message: message.to_string(),
            detail: detail.map(str::to_string),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn show_error(&self, message: &str, detail: Option<&str>);
    fn show_success(&self, message: &str, detail: Option<&str>);
    fn show_warning(&self, message: &str, detail: Option<&str>);
}

/// Writes every notification to the tracing subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingNotificationSink {
    titles: NotificationTitles,
}

impl TracingNotificationSink {
    pub fn new(titles: NotificationTitles) -> Self {
        Self { titles }
    }
}

impl NotificationSink for TracingNotificationSink {
    fn show_error(&self, message: &str, detail: Option<&str>) {
        error!(
            title = %self.titles.error,
            detail = detail.unwrap_or_default(),
            "{message}"
        );
    }

    fn show_success(&self, message: &str, detail: Option<&str>) {
        info!(
            title = %self.titles.success,
            detail = detail.unwrap_or_default(),
            "{message}"
        );
    }

    fn show_warning(&self, message: &str, detail: Option<&str>) {
        warn!(
            title = %self.titles.warning,
            detail = detail.unwrap_or_default(),
            "{message}"
        );
    }
}

/// Publishes notifications on a broadcast channel for a UI layer to render.
pub struct BroadcastNotificationSink {
    titles: NotificationTitles,
    events: broadcast::Sender<Notification>,
}

impl BroadcastNotificationSink {
    pub fn new(titles: NotificationTitles, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { titles, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    fn publish(&self, severity: Severity, message: &str, detail: Option<&str>) {
        let notification = self.titles.notification(severity, message, detail);
        if self.events.send(notification).is_err() {
            warn!(?severity, "notification dropped: no subscribers; {message}");
        }
    }
}

impl NotificationSink for BroadcastNotificationSink {
    fn show_error(&self, message: &str, detail: Option<&str>) {
        self.publish(Severity::Error, message, detail);
    }

    fn show_success(&self, message: &str, detail: Option<&str>) {
        self.publish(Severity::Success, message, detail);
    }

    fn show_warning(&self, message: &str, detail: Option<&str>) {
        self.publish(Severity::Warning, message, detail);
    }
}
