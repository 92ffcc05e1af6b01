use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message meant for the user, as opposed to a log line
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// Pending notifications, drained by the presentation layer
#[derive(Debug, Default)]
pub struct Notifications {
    entries: Vec<Notification>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("✅ {}", message);
        self.push(NotificationLevel::Success, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(NotificationLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("⚠️  {}", message);
        self.push(NotificationLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("❌ {}", message);
        self.push(NotificationLevel::Error, message);
    }

    fn push(&mut self, level: NotificationLevel, message: String) {
        self.entries.push(Notification {
            level,
            message,
            at: Utc::now(),
        });
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take all pending notifications
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.entries)
    }
}
