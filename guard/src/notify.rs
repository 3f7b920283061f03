//! Notification sink collaborator.
//!
//! Sinks only deliver; deciding what reaches them is the error handler's job.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::recovery::{NotificationLevel, UserNotification};

/// Delivers user notifications to whatever surface shows them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: UserNotification);
}

/// Sink that writes notifications to the log.
#[derive(Debug, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn deliver(&self, notification: UserNotification) {
        match notification.level {
            NotificationLevel::Critical | NotificationLevel::Error => error!(
                notification_id = %notification.id,
                title = %notification.title,
                persistent = notification.persistent,
                "{}",
                notification.message
            ),
            NotificationLevel::Warning => warn!(
                notification_id = %notification.id,
                title = %notification.title,
                "{}",
                notification.message
            ),
            NotificationLevel::Info => info!(
                notification_id = %notification.id,
                title = %notification.title,
                "{}",
                notification.message
            ),
        }
    }
}

/// Sink that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    delivered: Mutex<Vec<UserNotification>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications delivered so far, oldest first.
    pub async fn delivered(&self) -> Vec<UserNotification> {
        self.delivered.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.delivered.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.delivered.lock().await.is_empty()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn deliver(&self, notification: UserNotification) {
        self.delivered.lock().await.push(notification);
    }
}
