//! User-facing notifications derived from handled errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ErrorType, ProfessionalError, RecoveryStrategy, Severity};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// How prominently a notification is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl From<Severity> for NotificationLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => Self::Info,
            Severity::Medium => Self::Warning,
            Severity::High => Self::Error,
            Severity::Critical => Self::Critical,
        }
    }
}

/// Action offered alongside a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Retry,
    Fallback,
    Configure,
    Help,
    Dismiss,
}

/// A message for the end user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct UserNotification {
    pub id: String,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    /// Error the notification was derived from
    pub error_id: Option<String>,
    pub dismissible: bool,
    pub persistent: bool,
    pub actions: Vec<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

impl UserNotification {
    fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        let critical = level == NotificationLevel::Critical;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            level,
            title: title.into(),
            message: message.into(),
            error_id: None,
            dismissible: !critical,
            persistent: critical,
            actions: Vec::new(),
            created_at: now,
        }
    }

    fn with_actions(mut self, mut actions: Vec<NotificationAction>) -> Self {
        if self.dismissible {
            actions.push(NotificationAction::Dismiss);
        }
        self.actions = actions;
        self
    }

    /// Notification for one handled error.
    pub fn for_error(error: &ProfessionalError, strategy: RecoveryStrategy, now: DateTime<Utc>) -> Self {
        let level = NotificationLevel::from(error.severity);
        let feature = error.feature.as_deref().unwrap_or("an optional feature");

        let (title, message, mut actions) = match strategy {
            RecoveryStrategy::Abort => (
                "Generation stopped".to_string(),
                format!("We could not continue: {}", error.message),
                vec![NotificationAction::Retry, NotificationAction::Help],
            ),
            RecoveryStrategy::Fallback => (
                "Feature temporarily unavailable".to_string(),
                format!("{} is unavailable. Continuing in standard mode.", feature),
                vec![NotificationAction::Fallback],
            ),
            RecoveryStrategy::Partial => (
                "Completed with limitations".to_string(),
                format!("Some content may be incomplete: {}", error.message),
                Vec::new(),
            ),
            RecoveryStrategy::Retry => (
                "Retrying".to_string(),
                format!("A temporary problem occurred and the request was retried: {}", error.message),
                vec![NotificationAction::Retry],
            ),
        };

        if error.error_type == ErrorType::ConfigurationError {
            actions.insert(0, NotificationAction::Configure);
        }

        let mut notification = Self::new(level, title, message, now).with_actions(actions);
        notification.error_id = Some(error.id.clone());
        notification
    }

    /// Consolidated notification for a batch of handled errors.
    pub fn consolidated(
        errors: &[ProfessionalError],
        strategies: &[RecoveryStrategy],
        unavailable: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let level = errors
            .iter()
            .map(|e| NotificationLevel::from(e.severity))
            .max()
            .unwrap_or(NotificationLevel::Info);

        if strategies.contains(&RecoveryStrategy::Abort) {
            return Self::new(
                NotificationLevel::Critical,
                "Generation stopped",
                format!("{} error(s) occurred and generation could not continue", errors.len()),
                now,
            )
            .with_actions(vec![NotificationAction::Retry, NotificationAction::Help]);
        }

        if strategies.contains(&RecoveryStrategy::Fallback) {
            return Self::new(
                level,
                "Standard mode",
                format!(
                    "Some enhancements are unavailable ({}). Continuing in standard mode.",
                    unavailable.join(", ")
                ),
                now,
            )
            .with_actions(vec![NotificationAction::Fallback]);
        }

        if strategies.contains(&RecoveryStrategy::Partial) {
            return Self::new(
                level,
                "Partial mode",
                "Some features returned partial results. Continuing in partial mode.",
                now,
            )
            .with_actions(Vec::new());
        }

        Self::new(level, "Recovered", "All issues were recovered automatically.", now).with_actions(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::classifier::ErrorClassifier;
    use crate::recovery::types::ErrorContext;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_critical_notification_is_sticky() {
        let error = ErrorClassifier::classify("panic in renderer", &ErrorContext::new(), now());
        let notification = UserNotification::for_error(&error, error.strategy(), now());

        assert_eq!(notification.level, NotificationLevel::Critical);
        assert!(!notification.dismissible);
        assert!(notification.persistent);
        assert!(!notification.actions.contains(&NotificationAction::Dismiss));
        assert_eq!(notification.error_id.as_deref(), Some(error.id.as_str()));
    }

    #[test]
    fn test_fallback_notification_is_dismissible() {
        let error = ErrorClassifier::classify("index missing", &ErrorContext::for_feature("character_memory"), now());
        let notification = UserNotification::for_error(&error, error.strategy(), now());

        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.dismissible);
        assert!(!notification.persistent);
        assert!(notification.message.contains("character_memory"));
        assert_eq!(
            notification.actions,
            vec![NotificationAction::Fallback, NotificationAction::Dismiss]
        );
    }

    #[test]
    fn test_configuration_offers_configure() {
        let error = ErrorClassifier::classify("forbidden", &ErrorContext::for_feature("style_transfer"), now());
        let notification = UserNotification::for_error(&error, error.strategy(), now());
        assert_eq!(notification.actions[0], NotificationAction::Configure);
    }
}
