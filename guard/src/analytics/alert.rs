//! Threshold alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recovery::Severity;

#[cfg(feature = "typescript")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ErrorSpike,
    PerformanceDegradation,
    UserSatisfactionDrop,
}

impl AlertType {
    pub fn severity(&self) -> Severity {
        match self {
            Self::ErrorSpike => Severity::High,
            Self::PerformanceDegradation | Self::UserSatisfactionDrop => Severity::Medium,
        }
    }
}

/// A raised alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct PerformanceAlert {
    pub id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    /// Observed value that crossed the threshold
    pub value: f64,
    pub threshold: f64,
    pub raised_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PerformanceAlert {
    pub fn new(alert_type: AlertType, message: String, value: f64, threshold: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type,
            severity: alert_type.severity(),
            message,
            value,
            threshold,
            raised_at: now,
            resolved_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
