//! Analytics events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recovery::{ErrorType, ProfessionalError, Severity};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// One entry in the analytics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AnalyticsEvent {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl AnalyticsEvent {
    pub fn new(session_id: impl Into<String>, timestamp: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            timestamp,
            payload,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, EventPayload::Error { .. })
    }
}

/// Event body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// A feature was used
    Usage {
        feature: String,
        success: bool,
        duration_ms: Option<u64>,
    },
    /// An operation's latency
    Performance { operation: String, duration_ms: u64 },
    /// A handled error
    Error {
        error_id: String,
        error_type: ErrorType,
        severity: Severity,
        feature: Option<String>,
    },
    /// A user rating out of 5
    Satisfaction { rating: f64, feature: Option<String> },
}

impl EventPayload {
    pub fn from_error(error: &ProfessionalError) -> Self {
        Self::Error {
            error_id: error.id.clone(),
            error_type: error.error_type,
            severity: error.severity,
            feature: error.feature.clone(),
        }
    }
}
