//! Typed errors and recovery strategies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Credentials, endpoints or settings are wrong
    ConfigurationError,
    /// An optional capability failed
    FeatureFailure,
    /// Work completed with reduced output
    PartialFailure,
    /// Anything else
    SystemError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::FeatureFailure => "feature_failure",
            Self::PartialFailure => "partial_failure",
            Self::SystemError => "system_error",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High and critical errors reach the notification sink.
    pub fn is_notifiable(&self) -> bool {
        *self >= Self::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do about a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Re-attempt the operation once after a short backoff
    Retry,
    /// Disable the failed feature and continue without it
    Fallback,
    /// Continue with the failure kept as a warning
    Partial,
    /// Fail the whole request
    Abort,
}

impl RecoveryStrategy {
    /// Deterministic strategy selection.
    pub fn select(severity: Severity, recoverable: bool, fallback_available: bool) -> Self {
        match severity {
            Severity::Critical => Self::Abort,
            Severity::High if fallback_available => Self::Fallback,
            Severity::Medium if recoverable => Self::Partial,
            _ => Self::Retry,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Fallback => "fallback",
            Self::Partial => "partial",
            Self::Abort => "abort",
        }
    }
}

/// Where a failure happened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Optional capability involved
    pub feature: Option<String>,
    /// Operation that failed (e.g. `generate`, `evaluate`)
    pub operation: Option<String>,
    /// Session the failure belongs to
    pub session_id: Option<String>,
    /// The operation cannot proceed without success
    pub critical: bool,
    /// Capabilities usable when the failure happened
    pub available_features: Vec<String>,
    /// Overrides the derived fallback flag
    pub fallback_available: Option<bool>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_feature(feature: impl Into<String>) -> Self {
        Self {
            feature: Some(feature.into()),
            ..Default::default()
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_available_features(mut self, features: Vec<String>) -> Self {
        self.available_features = features;
        self
    }

    pub fn with_fallback(mut self, available: bool) -> Self {
        self.fallback_available = Some(available);
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// A classified, user-presentable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProfessionalError {
    pub id: String,
    pub error_type: ErrorType,
    pub severity: Severity,
    /// Raw failure message
    pub message: String,
    pub feature: Option<String>,
    pub operation: Option<String>,
    pub recoverable: bool,
    pub fallback_available: bool,
    pub suggested_actions: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ProfessionalError {
    /// Strategy for this error.
    pub fn strategy(&self) -> RecoveryStrategy {
        RecoveryStrategy::select(self.severity, self.recoverable, self.fallback_available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection_table() {
        use RecoveryStrategy::*;
        use Severity::*;

        let cases = [
            (Critical, false, false, Abort),
            (Critical, false, true, Abort),
            (Critical, true, false, Abort),
            (Critical, true, true, Abort),
            (High, false, false, Retry),
            (High, false, true, Fallback),
            (High, true, false, Retry),
            (High, true, true, Fallback),
            (Medium, false, false, Retry),
            (Medium, false, true, Retry),
            (Medium, true, false, Partial),
            (Medium, true, true, Partial),
            (Low, false, false, Retry),
            (Low, false, true, Retry),
            (Low, true, false, Retry),
            (Low, true, true, Retry),
        ];

        for (severity, recoverable, fallback, expected) in cases {
            assert_eq!(
                RecoveryStrategy::select(severity, recoverable, fallback),
                expected,
                "{:?} recoverable={} fallback={}",
                severity,
                recoverable,
                fallback
            );
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High.is_notifiable());
        assert!(!Severity::Medium.is_notifiable());
    }

    #[test]
    fn test_error_type_serde() {
        let json = serde_json::to_string(&ErrorType::FeatureFailure).unwrap();
        assert_eq!(json, "\"feature_failure\"");
    }
}
