//! Health check results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Outcome of one sub-check, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Pass,
    Warn,
    Fail,
}

/// Aggregated health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Worst-of rule: any fail is unhealthy, else any warn is degraded.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = CheckOutcome>) -> Self {
        match outcomes.into_iter().max() {
            Some(CheckOutcome::Fail) => Self::Unhealthy,
            Some(CheckOutcome::Warn) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

/// One named sub-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct HealthCheck {
    pub name: String,
    pub outcome: CheckOutcome,
    pub message: String,
    pub duration_ms: u64,
}

impl HealthCheck {
    pub fn new(name: impl Into<String>, outcome: CheckOutcome, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            outcome,
            message: message.into(),
            duration_ms,
        }
    }
}

/// Result of one full battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub checked_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl HealthCheckResult {
    pub fn new(checks: Vec<HealthCheck>, checked_at: DateTime<Utc>, duration_ms: u64) -> Self {
        Self {
            status: HealthStatus::from_outcomes(checks.iter().map(|c| c.outcome)),
            checks,
            checked_at,
            duration_ms,
        }
    }

    pub fn check(&self, name: &str) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.outcome == CheckOutcome::Pass).count()
    }
}

/// Rolled-up view over recent health checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SystemStatus {
    pub overall: HealthStatus,
    /// Health checks in the window
    pub checks_in_window: usize,
    pub available_features: usize,
    pub partial_features: usize,
    pub unavailable_features: usize,
    /// Mean `response_time` sub-check duration over the window
    pub avg_response_ms: Option<f64>,
    /// Passing sub-checks / all sub-checks over the window
    pub success_rate: f64,
    pub last_checked: Option<DateTime<Utc>>,
}
