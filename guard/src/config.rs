//! Configuration for the quality guard.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GuardError, Result};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Default regeneration settings (overridable per validate call)
    pub regeneration: RegenerationConfig,
    /// Feature discovery and health check settings
    pub health: HealthConfig,
    /// Error handling settings
    pub errors: ErrorConfig,
    /// Analytics and alerting settings
    pub analytics: AnalyticsConfig,
    /// Session registry settings
    pub sessions: SessionConfig,
}

impl GuardConfig {
    /// Load config from YAML and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.regeneration.validate()?;
        if self.health.history_size == 0 {
            return Err(GuardError::InvalidConfig(
                "health.history_size must be at least 1".to_string(),
            ));
        }
        if self.health.slow_response_ms > self.health.failing_response_ms {
            return Err(GuardError::InvalidConfig(
                "health.slow_response_ms must not exceed health.failing_response_ms".to_string(),
            ));
        }
        if self.analytics.performance_baseline_ms <= 0.0 {
            return Err(GuardError::InvalidConfig(
                "analytics.performance_baseline_ms must be positive".to_string(),
            ));
        }
        if self.sessions.max_active == 0 {
            return Err(GuardError::InvalidConfig(
                "sessions.max_active must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for one regeneration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(default)]
pub struct RegenerationConfig {
    /// Scored drafts allowed, including the submitted one (>= 1)
    pub max_attempts: u32,
    /// Pass threshold for narrative content (0-10)
    pub quality_threshold: f64,
    /// Pass threshold for illustrations (0-10)
    pub visual_quality_threshold: f64,
    /// Score gain that counts as a real improvement
    pub improvement_threshold: f64,
    /// Wall-clock budget for the whole session
    pub timeout_ms: u64,
    /// Add dimension-specific hints to regeneration prompts
    pub enable_adaptive_prompts: bool,
    /// Also regenerate drafts that are acceptable but below threshold
    pub enable_quality_feedback_loop: bool,
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            quality_threshold: 7.0,
            visual_quality_threshold: 7.0,
            improvement_threshold: 0.5,
            timeout_ms: 120_000,
            enable_adaptive_prompts: true,
            enable_quality_feedback_loop: false,
        }
    }
}

impl RegenerationConfig {
    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(GuardError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("quality_threshold", self.quality_threshold),
            ("visual_quality_threshold", self.visual_quality_threshold),
        ] {
            if !(0.0..=10.0).contains(&value) {
                return Err(GuardError::InvalidConfig(format!(
                    "{} must be within 0-10, got {}",
                    name, value
                )));
            }
        }
        if !self.improvement_threshold.is_finite() || self.improvement_threshold < 0.0 {
            return Err(GuardError::InvalidConfig(format!(
                "improvement_threshold must be a non-negative number, got {}",
                self.improvement_threshold
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Builder-style overrides.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    pub fn with_visual_quality_threshold(mut self, threshold: f64) -> Self {
        self.visual_quality_threshold = threshold;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_feedback_loop(mut self, enabled: bool) -> Self {
        self.enable_quality_feedback_loop = enabled;
        self
    }

    pub fn with_adaptive_prompts(mut self, enabled: bool) -> Self {
        self.enable_adaptive_prompts = enabled;
        self
    }
}

/// Feature discovery and health check configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Feature discovery cache TTL (seconds)
    pub feature_cache_ttl_secs: u64,
    /// Health check results kept for system status
    pub history_size: usize,
    /// Probe latency above this is a warning (ms)
    pub slow_response_ms: u64,
    /// Probe latency above this is a failure (ms)
    pub failing_response_ms: u64,
    /// Resource utilization warning ratio
    pub resource_warn_ratio: f64,
    /// Resource utilization failure ratio
    pub resource_fail_ratio: f64,
    /// Available/total feature ratio needed to pass
    pub feature_pass_ratio: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            feature_cache_ttl_secs: 300, // 5 minutes
            history_size: 10,
            slow_response_ms: 2_000,
            failing_response_ms: 5_000,
            resource_warn_ratio: 0.80,
            resource_fail_ratio: 0.95,
            feature_pass_ratio: 0.80,
        }
    }
}

/// Error handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// How long handled errors are retained (seconds)
    pub retention_secs: u64,
    /// Delay before the single retry (ms)
    pub retry_backoff_ms: u64,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            retention_secs: 1_800, // 30 minutes
            retry_backoff_ms: 250,
        }
    }
}

/// Analytics and alerting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Maximum events kept in memory
    pub max_events: usize,
    /// Events considered for the error rate
    pub error_window: usize,
    /// Error rate above which `error_spike` is raised
    pub error_rate_threshold: f64,
    /// Events needed before the error rate is evaluated (1 evaluates from the first event)
    pub min_error_sample: usize,
    /// Performance events considered for degradation
    pub performance_window: usize,
    /// Expected operation latency (ms)
    pub performance_baseline_ms: f64,
    /// Latency/baseline ratio above which `performance_degradation` is raised
    pub degradation_ratio: f64,
    /// Satisfaction events considered
    pub satisfaction_window: usize,
    /// Average rating (out of 5) below which `user_satisfaction_drop` is raised
    pub satisfaction_threshold: f64,
    /// An unresolved alert suppresses the same type for this long (seconds)
    pub alert_dedup_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            error_window: 100,
            error_rate_threshold: 0.05,
            min_error_sample: 1,
            performance_window: 20,
            performance_baseline_ms: 2_000.0,
            degradation_ratio: 2.0,
            satisfaction_window: 10,
            satisfaction_threshold: 3.5,
            alert_dedup_secs: 3_600, // 1 hour
        }
    }
}

/// Session registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum concurrently running sessions
    pub max_active: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_active: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();
        assert_eq!(config.regeneration.max_attempts, 3);
        assert_eq!(config.health.feature_cache_ttl_secs, 300);
        assert_eq!(config.errors.retention_secs, 1_800);
        assert_eq!(config.analytics.error_window, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = GuardConfig::default();
        config.regeneration.max_attempts = 5;
        let yaml = config.to_yaml().unwrap();
        let parsed = GuardConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.regeneration.max_attempts, 5);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = GuardConfig::from_yaml(
            "regeneration:\n  quality_threshold: 8.0\n  enable_quality_feedback_loop: true\n",
        )
        .unwrap();
        assert_eq!(config.regeneration.quality_threshold, 8.0);
        assert!(config.regeneration.enable_quality_feedback_loop);
        assert_eq!(config.regeneration.max_attempts, 3);
        assert_eq!(config.analytics.satisfaction_window, 10);
    }

    #[test]
    fn test_regeneration_validation() {
        assert!(RegenerationConfig::default().with_max_attempts(0).validate().is_err());
        assert!(RegenerationConfig::default().with_quality_threshold(10.5).validate().is_err());
        assert!(RegenerationConfig::default()
            .with_visual_quality_threshold(-1.0)
            .validate()
            .is_err());

        let mut config = RegenerationConfig::default();
        config.improvement_threshold = f64::NAN;
        assert!(config.validate().is_err());

        assert!(RegenerationConfig::default().with_timeout_ms(0).validate().is_ok());
    }

    #[test]
    fn test_yaml_rejects_invalid_values() {
        let err = GuardConfig::from_yaml("regeneration:\n  max_attempts: 0\n").unwrap_err();
        assert!(matches!(err, GuardError::InvalidConfig(_)));
    }
}
