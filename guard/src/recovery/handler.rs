//! Error handler: classification, recovery, notification and retention.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::classifier::ErrorClassifier;
use super::notification::UserNotification;
use super::types::{ErrorContext, ProfessionalError, RecoveryStrategy, Severity};
use crate::analytics::AnalyticsRecorder;
use crate::clock::Clock;
use crate::config::ErrorConfig;
use crate::generator::GenerationError;
use crate::notify::NotificationSink;

/// Session id used for failures outside any session.
pub const SYSTEM_SESSION: &str = "system";

/// Result of applying a recovery strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    pub strategy: RecoveryStrategy,
    /// Whether work can continue
    pub success: bool,
    /// Capabilities still usable after recovery
    pub available_features: Vec<String>,
    /// Capabilities disabled by recovery
    pub unavailable_features: Vec<String>,
    pub message: String,
}

/// Everything produced by handling one error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingResult {
    pub error: ProfessionalError,
    pub recovery: RecoveryOutcome,
    pub notification: UserNotification,
    /// Whether the notification reached the sink
    pub delivered: bool,
    /// Set for low and medium errors, which are only surfaced as warnings
    pub warning: Option<String>,
}

/// Consolidated result for a batch of errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub errors: Vec<ProfessionalError>,
    pub outcomes: Vec<RecoveryOutcome>,
    pub available_features: Vec<String>,
    pub unavailable_features: Vec<String>,
    pub notification: UserNotification,
    pub delivered: bool,
    pub aborted: bool,
}

/// Classifies failures, applies recovery and notifies users.
pub struct ErrorHandler {
    config: ErrorConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    analytics: Option<Arc<AnalyticsRecorder>>,
    recent: RwLock<VecDeque<ProfessionalError>>,
}

impl ErrorHandler {
    pub fn new(config: ErrorConfig, clock: Arc<dyn Clock>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            config,
            clock,
            sink,
            analytics: None,
            recent: RwLock::new(VecDeque::new()),
        }
    }

    /// Record an analytics error event for every handled error.
    pub fn with_analytics(mut self, analytics: Arc<AnalyticsRecorder>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.config.retry_backoff_ms)
    }

    /// Handle a failure described by its message.
    pub async fn handle_error<E>(&self, error: &E, context: ErrorContext) -> ErrorHandlingResult
    where
        E: std::fmt::Display + ?Sized,
    {
        let classified = ErrorClassifier::classify(&error.to_string(), &context, self.clock.now());
        self.handle_classified(classified, &context).await
    }

    /// Handle a generator failure.
    pub async fn handle_generation_error(&self, error: &GenerationError, context: ErrorContext) -> ErrorHandlingResult {
        let classified = ErrorClassifier::classify_generation(error, &context, self.clock.now());
        self.handle_classified(classified, &context).await
    }

    /// Run `operation`; when it fails with a retryable error, wait the
    /// backoff and run it exactly once more.
    pub async fn run_with_recovery<T, F, Fut>(
        &self,
        context: ErrorContext,
        mut operation: F,
    ) -> std::result::Result<T, ErrorHandlingResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, GenerationError>>,
    {
        let first = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => self.handle_generation_error(&e, context.clone()).await,
        };

        if first.recovery.strategy != RecoveryStrategy::Retry {
            return Err(first);
        }

        debug!(error_id = %first.error.id, backoff_ms = self.config.retry_backoff_ms, "Retrying after backoff");
        tokio::time::sleep(self.retry_backoff()).await;

        match operation().await {
            Ok(value) => {
                info!(error_id = %first.error.id, "Retry succeeded");
                Ok(value)
            }
            Err(e) => Err(self.handle_generation_error(&e, context).await),
        }
    }

    /// Apply the strategy an error calls for.
    pub fn apply_recovery(&self, error: &ProfessionalError, context: &ErrorContext) -> RecoveryOutcome {
        let strategy = error.strategy();
        let available = context.available_features.clone();

        match strategy {
            RecoveryStrategy::Fallback => {
                let feature = error.feature.clone().unwrap_or_default();
                RecoveryOutcome {
                    strategy,
                    success: true,
                    available_features: available.into_iter().filter(|f| *f != feature).collect(),
                    message: format!("Continuing without {}", feature),
                    unavailable_features: vec![feature],
                }
            }
            RecoveryStrategy::Partial => RecoveryOutcome {
                strategy,
                success: true,
                available_features: available,
                unavailable_features: Vec::new(),
                message: "Continuing with partial results".to_string(),
            },
            RecoveryStrategy::Retry => RecoveryOutcome {
                strategy,
                success: true,
                available_features: available,
                unavailable_features: Vec::new(),
                message: format!("Retrying after {}ms", self.config.retry_backoff_ms),
            },
            RecoveryStrategy::Abort => RecoveryOutcome {
                strategy,
                success: false,
                available_features: available,
                unavailable_features: Vec::new(),
                message: "Request aborted".to_string(),
            },
        }
    }

    /// Handle a batch of failures with one consolidated notification.
    pub async fn handle_pipeline_errors(&self, failures: Vec<(String, ErrorContext)>) -> PipelineResult {
        let now = self.clock.now();
        let mut errors = Vec::with_capacity(failures.len());
        let mut outcomes = Vec::with_capacity(failures.len());
        let mut available = BTreeSet::new();
        let mut unavailable = BTreeSet::new();

        for (message, context) in &failures {
            let classified = ErrorClassifier::classify(message, context, now);
            let outcome = self.apply_recovery(&classified, context);
            self.track(&classified, context).await;

            available.extend(outcome.available_features.iter().cloned());
            unavailable.extend(outcome.unavailable_features.iter().cloned());
            errors.push(classified);
            outcomes.push(outcome);
        }

        let available_features: Vec<String> = available.difference(&unavailable).cloned().collect();
        let unavailable_features: Vec<String> = unavailable.into_iter().collect();
        let strategies: Vec<RecoveryStrategy> = outcomes.iter().map(|o| o.strategy).collect();
        let aborted = strategies.contains(&RecoveryStrategy::Abort);

        let notification = UserNotification::consolidated(&errors, &strategies, &unavailable_features, now);
        let notify = errors.iter().any(|e| e.severity.is_notifiable());
        if notify {
            self.sink.deliver(notification.clone()).await;
        }

        info!(
            errors = errors.len(),
            aborted,
            unavailable = unavailable_features.len(),
            "Pipeline errors handled"
        );

        PipelineResult {
            errors,
            outcomes,
            available_features,
            unavailable_features,
            notification,
            delivered: notify,
            aborted,
        }
    }

    /// Errors still inside the retention window, oldest first.
    pub async fn recent_errors(&self) -> Vec<ProfessionalError> {
        let mut recent = self.recent.write().await;
        self.evict_expired(&mut recent);
        recent.iter().cloned().collect()
    }

    async fn handle_classified(&self, error: ProfessionalError, context: &ErrorContext) -> ErrorHandlingResult {
        let recovery = self.apply_recovery(&error, context);
        self.track(&error, context).await;

        let notification = UserNotification::for_error(&error, recovery.strategy, error.occurred_at);
        let delivered = error.severity.is_notifiable();
        let warning = if delivered {
            self.sink.deliver(notification.clone()).await;
            None
        } else {
            Some(format!("{} ({})", error.message, recovery.strategy.as_str()))
        };

        ErrorHandlingResult {
            error,
            recovery,
            notification,
            delivered,
            warning,
        }
    }

    /// Log, retain and record one classified error.
    async fn track(&self, error: &ProfessionalError, context: &ErrorContext) {
        match error.severity {
            Severity::Critical => error!(
                error_id = %error.id,
                error_type = %error.error_type,
                operation = ?error.operation,
                "{}",
                error.message
            ),
            Severity::High => warn!(
                error_id = %error.id,
                error_type = %error.error_type,
                feature = ?error.feature,
                "{}",
                error.message
            ),
            Severity::Medium | Severity::Low => debug!(
                error_id = %error.id,
                error_type = %error.error_type,
                severity = %error.severity,
                "{}",
                error.message
            ),
        }

        {
            let mut recent = self.recent.write().await;
            recent.push_back(error.clone());
            self.evict_expired(&mut recent);
        }

        if let Some(analytics) = &self.analytics {
            let session = context.session_id.as_deref().unwrap_or(SYSTEM_SESSION);
            analytics.record_error(session, error).await;
        }
    }

    fn evict_expired(&self, recent: &mut VecDeque<ProfessionalError>) {
        let cutoff = self.clock.now() - chrono::Duration::seconds(self.config.retention_secs as i64);
        while recent.front().is_some_and(|e| e.occurred_at < cutoff) {
            recent.pop_front();
        }
    }
}
