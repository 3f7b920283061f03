//! QualityGuardService - main entry point for quality-gated generation.
//!
//! Wires the feature monitor, error handler, analytics recorder and
//! regeneration controller around one shared session registry.

use std::sync::Arc;
use tracing::info;

use storyforge_quality::{QualityBreakdown, QualityMetricSet, QualityScorer};

use crate::analytics::{AnalyticsRecorder, AnalyticsReport, PerformanceAlert, TimeRange};
use crate::clock::{Clock, SystemClock};
use crate::config::{GuardConfig, RegenerationConfig};
use crate::content::{ContentKind, ContentUnit};
use crate::error::{GuardError, Result};
use crate::generator::Generator;
use crate::health::{
    FeatureDiscoveryResult, FeatureHealthMonitor, FeatureProbe, HealthCheckResult, InitializationReport,
    SystemStatus,
};
use crate::notify::{NotificationSink, TracingNotificationSink};
use crate::oracle::QualityOracle;
use crate::recovery::{ErrorContext, ErrorHandler, ErrorHandlingResult, PipelineResult, ProfessionalError};
use crate::regeneration::{RegenerationController, SessionRegistry, SessionServices, ValidationOutcome};
use crate::store::{HistoryRecord, HistoryStore, MemoryHistoryStore, RecordFilter};

/// Builder for [`QualityGuardService`].
pub struct QualityGuardBuilder {
    config: GuardConfig,
    generators: Vec<Arc<dyn Generator>>,
    oracle: Option<Arc<dyn QualityOracle>>,
    store: Option<Arc<dyn HistoryStore>>,
    sink: Option<Arc<dyn NotificationSink>>,
    clock: Option<Arc<dyn Clock>>,
    probes: Vec<Arc<dyn FeatureProbe>>,
}

impl QualityGuardBuilder {
    fn new() -> Self {
        Self {
            config: GuardConfig::default(),
            generators: Vec::new(),
            oracle: None,
            store: None,
            sink: None,
            clock: None,
            probes: Vec::new(),
        }
    }

    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a content or image generator. Each generator is also probed as
    /// a backend feature.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn QualityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Defaults to a [`MemoryHistoryStore`].
    pub fn store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to a [`TracingNotificationSink`].
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Declare an optional capability.
    pub fn probe(mut self, probe: Arc<dyn FeatureProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn build(self) -> Result<QualityGuardService> {
        self.config.validate()?;
        let oracle = self
            .oracle
            .ok_or_else(|| GuardError::InvalidConfig("a quality oracle is required".to_string()))?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryHistoryStore::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingNotificationSink));
        let registry = Arc::new(SessionRegistry::new(self.config.sessions.max_active));

        let mut monitor = FeatureHealthMonitor::new(self.config.health.clone(), clock.clone(), registry.clone());
        for generator in &self.generators {
            monitor = monitor.with_generator(generator.clone());
        }
        for probe in self.probes {
            monitor = monitor.with_probe(probe);
        }
        let monitor = Arc::new(monitor);

        let analytics = Arc::new(
            AnalyticsRecorder::new(self.config.analytics.clone(), clock.clone()).with_store(store.clone()),
        );
        let errors = Arc::new(
            ErrorHandler::new(self.config.errors.clone(), clock.clone(), sink).with_analytics(analytics.clone()),
        );

        let services = SessionServices {
            oracle,
            monitor: monitor.clone(),
            errors: errors.clone(),
            analytics: analytics.clone(),
            store: store.clone(),
            clock,
        };
        let controller = RegenerationController::new(self.generators, services, registry);

        info!(
            max_active = self.config.sessions.max_active,
            max_attempts = self.config.regeneration.max_attempts,
            "Quality guard ready"
        );

        Ok(QualityGuardService {
            config: self.config,
            controller,
            monitor,
            errors,
            analytics,
            store,
        })
    }
}

/// Main entry point for quality-gated generation.
pub struct QualityGuardService {
    config: GuardConfig,
    controller: RegenerationController,
    monitor: Arc<FeatureHealthMonitor>,
    errors: Arc<ErrorHandler>,
    analytics: Arc<AnalyticsRecorder>,
    store: Arc<dyn HistoryStore>,
}

impl QualityGuardService {
    pub fn builder() -> QualityGuardBuilder {
        QualityGuardBuilder::new()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Check the startup contract: at least one usable feature and no
    /// failing resource check.
    pub async fn initialize(&self) -> Result<InitializationReport> {
        self.monitor.initialize().await
    }

    /// Validate a content unit, regenerating it as needed.
    pub async fn validate(&self, unit: ContentUnit, config: RegenerationConfig) -> Result<ValidationOutcome> {
        self.controller.validate(unit, config).await
    }

    /// Validate with the configured regeneration settings.
    pub async fn validate_with_defaults(&self, unit: ContentUnit) -> Result<ValidationOutcome> {
        self.controller.validate(unit, self.config.regeneration.clone()).await
    }

    /// Score a metric payload without starting a session.
    pub fn score(&self, kind: ContentKind, payload: &serde_json::Value) -> Result<QualityBreakdown> {
        let metrics = QualityMetricSet::from_json(payload)?;
        Ok(QualityScorer::breakdown(&metrics, &kind.weights()))
    }

    pub fn active_sessions(&self) -> usize {
        self.controller.active_sessions()
    }

    pub async fn check_health(&self) -> HealthCheckResult {
        self.monitor.perform_health_check().await
    }

    pub async fn get_feature_status(&self) -> FeatureDiscoveryResult {
        self.monitor.discover_features().await
    }

    /// Force a re-probe on the next feature lookup.
    pub async fn clear_feature_cache(&self) {
        self.monitor.clear_cache().await
    }

    pub async fn system_status(&self) -> SystemStatus {
        self.monitor.system_status().await
    }

    pub async fn handle_error<E>(&self, error: &E, context: ErrorContext) -> ErrorHandlingResult
    where
        E: std::fmt::Display + ?Sized,
    {
        self.errors.handle_error(error, context).await
    }

    pub async fn handle_pipeline_errors(&self, failures: Vec<(String, ErrorContext)>) -> PipelineResult {
        self.errors.handle_pipeline_errors(failures).await
    }

    pub async fn recent_errors(&self) -> Vec<ProfessionalError> {
        self.errors.recent_errors().await
    }

    pub async fn analytics_report(&self, range: TimeRange) -> AnalyticsReport {
        self.analytics.report(range).await
    }

    pub async fn record_satisfaction(
        &self,
        session_id: &str,
        rating: f64,
        feature: Option<&str>,
    ) -> Vec<PerformanceAlert> {
        self.analytics.record_satisfaction(session_id, rating, feature).await
    }

    pub async fn alerts(&self) -> Vec<PerformanceAlert> {
        self.analytics.alerts().await
    }

    pub async fn resolve_alert(&self, alert_id: &str) -> bool {
        self.analytics.resolve_alert(alert_id).await
    }

    /// Archived sessions and recorded events, newest first.
    pub async fn history(&self, filter: &RecordFilter) -> Result<Vec<HistoryRecord>> {
        Ok(self.store.query(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockGenerator;
    use crate::oracle::ScriptedOracle;
    use serde_json::json;

    fn service() -> QualityGuardService {
        QualityGuardService::builder()
            .generator(Arc::new(MockGenerator::text("writer")))
            .oracle(Arc::new(ScriptedOracle::from_scores(ContentKind::Narrative, [8.0])))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_oracle() {
        let result = QualityGuardService::builder()
            .generator(Arc::new(MockGenerator::text("writer")))
            .build();
        assert!(matches!(result, Err(GuardError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = GuardConfig::default();
        config.regeneration.quality_threshold = 11.0;
        let result = QualityGuardService::builder()
            .config(config)
            .oracle(Arc::new(ScriptedOracle::from_scores(ContentKind::Narrative, [8.0])))
            .build();
        assert!(matches!(result, Err(GuardError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_score_payload() {
        let service = service();
        let breakdown = service
            .score(
                ContentKind::Narrative,
                &json!({
                    "narrativeCoherence": 8.5,
                    "characterDepth": 7.2,
                    "plotComplexity": 9.1,
                    "thematicConsistency": 8.8
                }),
            )
            .unwrap();
        assert_eq!(breakdown.overall(), 8.4);
    }

    #[tokio::test]
    async fn test_score_rejects_malformed_payload() {
        let service = service();
        let err = service.score(ContentKind::Narrative, &json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, GuardError::Quality(_)));
    }

    #[tokio::test]
    async fn test_validate_with_defaults_archives_session() {
        let service = service();
        let outcome = service
            .validate_with_defaults(ContentUnit::narrative("k", "prompt", "draft"))
            .await
            .unwrap();
        assert!(outcome.passed);

        let archived = service.history(&RecordFilter::sessions()).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].session_id(), outcome.session_id);
    }
}
