//! Feature health monitor.

use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::check::{CheckOutcome, HealthCheck, HealthCheckResult, HealthStatus, SystemStatus};
use super::feature::{FeatureDiscoveryResult, FeatureProbe, FeatureRecord, FeatureStatus, GeneratorProbe};
use crate::clock::Clock;
use crate::config::HealthConfig;
use crate::content::ContentKind;
use crate::error::{GuardError, Result};
use crate::generator::Generator;

pub const RESOURCES_CHECK: &str = "resources";
pub const FEATURES_CHECK: &str = "feature_availability";
pub const RESPONSE_TIME_CHECK: &str = "response_time";
pub const INTEGRATION_PREFIX: &str = "integration:";

/// Reports current resource utilization in [0, 1].
pub trait ResourceGauge: Send + Sync {
    fn utilization(&self) -> f64;
}

/// Gauge with a fixed reading.
#[derive(Debug, Clone, Copy)]
pub struct StaticGauge(pub f64);

impl ResourceGauge for StaticGauge {
    fn utilization(&self) -> f64 {
        self.0
    }
}

/// Outcome of a successful startup.
#[derive(Debug, Clone)]
pub struct InitializationReport {
    pub features: FeatureDiscoveryResult,
    pub health: HealthCheckResult,
    /// Partial or degraded states, reported without failing startup
    pub warnings: Vec<String>,
}

/// Probes optional capabilities, caches the result and runs health checks.
pub struct FeatureHealthMonitor {
    config: HealthConfig,
    clock: Arc<dyn Clock>,
    probes: Vec<Arc<dyn FeatureProbe>>,
    generators: Vec<Arc<dyn Generator>>,
    gauge: Arc<dyn ResourceGauge>,
    cache: RwLock<Option<FeatureDiscoveryResult>>,
    history: RwLock<VecDeque<HealthCheckResult>>,
    discoveries: AtomicU32,
}

impl FeatureHealthMonitor {
    pub fn new(config: HealthConfig, clock: Arc<dyn Clock>, gauge: Arc<dyn ResourceGauge>) -> Self {
        Self {
            config,
            clock,
            probes: Vec::new(),
            generators: Vec::new(),
            gauge,
            cache: RwLock::new(None),
            history: RwLock::new(VecDeque::new()),
            discoveries: AtomicU32::new(0),
        }
    }

    /// Declare an optional capability.
    pub fn with_probe(mut self, probe: Arc<dyn FeatureProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Register a generator: it gets an integration check and a backend
    /// capability probe.
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        let probe = GeneratorProbe::backend(generator.clone(), self.slow_after(), self.give_up_after());
        self.probes.push(Arc::new(probe));
        self.generators.push(generator);
        self
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Number of probe runs so far.
    pub fn discovery_count(&self) -> u32 {
        self.discoveries.load(Ordering::SeqCst)
    }

    /// Discover capabilities, reusing the cached result within its TTL.
    pub async fn discover_features(&self) -> FeatureDiscoveryResult {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh(self.clock.now(), self.config.feature_cache_ttl_secs) {
                    return cached.clone();
                }
            }
        }

        let result = self.probe_all().await;
        *self.cache.write().await = Some(result.clone());
        result
    }

    /// Drop the cached discovery so the next call re-probes.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
        debug!("Feature discovery cache cleared");
    }

    /// Run the ordered check battery and keep the result in history.
    pub async fn perform_health_check(&self) -> HealthCheckResult {
        let started = Instant::now();

        let mut checks = vec![self.check_resources(), self.check_features().await, self.check_response_time().await];
        checks.extend(self.check_integrations().await);

        let result = HealthCheckResult::new(checks, self.clock.now(), started.elapsed().as_millis() as u64);

        match result.status {
            HealthStatus::Healthy => debug!(checks = result.checks.len(), "Health check passed"),
            HealthStatus::Degraded | HealthStatus::Unhealthy => warn!(
                status = ?result.status,
                failing = ?result
                    .checks
                    .iter()
                    .filter(|c| c.outcome != CheckOutcome::Pass)
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>(),
                "Health check not passing"
            ),
        }

        let mut history = self.history.write().await;
        history.push_back(result.clone());
        while history.len() > self.config.history_size {
            history.pop_front();
        }

        result
    }

    /// Recent health check results, oldest first.
    pub async fn history(&self) -> Vec<HealthCheckResult> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Roll up recent checks. Runs a check first if none has run yet.
    pub async fn system_status(&self) -> SystemStatus {
        if self.history.read().await.is_empty() {
            self.perform_health_check().await;
        }
        let features = self.discover_features().await;
        let history = self.history.read().await;

        let response_times: Vec<f64> = history
            .iter()
            .filter_map(|r| r.check(RESPONSE_TIME_CHECK))
            .map(|c| c.duration_ms as f64)
            .collect();
        let total: usize = history.iter().map(|r| r.checks.len()).sum();
        let passed: usize = history.iter().map(|r| r.passed()).sum();
        let latest = history.back();

        SystemStatus {
            overall: latest.map(|r| r.status).unwrap_or(HealthStatus::Healthy),
            checks_in_window: history.len(),
            available_features: features.available_count,
            partial_features: features.partial_count,
            unavailable_features: features.unavailable_count,
            avg_response_ms: (!response_times.is_empty())
                .then(|| response_times.iter().sum::<f64>() / response_times.len() as f64),
            success_rate: if total == 0 { 0.0 } else { passed as f64 / total as f64 },
            last_checked: latest.map(|r| r.checked_at),
        }
    }

    /// Startup contract: fails only when no capability is usable or the
    /// resources check fails. Anything else is returned as warnings.
    pub async fn initialize(&self) -> Result<InitializationReport> {
        let features = self.discover_features().await;
        let health = self.perform_health_check().await;

        if features.usable_count() == 0 {
            return Err(GuardError::StartupFailed(format!(
                "none of {} capabilities is usable",
                features.features.len()
            )));
        }
        if let Some(resources) = health.check(RESOURCES_CHECK) {
            if resources.outcome == CheckOutcome::Fail {
                return Err(GuardError::StartupFailed(resources.message.clone()));
            }
        }

        let mut warnings: Vec<String> = features
            .features
            .iter()
            .filter(|f| f.status != FeatureStatus::Available)
            .map(|f| match &f.detail {
                Some(detail) => format!("{} is {:?}: {}", f.name, f.status, detail),
                None => format!("{} is {:?}", f.name, f.status),
            })
            .collect();
        warnings.extend(
            health
                .checks
                .iter()
                .filter(|c| c.outcome != CheckOutcome::Pass)
                .map(|c| format!("{}: {}", c.name, c.message)),
        );

        info!(
            available = features.available_count,
            partial = features.partial_count,
            unavailable = features.unavailable_count,
            status = ?health.status,
            warnings = warnings.len(),
            "Feature health monitor initialized"
        );

        Ok(InitializationReport {
            features,
            health,
            warnings,
        })
    }

    fn slow_after(&self) -> Duration {
        Duration::from_millis(self.config.slow_response_ms)
    }

    fn give_up_after(&self) -> Duration {
        Duration::from_millis(self.config.failing_response_ms)
    }

    async fn probe_all(&self) -> FeatureDiscoveryResult {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now();
        let ttl_secs = self.config.feature_cache_ttl_secs;

        let probed = join_all(self.probes.iter().map(|probe| async move {
            let started = Instant::now();
            let outcome = probe.probe().await;
            (probe, outcome, started.elapsed())
        }))
        .await;

        let mut records: Vec<FeatureRecord> = probed
            .into_iter()
            .map(|(probe, outcome, elapsed)| {
                let status = outcome.status();
                FeatureRecord {
                    name: probe.name().to_string(),
                    status,
                    health_score: status.health_score(),
                    dependencies: probe.dependencies(),
                    enhancement: probe.is_enhancement(),
                    detail: outcome.detail(),
                    response_ms: elapsed.as_millis() as u64,
                    last_checked: now,
                    ttl_secs,
                }
            })
            .collect();

        let known: HashSet<String> = records.iter().map(|r| r.name.clone()).collect();
        let down: HashSet<String> = records
            .iter()
            .filter(|r| r.status == FeatureStatus::Unavailable)
            .map(|r| r.name.clone())
            .collect();

        for record in records.iter_mut().filter(|r| r.status == FeatureStatus::Available) {
            let missing = record
                .dependencies
                .iter()
                .find(|d| down.contains(*d) || !known.contains(*d))
                .cloned();
            if let Some(dependency) = missing {
                record.status = FeatureStatus::Partial;
                record.health_score = FeatureStatus::Partial.health_score();
                record.detail = Some(format!("dependency {} is unavailable", dependency));
            }
        }

        let result = FeatureDiscoveryResult::new(records, now);
        info!(
            available = result.available_count,
            partial = result.partial_count,
            unavailable = result.unavailable_count,
            "Features discovered"
        );
        result
    }

    fn check_resources(&self) -> HealthCheck {
        let started = Instant::now();
        let utilization = self.gauge.utilization();
        let outcome = if utilization < self.config.resource_warn_ratio {
            CheckOutcome::Pass
        } else if utilization < self.config.resource_fail_ratio {
            CheckOutcome::Warn
        } else {
            CheckOutcome::Fail
        };
        HealthCheck::new(
            RESOURCES_CHECK,
            outcome,
            format!("Resource utilization at {:.0}%", utilization * 100.0),
            started.elapsed().as_millis() as u64,
        )
    }

    async fn check_features(&self) -> HealthCheck {
        let started = Instant::now();
        let features = self.discover_features().await;
        let ratio = features.availability_ratio();
        let outcome = if !features.features.is_empty() && ratio >= self.config.feature_pass_ratio {
            CheckOutcome::Pass
        } else if features.usable_count() > 0 {
            CheckOutcome::Warn
        } else {
            CheckOutcome::Fail
        };
        HealthCheck::new(
            FEATURES_CHECK,
            outcome,
            format!(
                "{}/{} capabilities available, {} partial",
                features.available_count,
                features.features.len(),
                features.partial_count
            ),
            started.elapsed().as_millis() as u64,
        )
    }

    async fn check_response_time(&self) -> HealthCheck {
        let primary = self
            .generators
            .iter()
            .find(|g| g.kind() == ContentKind::Narrative)
            .or_else(|| self.generators.first());

        let Some(primary) = primary else {
            return HealthCheck::new(RESPONSE_TIME_CHECK, CheckOutcome::Warn, "No generator registered", 0);
        };

        let started = Instant::now();
        let answered = tokio::time::timeout(self.give_up_after(), primary.is_available()).await;
        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let (outcome, message) = match answered {
            Ok(true) if elapsed < self.slow_after() => {
                (CheckOutcome::Pass, format!("{} answered in {}ms", primary.id(), elapsed_ms))
            }
            Ok(true) => (
                CheckOutcome::Warn,
                format!("{} answered slowly in {}ms", primary.id(), elapsed_ms),
            ),
            Ok(false) => (CheckOutcome::Fail, format!("{} is unavailable", primary.id())),
            Err(_) => (
                CheckOutcome::Fail,
                format!("{} did not answer within {}ms", primary.id(), self.config.failing_response_ms),
            ),
        };
        HealthCheck::new(RESPONSE_TIME_CHECK, outcome, message, elapsed_ms)
    }

    async fn check_integrations(&self) -> Vec<HealthCheck> {
        let give_up = self.give_up_after();
        join_all(self.generators.iter().map(|generator| async move {
            let started = Instant::now();
            let available = tokio::time::timeout(give_up, generator.is_available())
                .await
                .unwrap_or(false);
            let (outcome, message) = if available {
                (CheckOutcome::Pass, "available")
            } else {
                (CheckOutcome::Fail, "unavailable")
            };
            HealthCheck::new(
                format!("{}{}", INTEGRATION_PREFIX, generator.id()),
                outcome,
                format!("{} is {}", generator.id(), message),
                started.elapsed().as_millis() as u64,
            )
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::generator::MockGenerator;
    use crate::health::feature::{ProbeOutcome, StaticProbe};
    use chrono::{DateTime, Duration as ChronoDuration, Utc};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()))
    }

    fn monitor(clock: Arc<ManualClock>, utilization: f64) -> FeatureHealthMonitor {
        FeatureHealthMonitor::new(HealthConfig::default(), clock, Arc::new(StaticGauge(utilization)))
    }

    #[tokio::test]
    async fn test_discovery_cached_within_ttl() {
        let clock = clock();
        let monitor = monitor(clock.clone(), 0.1).with_probe(Arc::new(StaticProbe::available("character_memory")));

        monitor.discover_features().await;
        clock.advance(ChronoDuration::seconds(299));
        monitor.discover_features().await;
        assert_eq!(monitor.discovery_count(), 1);

        clock.advance(ChronoDuration::seconds(1));
        monitor.discover_features().await;
        assert_eq!(monitor.discovery_count(), 2);

        monitor.clear_cache().await;
        monitor.discover_features().await;
        assert_eq!(monitor.discovery_count(), 3);
    }

    #[tokio::test]
    async fn test_dependency_downgrade() {
        let monitor = monitor(clock(), 0.1)
            .with_probe(Arc::new(StaticProbe::unavailable("vector_store", "connection refused")))
            .with_probe(Arc::new(
                StaticProbe::available("character_memory").with_dependencies(vec!["vector_store".to_string()]),
            ))
            .with_probe(Arc::new(StaticProbe::available("style_transfer")));

        let result = monitor.discover_features().await;
        let memory = result.get("character_memory").unwrap();
        assert_eq!(memory.status, FeatureStatus::Partial);
        assert_eq!(memory.health_score, 60);
        assert_eq!(result.available_count, 1);
        assert_eq!(result.unavailable_count, 1);
        assert_eq!(
            result.usable_enhancements(),
            vec!["character_memory".to_string(), "style_transfer".to_string()]
        );
    }

    #[tokio::test]
    async fn test_health_battery_order_and_outcomes() {
        let monitor = monitor(clock(), 0.85)
            .with_generator(Arc::new(MockGenerator::text("writer")))
            .with_generator(Arc::new(MockGenerator::image("painter").with_available(false)));

        let result = monitor.perform_health_check().await;
        let names: Vec<&str> = result.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "resources",
                "feature_availability",
                "response_time",
                "integration:writer",
                "integration:painter"
            ]
        );
        assert_eq!(result.check("resources").unwrap().outcome, CheckOutcome::Warn);
        assert_eq!(result.check("feature_availability").unwrap().outcome, CheckOutcome::Warn);
        assert_eq!(result.check("response_time").unwrap().outcome, CheckOutcome::Pass);
        assert_eq!(result.check("integration:painter").unwrap().outcome, CheckOutcome::Fail);
        assert_eq!(result.status, HealthStatus::Unhealthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_primary_warns() {
        let monitor = monitor(clock(), 0.1).with_generator(Arc::new(
            MockGenerator::text("writer").with_probe_delay(std::time::Duration::from_millis(2_500)),
        ));
        let result = monitor.perform_health_check().await;
        assert_eq!(result.check("response_time").unwrap().outcome, CheckOutcome::Warn);
        assert_eq!(result.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let monitor = monitor(clock(), 0.1).with_probe(Arc::new(StaticProbe::available("a")));
        for _ in 0..12 {
            monitor.perform_health_check().await;
        }
        assert_eq!(monitor.history().await.len(), 10);

        let status = monitor.system_status().await;
        assert_eq!(status.checks_in_window, 10);
        assert_eq!(status.available_features, 1);
        // resources and features pass; response_time warns without a generator
        assert!((status.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(status.overall, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_initialize_with_partial_features_warns() {
        let monitor = monitor(clock(), 0.1)
            .with_generator(Arc::new(MockGenerator::text("writer")))
            .with_probe(Arc::new(StaticProbe::new(
                "style_transfer",
                ProbeOutcome::Degraded("slow model".to_string()),
            )));

        let report = monitor.initialize().await.unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("style_transfer")));
    }

    #[tokio::test]
    async fn test_initialize_fails_without_usable_capability() {
        let monitor = monitor(clock(), 0.1)
            .with_generator(Arc::new(MockGenerator::text("writer").with_available(false)));
        let err = monitor.initialize().await.unwrap_err();
        assert!(matches!(err, GuardError::StartupFailed(_)));
    }

    #[tokio::test]
    async fn test_initialize_fails_on_resources() {
        let monitor = monitor(clock(), 0.99).with_generator(Arc::new(MockGenerator::text("writer")));
        assert!(matches!(monitor.initialize().await, Err(GuardError::StartupFailed(_))));
    }
}
