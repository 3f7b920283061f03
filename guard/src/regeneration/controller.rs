//! Regeneration controller.
//!
//! Drives the bounded score → decide → regenerate loop for one content unit
//! at a time per key. Each session runs on its own task; concurrent callers
//! for the same key wait on the session's watch channel.

use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use storyforge_quality::{QualityBreakdown, QualityScorer};

use super::feedback::build_feedback;
use super::registry::{RegistrationGuard, SessionHandle, SessionRegistry};
use super::session::{
    RegenerationSession, SessionState, StopReason, TriggerReason, ValidationOutcome,
};
use crate::analytics::AnalyticsRecorder;
use crate::clock::Clock;
use crate::config::RegenerationConfig;
use crate::content::{content_digest, ContentKind, ContentUnit};
use crate::error::{GuardError, Result};
use crate::generator::{GenerationRequest, Generator};
use crate::health::FeatureHealthMonitor;
use crate::oracle::QualityOracle;
use crate::recovery::{ErrorContext, ErrorHandler, ErrorHandlingResult, RecoveryStrategy};
use crate::store::{HistoryRecord, HistoryStore};

/// Collaborators a session needs.
#[derive(Clone)]
pub struct SessionServices {
    pub oracle: Arc<dyn QualityOracle>,
    pub monitor: Arc<FeatureHealthMonitor>,
    pub errors: Arc<ErrorHandler>,
    pub analytics: Arc<AnalyticsRecorder>,
    pub store: Arc<dyn HistoryStore>,
    pub clock: Arc<dyn Clock>,
}

/// Quality-gated regeneration with single-flight sessions.
#[derive(Clone)]
pub struct RegenerationController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    generators: Vec<Arc<dyn Generator>>,
    services: SessionServices,
    registry: Arc<SessionRegistry>,
}

type Stop = (SessionState, StopReason);

impl RegenerationController {
    pub fn new(
        generators: Vec<Arc<dyn Generator>>,
        services: SessionServices,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                generators,
                services,
                registry,
            }),
        }
    }

    /// Sessions currently in flight.
    pub fn active_sessions(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.inner.registry
    }

    /// Validate a content unit, regenerating it until it passes or the
    /// budget runs out.
    ///
    /// A call for a key that already has a session in flight joins that
    /// session and returns its result; `config` is then ignored.
    pub async fn validate(&self, unit: ContentUnit, config: RegenerationConfig) -> Result<ValidationOutcome> {
        config.validate()?;

        let registry = &self.inner.registry;
        let key = unit.key.clone();

        let mut rx = match registry.subscribe(&key) {
            Some(rx) => {
                debug!(content_key = %key, "Joining in-flight session");
                rx
            }
            None => {
                let active = registry.len();
                if active >= registry.limit() {
                    warn!(active, limit = registry.limit(), "Rejecting session, registry full");
                    return Err(GuardError::Overloaded {
                        active,
                        limit: registry.limit(),
                    });
                }

                let (rx, leader) = match registry.sessions.entry(key.clone()) {
                    Entry::Occupied(existing) => (existing.get().subscribe(), None),
                    Entry::Vacant(slot) => {
                        let session_id = uuid::Uuid::new_v4().to_string();
                        let (tx, rx) = watch::channel(None);
                        slot.insert(SessionHandle::new(
                            session_id.clone(),
                            self.inner.services.clock.now(),
                            rx.clone(),
                        ));
                        (rx, Some((tx, session_id)))
                    }
                };

                if let Some((tx, session_id)) = leader {
                    let inner = self.inner.clone();
                    tokio::spawn(async move {
                        let _registration = RegistrationGuard::new(inner.registry.clone(), unit.key.clone());
                        let outcome = inner.drive(unit, config, session_id).await;
                        tx.send_replace(Some(outcome));
                    });
                }
                rx
            }
        };

        let outcome = rx
            .wait_for(|result| result.is_some())
            .await
            .map_err(|_| GuardError::SessionLost(key.clone()))?
            .clone();
        outcome.ok_or(GuardError::SessionLost(key))
    }
}

impl ControllerInner {
    fn generator_for(&self, kind: ContentKind) -> Option<Arc<dyn Generator>> {
        self.generators.iter().find(|g| g.kind() == kind).cloned()
    }

    async fn drive(&self, unit: ContentUnit, config: RegenerationConfig, session_id: String) -> ValidationOutcome {
        let services = &self.services;
        let started = Instant::now();
        let deadline = started + config.timeout();
        let threshold = unit.kind.threshold(&config);
        let weights = unit.kind.weights();

        let mut session = RegenerationSession::new(
            session_id.clone(),
            unit.key.clone(),
            unit.kind,
            config.clone(),
            services.clock.now(),
        );
        let mut pending = Some(unit.content.clone());
        let mut trigger = TriggerReason::Initial;
        let mut feedback: Vec<String> = Vec::new();
        let mut round_feedback: Option<String> = None;
        let mut latest: Option<QualityBreakdown> = None;
        let mut best_content: Option<String> = None;

        info!(
            session_id = %session_id,
            content_key = %unit.key,
            kind = unit.kind.as_str(),
            threshold,
            max_attempts = config.max_attempts,
            "Regeneration session started"
        );

        let (state, reason) = loop {
            if let Some(draft) = pending.take() {
                if Instant::now() >= deadline {
                    break (SessionState::TimedOut, StopReason::TimedOut);
                }
                session.state = SessionState::Scoring;
                let scoring_started = Instant::now();

                match timeout_at(deadline, services.oracle.evaluate(unit.kind, &draft)).await {
                    Err(_) => break (SessionState::TimedOut, StopReason::TimedOut),
                    Ok(Err(e)) => {
                        let context = ErrorContext::new()
                            .with_operation("evaluate")
                            .with_session(session_id.clone());
                        let handled = services.errors.handle_generation_error(&e, context).await;
                        session.record_failed(trigger, round_feedback.take(), handled.error.id.clone(), services.clock.now());
                        if let Some(stop) = Self::absorb(&mut session, &handled) {
                            break stop;
                        }
                    }
                    Ok(Ok(metrics)) => {
                        let breakdown = QualityScorer::breakdown(&metrics, &weights);
                        let score = breakdown.overall();
                        let best_before = session.best_score();
                        let outcome = session.record_scored(
                            trigger,
                            score,
                            breakdown.grade(),
                            round_feedback.take(),
                            content_digest(&draft),
                            services.clock.now(),
                        );
                        if best_before.map_or(true, |best| score > best) {
                            best_content = Some(draft);
                        }
                        info!(
                            session_id = %session_id,
                            attempt = session.attempts_used(),
                            score,
                            outcome = ?outcome,
                            "Draft scored"
                        );
                        services
                            .analytics
                            .record_performance(&session_id, "evaluate", elapsed_ms(scoring_started))
                            .await;
                        latest = Some(breakdown);
                    }
                }
            }

            session.state = SessionState::Deciding;
            let best = session.best_score();
            if best.is_some_and(|b| b >= threshold) {
                break (SessionState::Passed, StopReason::ThresholdMet);
            }
            if session.attempts_used() >= config.max_attempts {
                break (SessionState::Exhausted, StopReason::MaxAttempts);
            }
            if Instant::now() >= deadline {
                break (SessionState::TimedOut, StopReason::TimedOut);
            }
            let next = TriggerReason::classify(best.unwrap_or(0.0));
            if !next.warrants_regeneration(config.enable_quality_feedback_loop) {
                break (SessionState::Exhausted, StopReason::RegenerationNotWarranted);
            }

            session.state = SessionState::Regenerating;
            trigger = next;
            let round = latest
                .take()
                .map(|b| build_feedback(&b, threshold, config.enable_adaptive_prompts))
                .unwrap_or_default();
            feedback.extend(round.iter().cloned());
            let round_text = (!round.is_empty()).then(|| round.join("\n"));

            let discovered = match timeout_at(deadline, services.monitor.discover_features()).await {
                Ok(discovered) => discovered,
                Err(_) => break (SessionState::TimedOut, StopReason::TimedOut),
            };
            let enhancements: Vec<String> = discovered
                .usable_enhancements()
                .into_iter()
                .filter(|e| !session.disabled_enhancements.contains(e))
                .collect();

            let context = ErrorContext::new()
                .with_operation("generate")
                .with_session(session_id.clone())
                .with_available_features(enhancements.clone());

            let Some(generator) = self.generator_for(unit.kind) else {
                let message = format!("No generator configured for {} content", unit.kind.as_str());
                let handled = services.errors.handle_error(&message, context).await;
                session.record_failed(trigger, round_text, handled.error.id.clone(), services.clock.now());
                match Self::absorb(&mut session, &handled) {
                    Some(stop) => break stop,
                    None => continue,
                }
            };

            let request = GenerationRequest::new(unit.key.clone(), unit.kind, unit.prompt.clone())
                .with_feedback(feedback.clone())
                .with_enhancements(enhancements)
                .with_attempt(session.next_sequence());

            debug!(
                session_id = %session_id,
                attempt = request.attempt,
                trigger = ?trigger,
                generator = generator.id(),
                "Regenerating"
            );

            if Instant::now() >= deadline {
                break (SessionState::TimedOut, StopReason::TimedOut);
            }
            let generation_started = Instant::now();
            let generated = timeout_at(
                deadline,
                services.errors.run_with_recovery(context, || {
                    let generator = generator.clone();
                    let request = request.clone();
                    async move { generator.generate(request).await }
                }),
            )
            .await;

            match generated {
                Err(_) => break (SessionState::TimedOut, StopReason::TimedOut),
                Ok(Ok(content)) => {
                    services
                        .analytics
                        .record_performance(&session_id, "generate", elapsed_ms(generation_started))
                        .await;
                    round_feedback = round_text;
                    pending = Some(content.content);
                }
                Ok(Err(handled)) => {
                    session.record_failed(trigger, round_text, handled.error.id.clone(), services.clock.now());
                    if let Some(stop) = Self::absorb(&mut session, &handled) {
                        break stop;
                    }
                }
            }
        };

        session.finish(state, reason, services.clock.now());
        let final_score = session.best_score().unwrap_or(0.0);
        let passed = state == SessionState::Passed;
        let elapsed = elapsed_ms(started);

        if passed {
            info!(
                session_id = %session_id,
                score = final_score,
                attempts = session.attempts_used(),
                elapsed_ms = elapsed,
                "Session passed"
            );
        } else {
            warn!(
                session_id = %session_id,
                state = ?state,
                reason = ?reason,
                score = final_score,
                attempts = session.attempts_used(),
                elapsed_ms = elapsed,
                "Session ended without passing"
            );
        }

        services
            .analytics
            .record_usage(&session_id, "regeneration", passed, Some(elapsed))
            .await;

        let outcome = ValidationOutcome {
            session_id: session.session_id.clone(),
            content_key: session.content_key.clone(),
            passed,
            final_score,
            grade: QualityScorer::grade(final_score),
            content: best_content,
            state,
            stop_reason: reason,
            session_log: session.attempts().to_vec(),
            warnings: session.warnings.clone(),
            elapsed_ms: elapsed,
        };

        if let Err(e) = services.store.append(HistoryRecord::SessionArchived(session)).await {
            warn!(session_id = %session_id, error = %e, "Failed to archive session");
        }

        outcome
    }

    /// Fold a handled failure into the session. Returns the stop when the
    /// session must end.
    fn absorb(session: &mut RegenerationSession, handled: &ErrorHandlingResult) -> Option<Stop> {
        if let Some(warning) = &handled.warning {
            session.warnings.push(warning.clone());
        }

        match handled.recovery.strategy {
            RecoveryStrategy::Abort => Some((SessionState::Aborted, StopReason::Aborted)),
            RecoveryStrategy::Fallback => {
                for feature in &handled.recovery.unavailable_features {
                    if !session.disabled_enhancements.contains(feature) {
                        session.disabled_enhancements.push(feature.clone());
                    }
                }
                session
                    .warnings
                    .push(format!("Continuing without {}", handled.recovery.unavailable_features.join(", ")));
                None
            }
            RecoveryStrategy::Partial | RecoveryStrategy::Retry => None,
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::{AnalyticsConfig, ErrorConfig, HealthConfig};
    use crate::generator::{GenerationError, MockGenerator};
    use crate::health::{FeatureProbe, StaticProbe};
    use crate::notify::MemoryNotificationSink;
    use crate::oracle::ScriptedOracle;
    use crate::regeneration::session::AttemptOutcome;
    use crate::store::{MemoryHistoryStore, RecordFilter};
    use std::time::Duration;

    struct Harness {
        controller: RegenerationController,
        generator: Arc<MockGenerator>,
        oracle: Arc<ScriptedOracle>,
        sink: Arc<MemoryNotificationSink>,
        store: Arc<MemoryHistoryStore>,
    }

    fn harness(generator: MockGenerator, oracle: ScriptedOracle, probes: Vec<Arc<dyn FeatureProbe>>) -> Harness {
        harness_with_limit(generator, oracle, probes, 64)
    }

    fn harness_with_limit(
        generator: MockGenerator,
        oracle: ScriptedOracle,
        probes: Vec<Arc<dyn FeatureProbe>>,
        limit: usize,
    ) -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let generator = Arc::new(generator);
        let oracle = Arc::new(oracle);
        let sink = Arc::new(MemoryNotificationSink::new());
        let store = Arc::new(MemoryHistoryStore::new());
        let registry = Arc::new(SessionRegistry::new(limit));

        let analytics = Arc::new(AnalyticsRecorder::new(AnalyticsConfig::default(), clock.clone()).with_store(store.clone()));
        let errors = Arc::new(
            ErrorHandler::new(ErrorConfig::default(), clock.clone(), sink.clone()).with_analytics(analytics.clone()),
        );
        let mut monitor = FeatureHealthMonitor::new(HealthConfig::default(), clock.clone(), registry.clone())
            .with_generator(generator.clone());
        for probe in probes {
            monitor = monitor.with_probe(probe);
        }

        let services = SessionServices {
            oracle: oracle.clone(),
            monitor: Arc::new(monitor),
            errors,
            analytics,
            store: store.clone(),
            clock,
        };

        Harness {
            controller: RegenerationController::new(vec![generator.clone() as Arc<dyn Generator>], services, registry),
            generator,
            oracle,
            sink,
            store,
        }
    }

    fn unit() -> ContentUnit {
        ContentUnit::narrative("story-1/page-1", "A dragon guards a library.", "first draft")
    }

    fn config(max_attempts: u32) -> RegenerationConfig {
        RegenerationConfig::default()
            .with_max_attempts(max_attempts)
            .with_quality_threshold(7.0)
    }

    fn scores(outcome: &ValidationOutcome) -> Vec<Option<f64>> {
        outcome.session_log.iter().map(|a| a.score_after).collect()
    }

    #[tokio::test]
    async fn test_passes_at_fourth_attempt_keeping_best() {
        let h = harness(
            MockGenerator::text("writer"),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.5, 6.2, 6.0, 7.1]),
            vec![],
        );

        let outcome = h.controller.validate(unit(), config(4)).await.unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.state, SessionState::Passed);
        assert_eq!(outcome.stop_reason, StopReason::ThresholdMet);
        assert_eq!(outcome.final_score, 7.1);
        assert_eq!(scores(&outcome), vec![Some(5.5), Some(6.2), Some(6.0), Some(7.1)]);
        assert_eq!(outcome.session_log[2].score_before, Some(6.2));
        assert_eq!(outcome.session_log[2].outcome, AttemptOutcome::NoImprovement);
        assert_eq!(outcome.session_log[0].trigger, TriggerReason::Initial);
        assert_eq!(outcome.session_log[1].trigger, TriggerReason::BelowThreshold);
        assert_eq!(outcome.session_log[2].trigger, TriggerReason::NeedsImprovement);
        assert_eq!(outcome.content.as_deref(), Some("writer draft 3"));
        assert_eq!(h.generator.call_count(), 3);
        assert_eq!(h.controller.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_kept_score_never_decreases() {
        let h = harness(
            MockGenerator::text("writer"),
            ScriptedOracle::from_scores(ContentKind::Narrative, [6.5, 4.0, 6.1, 5.0]),
            vec![],
        );

        let outcome = h.controller.validate(unit(), config(4)).await.unwrap();

        let mut kept = f64::MIN;
        for attempt in &outcome.session_log {
            let before = attempt.score_before.unwrap_or(f64::MIN);
            assert!(before >= kept);
            kept = kept.max(attempt.score_after.unwrap_or(f64::MIN));
        }
        assert_eq!(outcome.final_score, 6.5);
        assert_eq!(outcome.content.as_deref(), Some("first draft"));
        assert_eq!(outcome.stop_reason, StopReason::MaxAttempts);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let h = harness(
            MockGenerator::text("writer"),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0, 5.5, 5.8]),
            vec![],
        );

        let outcome = h.controller.validate(unit(), config(3)).await.unwrap();

        assert!(!outcome.passed);
        assert_eq!(outcome.state, SessionState::Exhausted);
        assert_eq!(outcome.session_log.len(), 3);
        assert_eq!(outcome.final_score, 5.8);
        assert_eq!(h.oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn test_minor_issues_without_feedback_loop() {
        let h = harness(
            MockGenerator::text("writer"),
            ScriptedOracle::from_scores(ContentKind::Narrative, [7.2, 8.1]),
            vec![],
        );

        let outcome = h
            .controller
            .validate(unit(), config(3).with_quality_threshold(8.0))
            .await
            .unwrap();

        assert_eq!(outcome.state, SessionState::Exhausted);
        assert_eq!(outcome.stop_reason, StopReason::RegenerationNotWarranted);
        assert_eq!(outcome.session_log.len(), 1);
        assert_eq!(h.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_minor_issues_with_feedback_loop() {
        let h = harness(
            MockGenerator::text("writer"),
            ScriptedOracle::from_scores(ContentKind::Narrative, [7.2, 8.1]),
            vec![],
        );

        let outcome = h
            .controller
            .validate(unit(), config(3).with_quality_threshold(8.0).with_feedback_loop(true))
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.session_log[1].trigger, TriggerReason::MinorIssues);
        assert!(outcome.session_log[1].feedback.is_some());

        let requests = h.generator.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].feedback.is_empty());
        assert_eq!(requests[0].attempt, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_best_so_far() {
        let h = harness(
            MockGenerator::text("writer").with_delay(Duration::from_secs(10)),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0, 9.0]),
            vec![],
        );

        let outcome = h
            .controller
            .validate(unit(), config(5).with_timeout_ms(5_000))
            .await
            .unwrap();

        assert_eq!(outcome.state, SessionState::TimedOut);
        assert_eq!(outcome.stop_reason, StopReason::TimedOut);
        assert_eq!(outcome.final_score, 5.0);
        assert_eq!(outcome.session_log.len(), 1);
        assert!(outcome.elapsed_ms >= 5_000 && outcome.elapsed_ms < 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_feature_discovery_counts_against_budget() {
        let h = harness(
            MockGenerator::text("writer").with_probe_delay(Duration::from_secs(3)),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0, 9.0]),
            vec![],
        );

        let outcome = h
            .controller
            .validate(unit(), config(3).with_timeout_ms(1_000))
            .await
            .unwrap();

        assert_eq!(outcome.state, SessionState::TimedOut);
        assert_eq!(outcome.stop_reason, StopReason::TimedOut);
        assert_eq!(outcome.final_score, 5.0);
        assert_eq!(outcome.session_log.len(), 1);
        assert!(outcome.elapsed_ms <= 1_000);
        assert_eq!(h.generator.call_count(), 0);
        assert_eq!(h.oracle.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_validations_share_one_session() {
        let h = harness(
            MockGenerator::text("writer").with_delay(Duration::from_millis(200)),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0, 7.5]),
            vec![],
        );

        let (first, second) = tokio::join!(
            h.controller.validate(unit(), config(3)),
            h.controller.validate(unit(), config(1)),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first, second);
        assert!(first.passed);
        assert_eq!(h.generator.call_count(), 1);
        assert_eq!(h.oracle.call_count(), 2);

        let archived = h.store.query(&RecordFilter::sessions()).await.unwrap();
        assert_eq!(archived.len(), 1);
    }

    #[tokio::test]
    async fn test_critical_error_aborts() {
        let h = harness(
            MockGenerator::text("writer").with_script([Err(GenerationError::Configuration(
                "missing API key".to_string(),
            ))]),
            ScriptedOracle::from_scores(ContentKind::Narrative, [4.0]),
            vec![],
        );

        let outcome = h.controller.validate(unit(), config(3)).await.unwrap();

        assert_eq!(outcome.state, SessionState::Aborted);
        assert_eq!(outcome.stop_reason, StopReason::Aborted);
        assert_eq!(outcome.session_log[1].outcome, AttemptOutcome::Failed);
        assert!(outcome.session_log[1].error_id.is_some());

        let delivered = h.sink.delivered().await;
        assert_eq!(delivered.len(), 1);
        assert!(!delivered[0].dismissible);
        assert!(delivered[0].persistent);
    }

    #[tokio::test]
    async fn test_fallback_disables_enhancement() {
        let h = harness(
            MockGenerator::text("writer").with_script([Err(GenerationError::EnhancementFailed {
                feature: "style_transfer".to_string(),
                reason: "model offline".to_string(),
            })]),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0, 7.5]),
            vec![Arc::new(StaticProbe::available("style_transfer"))],
        );

        let outcome = h.controller.validate(unit(), config(3)).await.unwrap();

        assert!(outcome.passed);
        assert_eq!(scores(&outcome), vec![Some(5.0), None, Some(7.5)]);
        assert!(outcome.warnings.iter().any(|w| w.contains("style_transfer")));

        let requests = h.generator.requests().await;
        assert_eq!(requests[0].enhancements, vec!["style_transfer".to_string()]);
        assert!(requests[1].enhancements.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_retried_within_attempt() {
        let h = harness(
            MockGenerator::text("writer").with_script([Err(GenerationError::RateLimited { retry_after_ms: None })]),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0, 7.5]),
            vec![],
        );

        let outcome = h.controller.validate(unit(), config(2)).await.unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.session_log.len(), 2);
        assert_eq!(h.generator.call_count(), 2);
        assert!(h.sink.is_empty().await);
    }

    #[tokio::test]
    async fn test_illustration_uses_visual_threshold() {
        let h = harness(
            MockGenerator::image("painter"),
            ScriptedOracle::from_scores(ContentKind::Illustration, [6.5]),
            vec![],
        );
        let unit = ContentUnit::illustration("story-1/page-1/art", "A lighthouse at dusk", "https://img/1.png");

        let outcome = h
            .controller
            .validate(unit, config(3).with_visual_quality_threshold(6.0))
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.final_score, 6.5);
    }

    #[tokio::test]
    async fn test_missing_generator_aborts() {
        let h = harness(
            MockGenerator::text("writer"),
            ScriptedOracle::from_scores(ContentKind::Illustration, [3.0]),
            vec![],
        );
        let unit = ContentUnit::illustration("art", "A lighthouse", "https://img/1.png");

        let outcome = h.controller.validate(unit, config(3)).await.unwrap();
        assert_eq!(outcome.state, SessionState::Aborted);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_session() {
        let h = harness(
            MockGenerator::text("writer"),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0]),
            vec![],
        );

        let err = h.controller.validate(unit(), config(0)).await.unwrap_err();
        assert!(matches!(err, GuardError::InvalidConfig(_)));
        assert_eq!(h.oracle.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_limit() {
        let h = harness_with_limit(
            MockGenerator::text("writer").with_delay(Duration::from_secs(30)),
            ScriptedOracle::from_scores(ContentKind::Narrative, [5.0]),
            vec![],
            1,
        );

        let controller = h.controller.clone();
        let running = tokio::spawn(async move { controller.validate(unit(), config(3)).await });
        tokio::task::yield_now().await;
        assert_eq!(h.controller.active_sessions(), 1);

        let other = ContentUnit::narrative("story-1/page-2", "prompt", "draft");
        let err = h.controller.validate(other, config(3)).await.unwrap_err();
        assert!(matches!(err, GuardError::Overloaded { active: 1, limit: 1 }));

        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome.state, SessionState::Exhausted);
    }
}
