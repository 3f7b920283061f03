//! Append-only analytics log with threshold alerting.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::alert::{AlertType, PerformanceAlert};
use super::event::{AnalyticsEvent, EventPayload};
use super::report::{AnalyticsReport, TimeRange};
use crate::clock::Clock;
use crate::config::AnalyticsConfig;
use crate::recovery::ProfessionalError;
use crate::store::{HistoryRecord, HistoryStore};

/// Alert candidate produced by window evaluation.
struct Breach {
    alert_type: AlertType,
    message: String,
    value: f64,
    threshold: f64,
}

/// Alerts kept in memory; the oldest are dropped first.
const MAX_RETAINED_ALERTS: usize = 500;

/// Records events, evaluates rolling windows and raises alerts.
///
/// Nothing recorded here feeds back into regeneration or recovery decisions.
pub struct AnalyticsRecorder {
    config: AnalyticsConfig,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn HistoryStore>>,
    events: RwLock<VecDeque<AnalyticsEvent>>,
    alerts: RwLock<Vec<PerformanceAlert>>,
}

impl AnalyticsRecorder {
    pub fn new(config: AnalyticsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            store: None,
            events: RwLock::new(VecDeque::new()),
            alerts: RwLock::new(Vec::new()),
        }
    }

    /// Also persist every event to `store`.
    pub fn with_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Append an event. Returns alerts newly raised by it.
    pub async fn record(&self, event: AnalyticsEvent) -> Vec<PerformanceAlert> {
        let breaches = {
            let mut events = self.events.write().await;
            events.push_back(event.clone());
            while events.len() > self.config.max_events {
                events.pop_front();
            }

            let events = events.downgrade();
            self.evaluate(&events, &event.payload)
        };

        let raised = self.raise(breaches).await;

        if let Some(store) = &self.store {
            if let Err(e) = store.append(HistoryRecord::Event(event)).await {
                warn!(error = %e, "Failed to persist analytics event");
            }
        }

        raised
    }

    pub async fn record_usage(
        &self,
        session_id: &str,
        feature: &str,
        success: bool,
        duration_ms: Option<u64>,
    ) -> Vec<PerformanceAlert> {
        let payload = EventPayload::Usage {
            feature: feature.to_string(),
            success,
            duration_ms,
        };
        self.record(AnalyticsEvent::new(session_id, self.clock.now(), payload)).await
    }

    pub async fn record_performance(&self, session_id: &str, operation: &str, duration_ms: u64) -> Vec<PerformanceAlert> {
        let payload = EventPayload::Performance {
            operation: operation.to_string(),
            duration_ms,
        };
        self.record(AnalyticsEvent::new(session_id, self.clock.now(), payload)).await
    }

    pub async fn record_error(&self, session_id: &str, error: &ProfessionalError) -> Vec<PerformanceAlert> {
        let payload = EventPayload::from_error(error);
        self.record(AnalyticsEvent::new(session_id, self.clock.now(), payload)).await
    }

    /// Record a rating out of 5. Out-of-range ratings are clamped and
    /// non-finite ones ignored.
    pub async fn record_satisfaction(
        &self,
        session_id: &str,
        rating: f64,
        feature: Option<&str>,
    ) -> Vec<PerformanceAlert> {
        if !rating.is_finite() {
            warn!(session_id, "Ignoring non-finite satisfaction rating");
            return Vec::new();
        }
        let payload = EventPayload::Satisfaction {
            rating: rating.clamp(0.0, 5.0),
            feature: feature.map(str::to_string),
        };
        self.record(AnalyticsEvent::new(session_id, self.clock.now(), payload)).await
    }

    /// Every alert raised so far.
    pub async fn alerts(&self) -> Vec<PerformanceAlert> {
        self.alerts.read().await.clone()
    }

    /// Unresolved alerts.
    pub async fn active_alerts(&self) -> Vec<PerformanceAlert> {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|a| !a.is_resolved())
            .cloned()
            .collect()
    }

    /// Mark an alert resolved. Returns false if it is unknown or already resolved.
    pub async fn resolve_alert(&self, alert_id: &str) -> bool {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == alert_id && !a.is_resolved()) {
            Some(alert) => {
                alert.resolved_at = Some(self.clock.now());
                debug!(alert_id, alert_type = ?alert.alert_type, "Alert resolved");
                true
            }
            None => false,
        }
    }

    /// Snapshot of the in-memory log, oldest first.
    pub async fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Aggregate the in-memory log over `range`.
    pub async fn report(&self, range: TimeRange) -> AnalyticsReport {
        let events = self.events.read().await;
        AnalyticsReport::build(events.iter(), range, self.config.performance_baseline_ms)
    }

    fn evaluate(&self, events: &VecDeque<AnalyticsEvent>, latest: &EventPayload) -> Vec<Breach> {
        let mut breaches = Vec::new();

        let window: Vec<&AnalyticsEvent> = events.iter().rev().take(self.config.error_window).collect();
        if window.len() >= self.config.min_error_sample {
            let errors = window.iter().filter(|e| e.is_error()).count();
            let rate = errors as f64 / window.len() as f64;
            if rate > self.config.error_rate_threshold {
                breaches.push(Breach {
                    alert_type: AlertType::ErrorSpike,
                    message: format!(
                        "Error rate {:.1}% over the last {} events",
                        rate * 100.0,
                        window.len()
                    ),
                    value: rate,
                    threshold: self.config.error_rate_threshold,
                });
            }
        }

        if matches!(latest, EventPayload::Performance { .. }) {
            let durations: Vec<f64> = events
                .iter()
                .rev()
                .filter_map(|e| match e.payload {
                    EventPayload::Performance { duration_ms, .. } => Some(duration_ms as f64),
                    _ => None,
                })
                .take(self.config.performance_window)
                .collect();
            let avg = durations.iter().sum::<f64>() / durations.len() as f64;
            let ratio = avg / self.config.performance_baseline_ms;
            if ratio > self.config.degradation_ratio {
                breaches.push(Breach {
                    alert_type: AlertType::PerformanceDegradation,
                    message: format!(
                        "Average latency {:.0}ms is {:.1}x the {:.0}ms baseline",
                        avg, ratio, self.config.performance_baseline_ms
                    ),
                    value: ratio,
                    threshold: self.config.degradation_ratio,
                });
            }
        }

        if matches!(latest, EventPayload::Satisfaction { .. }) {
            let ratings: Vec<f64> = events
                .iter()
                .rev()
                .filter_map(|e| match e.payload {
                    EventPayload::Satisfaction { rating, .. } => Some(rating),
                    _ => None,
                })
                .take(self.config.satisfaction_window)
                .collect();
            let avg = ratings.iter().sum::<f64>() / ratings.len() as f64;
            if avg < self.config.satisfaction_threshold {
                breaches.push(Breach {
                    alert_type: AlertType::UserSatisfactionDrop,
                    message: format!("Average satisfaction {:.2}/5 over the last {} ratings", avg, ratings.len()),
                    value: avg,
                    threshold: self.config.satisfaction_threshold,
                });
            }
        }

        breaches
    }

    async fn raise(&self, breaches: Vec<Breach>) -> Vec<PerformanceAlert> {
        if breaches.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let dedup = chrono::Duration::seconds(self.config.alert_dedup_secs as i64);
        let mut alerts = self.alerts.write().await;
        Self::prune(&mut alerts, now, dedup);
        let mut raised = Vec::new();

        for breach in breaches {
            let suppressed = alerts
                .iter()
                .any(|a| a.alert_type == breach.alert_type && !a.is_resolved() && now - a.raised_at < dedup);
            if suppressed {
                continue;
            }

            let alert = PerformanceAlert::new(breach.alert_type, breach.message, breach.value, breach.threshold, now);
            warn!(
                alert_id = %alert.id,
                alert_type = ?alert.alert_type,
                value = alert.value,
                threshold = alert.threshold,
                "{}",
                alert.message
            );
            alerts.push(alert.clone());
            raised.push(alert);
        }

        let overflow = alerts.len().saturating_sub(MAX_RETAINED_ALERTS);
        alerts.drain(..overflow);
        raised
    }

    /// Drop alerts resolved longer ago than the dedup window.
    fn prune(alerts: &mut Vec<PerformanceAlert>, now: DateTime<Utc>, dedup: chrono::Duration) {
        alerts.retain(|a| a.resolved_at.map_or(true, |resolved| now - resolved < dedup));
    }
}
