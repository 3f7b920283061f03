//! Aggregated analytics reports.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::event::{AnalyticsEvent, EventPayload};
use crate::recovery::ErrorType;

/// Ratings at or above this count as promoters.
const PROMOTER_RATING: f64 = 4.5;
/// Ratings at or below this count as detractors.
const DETRACTOR_RATING: f64 = 3.0;

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `window` ending at `now`.
    pub fn last(window: Duration, now: DateTime<Utc>) -> Self {
        Self {
            start: now - window,
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Usage figures for one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureUsageStats {
    pub usage_count: usize,
    pub success_count: usize,
    pub success_rate: f64,
    pub avg_duration_ms: Option<f64>,
    pub avg_satisfaction: Option<f64>,
}

#[derive(Default)]
struct FeatureAccumulator {
    uses: usize,
    successes: usize,
    duration: Mean,
    satisfaction: Mean,
}

#[derive(Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Aggregate view over a slice of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub range: TimeRange,
    pub total_events: usize,
    pub distinct_sessions: usize,
    /// Sessions with at least one usage event / distinct sessions
    pub adoption_rate: f64,
    pub features: BTreeMap<String, FeatureUsageStats>,
    pub avg_response_ms: Option<f64>,
    /// Average latency divided by the configured baseline
    pub performance_ratio: Option<f64>,
    pub error_count: usize,
    pub error_rate: f64,
    pub error_breakdown: BTreeMap<ErrorType, usize>,
    pub avg_satisfaction: Option<f64>,
    /// Percentage of promoters minus percentage of detractors, in [-100, 100]
    pub recommendation_score: Option<f64>,
}

impl AnalyticsReport {
    /// Aggregate the events that fall inside `range` in a single pass.
    pub fn build<'a>(
        events: impl IntoIterator<Item = &'a AnalyticsEvent>,
        range: TimeRange,
        baseline_ms: f64,
    ) -> Self {
        let mut total = 0usize;
        let mut sessions: HashSet<&str> = HashSet::new();
        let mut adopting: HashSet<&str> = HashSet::new();
        let mut features: BTreeMap<String, FeatureAccumulator> = BTreeMap::new();
        let mut latency = Mean::default();
        let mut errors: BTreeMap<ErrorType, usize> = BTreeMap::new();
        let mut error_count = 0usize;
        let mut satisfaction = Mean::default();
        let mut promoters = 0usize;
        let mut detractors = 0usize;

        for event in events.into_iter().filter(|e| range.contains(e.timestamp)) {
            total += 1;
            sessions.insert(&event.session_id);

            match &event.payload {
                EventPayload::Usage {
                    feature,
                    success,
                    duration_ms,
                } => {
                    adopting.insert(&event.session_id);
                    let acc = features.entry(feature.clone()).or_default();
                    acc.uses += 1;
                    if *success {
                        acc.successes += 1;
                    }
                    if let Some(ms) = duration_ms {
                        acc.duration.add(*ms as f64);
                    }
                }
                EventPayload::Performance { duration_ms, .. } => latency.add(*duration_ms as f64),
                EventPayload::Error { error_type, .. } => {
                    error_count += 1;
                    *errors.entry(*error_type).or_insert(0) += 1;
                }
                EventPayload::Satisfaction { rating, feature } => {
                    satisfaction.add(*rating);
                    if *rating >= PROMOTER_RATING {
                        promoters += 1;
                    } else if *rating <= DETRACTOR_RATING {
                        detractors += 1;
                    }
                    if let Some(feature) = feature {
                        features.entry(feature.clone()).or_default().satisfaction.add(*rating);
                    }
                }
            }
        }

        let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };
        let avg_response_ms = latency.value();

        Self {
            range,
            total_events: total,
            distinct_sessions: sessions.len(),
            adoption_rate: ratio(adopting.len(), sessions.len()),
            features: features
                .into_iter()
                .map(|(name, acc)| {
                    let stats = FeatureUsageStats {
                        usage_count: acc.uses,
                        success_count: acc.successes,
                        success_rate: ratio(acc.successes, acc.uses),
                        avg_duration_ms: acc.duration.value(),
                        avg_satisfaction: acc.satisfaction.value(),
                    };
                    (name, stats)
                })
                .collect(),
            avg_response_ms,
            performance_ratio: avg_response_ms
                .filter(|_| baseline_ms > 0.0)
                .map(|avg| avg / baseline_ms),
            error_count,
            error_rate: ratio(error_count, total),
            error_breakdown: errors,
            avg_satisfaction: satisfaction.value(),
            recommendation_score: (satisfaction.count > 0).then(|| {
                (promoters as f64 - detractors as f64) / satisfaction.count as f64 * 100.0
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::Severity;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn usage(session: &str, secs: i64, feature: &str, success: bool) -> AnalyticsEvent {
        AnalyticsEvent::new(
            session,
            at(secs),
            EventPayload::Usage {
                feature: feature.to_string(),
                success,
                duration_ms: Some(1_000),
            },
        )
    }

    fn rating(session: &str, secs: i64, value: f64) -> AnalyticsEvent {
        AnalyticsEvent::new(
            session,
            at(secs),
            EventPayload::Satisfaction {
                rating: value,
                feature: Some("regeneration".to_string()),
            },
        )
    }

    #[test]
    fn test_report_aggregates() {
        let events = vec![
            usage("a", 1, "regeneration", true),
            usage("a", 2, "regeneration", false),
            usage("b", 3, "style_transfer", true),
            AnalyticsEvent::new("c", at(4), EventPayload::Performance {
                operation: "generate".to_string(),
                duration_ms: 3_000,
            }),
            AnalyticsEvent::new("c", at(5), EventPayload::Error {
                error_id: "e1".to_string(),
                error_type: ErrorType::FeatureFailure,
                severity: Severity::High,
                feature: Some("style_transfer".to_string()),
            }),
            rating("a", 6, 5.0),
            rating("b", 7, 5.0),
            rating("d", 8, 2.0),
            rating("d", 9, 4.0),
        ];

        let report = AnalyticsReport::build(&events, TimeRange::new(at(0), at(100)), 2_000.0);

        assert_eq!(report.total_events, 9);
        assert_eq!(report.distinct_sessions, 4);
        assert_eq!(report.adoption_rate, 0.5);

        let regeneration = &report.features["regeneration"];
        assert_eq!(regeneration.usage_count, 2);
        assert_eq!(regeneration.success_rate, 0.5);
        assert_eq!(regeneration.avg_duration_ms, Some(1_000.0));
        assert_eq!(regeneration.avg_satisfaction, Some(4.0));

        assert_eq!(report.performance_ratio, Some(1.5));
        assert_eq!(report.error_breakdown[&ErrorType::FeatureFailure], 1);
        // 2 promoters, 1 detractor, 4 ratings
        assert_eq!(report.recommendation_score, Some(25.0));
    }

    #[test]
    fn test_report_respects_range() {
        let events = vec![usage("a", 1, "regeneration", true), usage("b", 50, "regeneration", true)];
        let report = AnalyticsReport::build(&events, TimeRange::new(at(10), at(60)), 2_000.0);
        assert_eq!(report.total_events, 1);
        assert_eq!(report.distinct_sessions, 1);
    }

    #[test]
    fn test_empty_report() {
        let events: Vec<AnalyticsEvent> = Vec::new();
        let report = AnalyticsReport::build(&events, TimeRange::new(at(0), at(1)), 2_000.0);
        assert_eq!(report.total_events, 0);
        assert_eq!(report.adoption_rate, 0.0);
        assert_eq!(report.recommendation_score, None);
        assert_eq!(report.avg_response_ms, None);
    }
}
