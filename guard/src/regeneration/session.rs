//! Regeneration session state and log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyforge_quality::QualityGrade;

use crate::config::RegenerationConfig;
use crate::content::ContentKind;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Scores below this always warrant a regeneration.
pub const BELOW_THRESHOLD_SCORE: f64 = 6.0;
/// Scores below this (and at least [`BELOW_THRESHOLD_SCORE`]) need improvement.
pub const NEEDS_IMPROVEMENT_SCORE: f64 = 7.0;

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Scoring,
    Deciding,
    Regenerating,
    Passed,
    Exhausted,
    TimedOut,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Exhausted | Self::TimedOut | Self::Aborted)
    }
}

/// Why an attempt was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// The submitted draft
    Initial,
    BelowThreshold,
    NeedsImprovement,
    MinorIssues,
}

impl TriggerReason {
    /// Classify a score that missed the pass threshold.
    pub fn classify(score: f64) -> Self {
        if score < BELOW_THRESHOLD_SCORE {
            Self::BelowThreshold
        } else if score < NEEDS_IMPROVEMENT_SCORE {
            Self::NeedsImprovement
        } else {
            Self::MinorIssues
        }
    }

    /// Whether a regeneration is warranted at all.
    pub fn warrants_regeneration(&self, feedback_loop_enabled: bool) -> bool {
        match self {
            Self::MinorIssues => feedback_loop_enabled,
            _ => true,
        }
    }
}

/// Outcome of one attempt relative to the running best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// First scored draft; nothing to compare against
    Baseline,
    Improved,
    Marginal,
    NoImprovement,
    /// No score was produced
    Failed,
}

impl AttemptOutcome {
    pub fn classify(best_before: Option<f64>, score: f64, improvement_threshold: f64) -> Self {
        match best_before {
            None => Self::Baseline,
            Some(best) => {
                let delta = score - best;
                if delta <= 0.0 {
                    Self::NoImprovement
                } else if delta >= improvement_threshold {
                    Self::Improved
                } else {
                    Self::Marginal
                }
            }
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ThresholdMet,
    MaxAttempts,
    RegenerationNotWarranted,
    TimedOut,
    Aborted,
}

/// One entry of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RegenerationAttempt {
    /// 1-based; attempt 1 is the submitted draft
    pub sequence: u32,
    pub trigger: TriggerReason,
    /// Kept score before this attempt
    pub score_before: Option<f64>,
    /// Score of this attempt's draft
    pub score_after: Option<f64>,
    pub grade: Option<QualityGrade>,
    /// Feedback sent with the regeneration request
    pub feedback: Option<String>,
    pub outcome: AttemptOutcome,
    /// SHA-256 of the scored draft
    pub content_digest: Option<String>,
    /// Classified error for failed attempts
    pub error_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per content-unit regeneration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RegenerationSession {
    pub session_id: String,
    pub content_key: String,
    pub kind: ContentKind,
    /// Config snapshot taken at creation
    pub config: RegenerationConfig,
    attempts: Vec<RegenerationAttempt>,
    pub state: SessionState,
    pub stop_reason: Option<StopReason>,
    pub warnings: Vec<String>,
    pub disabled_enhancements: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RegenerationSession {
    pub fn new(
        session_id: impl Into<String>,
        content_key: impl Into<String>,
        kind: ContentKind,
        config: RegenerationConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            content_key: content_key.into(),
            kind,
            config,
            attempts: Vec::new(),
            state: SessionState::Scoring,
            stop_reason: None,
            warnings: Vec::new(),
            disabled_enhancements: Vec::new(),
            started_at,
            finished_at: None,
        }
    }

    /// Attempts in order; entries are never removed.
    pub fn attempts(&self) -> &[RegenerationAttempt] {
        &self.attempts
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn next_sequence(&self) -> u32 {
        self.attempts_used() + 1
    }

    /// Kept score: the maximum over scored attempts.
    pub fn best_score(&self) -> Option<f64> {
        self.attempts
            .iter()
            .filter_map(|a| a.score_after)
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
    }

    /// Kept score after each attempt.
    pub fn kept_scores(&self) -> Vec<Option<f64>> {
        let mut best: Option<f64> = None;
        self.attempts
            .iter()
            .map(|a| {
                if let Some(score) = a.score_after {
                    best = Some(best.map_or(score, |b| b.max(score)));
                }
                best
            })
            .collect()
    }

    /// Append a scored attempt and return its outcome.
    pub fn record_scored(
        &mut self,
        trigger: TriggerReason,
        score: f64,
        grade: QualityGrade,
        feedback: Option<String>,
        content_digest: String,
        now: DateTime<Utc>,
    ) -> AttemptOutcome {
        let score_before = self.best_score();
        let outcome = AttemptOutcome::classify(score_before, score, self.config.improvement_threshold);
        self.attempts.push(RegenerationAttempt {
            sequence: self.next_sequence(),
            trigger,
            score_before,
            score_after: Some(score),
            grade: Some(grade),
            feedback,
            outcome,
            content_digest: Some(content_digest),
            error_id: None,
            timestamp: now,
        });
        outcome
    }

    /// Append an attempt that produced no score.
    pub fn record_failed(
        &mut self,
        trigger: TriggerReason,
        feedback: Option<String>,
        error_id: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.attempts.push(RegenerationAttempt {
            sequence: self.next_sequence(),
            trigger,
            score_before: self.best_score(),
            score_after: None,
            grade: None,
            feedback,
            outcome: AttemptOutcome::Failed,
            content_digest: None,
            error_id: Some(error_id.into()),
            timestamp: now,
        });
    }

    pub fn finish(&mut self, state: SessionState, reason: StopReason, now: DateTime<Utc>) {
        self.state = state;
        self.stop_reason = Some(reason);
        self.finished_at = Some(now);
    }
}

/// Terminal result returned to every caller of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ValidationOutcome {
    pub session_id: String,
    pub content_key: String,
    pub passed: bool,
    /// Kept score; 0.0 when no draft could be scored
    pub final_score: f64,
    pub grade: QualityGrade,
    /// Kept draft
    pub content: Option<String>,
    pub state: SessionState,
    pub stop_reason: StopReason,
    pub session_log: Vec<RegenerationAttempt>,
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_trigger_classification() {
        assert_eq!(TriggerReason::classify(5.9), TriggerReason::BelowThreshold);
        assert_eq!(TriggerReason::classify(6.0), TriggerReason::NeedsImprovement);
        assert_eq!(TriggerReason::classify(6.9), TriggerReason::NeedsImprovement);
        assert_eq!(TriggerReason::classify(7.0), TriggerReason::MinorIssues);
        assert!(!TriggerReason::MinorIssues.warrants_regeneration(false));
        assert!(TriggerReason::MinorIssues.warrants_regeneration(true));
        assert!(TriggerReason::BelowThreshold.warrants_regeneration(false));
    }

    #[test]
    fn test_attempt_outcomes() {
        assert_eq!(AttemptOutcome::classify(None, 5.0, 0.5), AttemptOutcome::Baseline);
        assert_eq!(AttemptOutcome::classify(Some(5.0), 5.5, 0.5), AttemptOutcome::Improved);
        assert_eq!(AttemptOutcome::classify(Some(5.0), 5.2, 0.5), AttemptOutcome::Marginal);
        assert_eq!(AttemptOutcome::classify(Some(5.0), 5.0, 0.5), AttemptOutcome::NoImprovement);
        assert_eq!(AttemptOutcome::classify(Some(5.0), 4.0, 0.5), AttemptOutcome::NoImprovement);
    }

    #[test]
    fn test_kept_score_is_running_max() {
        let mut session = RegenerationSession::new("s", "k", ContentKind::Narrative, RegenerationConfig::default(), now());
        for score in [5.5, 6.2, 6.0] {
            session.record_scored(
                TriggerReason::BelowThreshold,
                score,
                QualityGrade::from_score(score),
                None,
                "digest".to_string(),
                now(),
            );
        }
        session.record_failed(TriggerReason::NeedsImprovement, None, "err-1", now());

        assert_eq!(session.best_score(), Some(6.2));
        assert_eq!(session.kept_scores(), vec![Some(5.5), Some(6.2), Some(6.2), Some(6.2)]);
        assert_eq!(session.attempts()[2].outcome, AttemptOutcome::NoImprovement);
        assert_eq!(session.attempts()[3].outcome, AttemptOutcome::Failed);
        assert_eq!(session.attempts()[3].sequence, 4);
    }
}
