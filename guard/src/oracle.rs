//! Scoring oracle collaborator.
//!
//! Metric values are produced upstream (model-based critics, human raters);
//! the guard only consumes them.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use storyforge_quality::{QualityDimension, QualityMetricSet};
use tokio::sync::Mutex;

use crate::content::ContentKind;
use crate::generator::GenerationError;

/// Supplies metric readings for a draft.
#[async_trait]
pub trait QualityOracle: Send + Sync {
    async fn evaluate(&self, kind: ContentKind, content: &str) -> Result<QualityMetricSet, GenerationError>;
}

/// Oracle returning pre-recorded readings in call order.
///
/// The last reading repeats once the script runs out.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<QualityMetricSet>>,
    last: Mutex<Option<QualityMetricSet>>,
    calls: AtomicU32,
}

impl ScriptedOracle {
    pub fn new(readings: impl IntoIterator<Item = QualityMetricSet>) -> Self {
        Self {
            script: Mutex::new(readings.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    /// One reading per score, with every dimension of the kind's category
    /// set to that score so the overall score equals it.
    pub fn from_scores(kind: ContentKind, scores: impl IntoIterator<Item = f64>) -> Self {
        Self::new(scores.into_iter().map(|score| uniform(kind, score)))
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// A reading with every dimension of the kind's category at `score`.
pub fn uniform(kind: ContentKind, score: f64) -> QualityMetricSet {
    QualityDimension::for_category(kind.category())
        .iter()
        .map(|d| (*d, score))
        .collect()
}

#[async_trait]
impl QualityOracle for ScriptedOracle {
    async fn evaluate(&self, _kind: ContentKind, _content: &str) -> Result<QualityMetricSet, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().await.pop_front();
        let mut last = self.last.lock().await;
        match next {
            Some(reading) => {
                *last = Some(reading.clone());
                Ok(reading)
            }
            None => last
                .clone()
                .ok_or_else(|| GenerationError::Unavailable("Scripted oracle has no readings".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyforge_quality::{MetricWeights, QualityScorer};

    #[tokio::test]
    async fn test_scripted_oracle_repeats_last() {
        let oracle = ScriptedOracle::from_scores(ContentKind::Narrative, [5.5, 7.1]);
        let weights = MetricWeights::content();

        let first = oracle.evaluate(ContentKind::Narrative, "a").await.unwrap();
        let second = oracle.evaluate(ContentKind::Narrative, "b").await.unwrap();
        let third = oracle.evaluate(ContentKind::Narrative, "c").await.unwrap();

        assert_eq!(QualityScorer::score(&first, &weights), 5.5);
        assert_eq!(QualityScorer::score(&second, &weights), 7.1);
        assert_eq!(third, second);
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_oracle_fails() {
        let oracle = ScriptedOracle::new([]);
        assert!(oracle.evaluate(ContentKind::Illustration, "x").await.is_err());
    }
}
