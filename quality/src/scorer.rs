//! Weighted aggregation of metric readings into a score and grade.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dimension::{MetricCategory, QualityDimension};
use crate::metrics::{Adjustment, QualityMetricSet};
use crate::weights::MetricWeights;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Discrete label for a quality score.
///
/// Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    Poor,
    NeedsImprovement,
    Acceptable,
    Good,
    Excellent,
}

impl QualityGrade {
    /// Grade a score. Total over all inputs; NaN grades as `Poor`.
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Self::Excellent
        } else if score >= 8.0 {
            Self::Good
        } else if score >= 7.0 {
            Self::Acceptable
        } else if score >= 5.0 {
            Self::NeedsImprovement
        } else {
            Self::Poor
        }
    }

    /// Inclusive lower bound of this grade.
    pub fn min_score(&self) -> f64 {
        match self {
            Self::Excellent => 9.0,
            Self::Good => 8.0,
            Self::Acceptable => 7.0,
            Self::NeedsImprovement => 5.0,
            Self::Poor => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Acceptable => "Acceptable",
            Self::NeedsImprovement => "Needs Improvement",
            Self::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One dimension's share of an overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct DimensionScore {
    pub dimension: QualityDimension,
    /// Sanitized reading
    pub value: f64,
    pub weight: f64,
    /// value * weight, unrounded
    pub contribution: f64,
    pub adjustment: Adjustment,
}

/// Immutable result of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct QualityBreakdown {
    overall: f64,
    grade: QualityGrade,
    category: MetricCategory,
    dimensions: Vec<DimensionScore>,
}

impl QualityBreakdown {
    /// Overall score rounded to one decimal.
    pub fn overall(&self) -> f64 {
        self.overall
    }

    pub fn grade(&self) -> QualityGrade {
        self.grade
    }

    pub fn category(&self) -> MetricCategory {
        self.category
    }

    pub fn dimensions(&self) -> &[DimensionScore] {
        &self.dimensions
    }

    /// Whether the overall score reaches `threshold`.
    pub fn meets(&self, threshold: f64) -> bool {
        self.overall >= threshold
    }

    /// The `n` lowest-scoring dimensions, heavier weight first on ties.
    pub fn weakest(&self, n: usize) -> Vec<&DimensionScore> {
        let mut sorted: Vec<&DimensionScore> = self.dimensions.iter().collect();
        sorted.sort_by(|a, b| {
            a.value
                .total_cmp(&b.value)
                .then_with(|| b.weight.total_cmp(&a.weight))
        });
        sorted.truncate(n);
        sorted
    }

    /// Number of readings that had to be clamped or defaulted.
    pub fn adjusted_count(&self) -> usize {
        self.dimensions
            .iter()
            .filter(|d| d.adjustment != Adjustment::None)
            .count()
    }
}

/// Stateless weighted scorer.
pub struct QualityScorer;

impl QualityScorer {
    /// Weighted sum of sanitized readings, rounded to one decimal.
    pub fn score(metrics: &QualityMetricSet, weights: &MetricWeights) -> f64 {
        let raw: f64 = weights
            .iter()
            .map(|(dimension, weight)| metrics.value(dimension) * weight)
            .sum();
        round_to_tenth(raw)
    }

    /// Grade a score.
    pub fn grade(score: f64) -> QualityGrade {
        QualityGrade::from_score(score)
    }

    /// Score with a full per-dimension breakdown.
    pub fn breakdown(metrics: &QualityMetricSet, weights: &MetricWeights) -> QualityBreakdown {
        let dimensions: Vec<DimensionScore> = weights
            .iter()
            .map(|(dimension, weight)| {
                let sanitized = metrics.sanitized(dimension);
                if sanitized.adjustment != Adjustment::None {
                    debug!(
                        dimension = %dimension,
                        raw = ?metrics.raw(dimension),
                        used = sanitized.value,
                        adjustment = ?sanitized.adjustment,
                        "Metric reading adjusted before scoring"
                    );
                }
                DimensionScore {
                    dimension,
                    value: sanitized.value,
                    weight,
                    contribution: sanitized.value * weight,
                    adjustment: sanitized.adjustment,
                }
            })
            .collect();

        let overall = round_to_tenth(dimensions.iter().map(|d| d.contribution).sum());

        QualityBreakdown {
            overall,
            grade: QualityGrade::from_score(overall),
            category: weights.category(),
            dimensions,
        }
    }
}

/// Round half-up to one decimal.
///
/// The sum is first snapped to thousandths so binary noise such as
/// 8.384999999 still rounds to 8.4. Inputs are non-negative.
fn round_to_tenth(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let thousandths = (value * 1000.0).round() as i64;
    ((thousandths + 50).div_euclid(100)) as f64 / 10.0
}
