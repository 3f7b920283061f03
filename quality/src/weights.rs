//! Per-category metric weights.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::dimension::{MetricCategory, QualityDimension};

/// Allowed deviation of the weight sum from 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Invalid weight table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("Weight table is empty")]
    Empty,

    #[error("Negative or non-finite weight {weight} for {dimension}")]
    Invalid { dimension: QualityDimension, weight: f64 },

    #[error("Weight table mixes content and visual dimensions")]
    MixedCategories,

    #[error("Dimension {0} listed more than once")]
    Duplicate(QualityDimension),

    #[error("Weights sum to {0}, expected 1.0")]
    BadSum(f64),
}

/// Validated weights for one metric category.
///
/// Invariant: all dimensions share a category, weights are non-negative and
/// sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(QualityDimension, f64)>", into = "Vec<(QualityDimension, f64)>")]
pub struct MetricWeights {
    category: MetricCategory,
    entries: Vec<(QualityDimension, f64)>,
}

impl MetricWeights {
    /// Build a weight table, checking the invariants.
    pub fn new(entries: Vec<(QualityDimension, f64)>) -> Result<Self, WeightError> {
        let first = entries.first().ok_or(WeightError::Empty)?;
        let category = first.0.category();

        let mut seen = HashSet::new();
        for (dimension, weight) in &entries {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(WeightError::Invalid {
                    dimension: *dimension,
                    weight: *weight,
                });
            }
            if dimension.category() != category {
                return Err(WeightError::MixedCategories);
            }
            if !seen.insert(*dimension) {
                return Err(WeightError::Duplicate(*dimension));
            }
        }

        let sum: f64 = entries.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightError::BadSum(sum));
        }

        Ok(Self { category, entries })
    }

    /// Default content weights (.30/.25/.25/.20).
    pub fn content() -> Self {
        Self::for_category(MetricCategory::Content)
    }

    /// Default visual weights (.30/.25/.25/.20).
    pub fn visual() -> Self {
        Self::for_category(MetricCategory::Visual)
    }

    /// Default weights for a category.
    pub fn for_category(category: MetricCategory) -> Self {
        Self {
            category,
            entries: QualityDimension::for_category(category)
                .iter()
                .map(|d| (*d, d.default_weight()))
                .collect(),
        }
    }

    pub fn category(&self) -> MetricCategory {
        self.category
    }

    pub fn iter(&self) -> impl Iterator<Item = (QualityDimension, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Weight assigned to a dimension, if it is part of this table.
    pub fn weight_of(&self, dimension: QualityDimension) -> Option<f64> {
        self.entries
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, w)| *w)
    }
}

impl TryFrom<Vec<(QualityDimension, f64)>> for MetricWeights {
    type Error = WeightError;

    fn try_from(entries: Vec<(QualityDimension, f64)>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<MetricWeights> for Vec<(QualityDimension, f64)> {
    fn from(weights: MetricWeights) -> Self {
        weights.entries
    }
}
