//! Quality scoring for StoryForge generated content.
//!
//! Pure, synchronous building blocks shared by the regeneration pipeline:
//!
//! - [`QualityDimension`]: the eight named 0–10 dimensions, split into
//!   content (narrative) and visual (illustration) categories
//! - [`QualityMetricSet`]: raw metric values as supplied by a scoring oracle
//! - [`MetricWeights`]: validated per-category weights summing to 1.0
//! - [`QualityScorer`]: weighted aggregation into a [`QualityBreakdown`]
//!   with a [`QualityGrade`]
//!
//! # Example
//!
//! ```
//! use storyforge_quality::{MetricWeights, QualityDimension, QualityGrade, QualityMetricSet, QualityScorer};
//!
//! let metrics = QualityMetricSet::new()
//!     .with(QualityDimension::NarrativeCoherence, 8.5)
//!     .with(QualityDimension::CharacterDepth, 7.2)
//!     .with(QualityDimension::PlotComplexity, 9.1)
//!     .with(QualityDimension::ThematicConsistency, 8.8);
//!
//! let breakdown = QualityScorer::breakdown(&metrics, &MetricWeights::content());
//! assert_eq!(breakdown.overall(), 8.4);
//! assert_eq!(breakdown.grade(), QualityGrade::Good);
//! ```

pub mod dimension;
pub mod error;
pub mod metrics;
pub mod scorer;
pub mod weights;

// Re-export main types
pub use dimension::{MetricCategory, QualityDimension};
pub use error::{QualityError, Result};
pub use metrics::{Adjustment, QualityMetricSet, SanitizedValue, MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE};
pub use scorer::{DimensionScore, QualityBreakdown, QualityGrade, QualityScorer};
pub use weights::{MetricWeights, WeightError};
