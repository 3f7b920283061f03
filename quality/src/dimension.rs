//! Quality dimension definitions.
//!
//! Keys match the camelCase names used by the scoring oracle payloads.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Category a dimension belongs to.
///
/// Narrative text is scored on content dimensions, illustrations on visual ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Content,
    Visual,
}

impl MetricCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Visual => "visual",
        }
    }
}

/// A named 0–10 quality dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub enum QualityDimension {
    // ========== Content ==========
    /// Story events follow logically from one another
    NarrativeCoherence,
    /// Characters have motivation, voice and growth
    CharacterDepth,
    /// Plot has meaningful tension, branches and payoffs
    PlotComplexity,
    /// Themes are carried consistently through the piece
    ThematicConsistency,

    // ========== Visual ==========
    /// Technical image quality (resolution, artifacts, composition)
    ImageQuality,
    /// Consistency of characters and style across illustrations
    VisualConsistency,
    /// Publication-ready finish
    ProfessionalStandard,
    /// Illustration depicts what the narrative describes
    NarrativeAlignment,
}

const CONTENT_DIMENSIONS: [QualityDimension; 4] = [
    QualityDimension::NarrativeCoherence,
    QualityDimension::CharacterDepth,
    QualityDimension::PlotComplexity,
    QualityDimension::ThematicConsistency,
];

const VISUAL_DIMENSIONS: [QualityDimension; 4] = [
    QualityDimension::ImageQuality,
    QualityDimension::VisualConsistency,
    QualityDimension::ProfessionalStandard,
    QualityDimension::NarrativeAlignment,
];

impl QualityDimension {
    /// Category this dimension is scored under.
    pub fn category(&self) -> MetricCategory {
        match self {
            Self::NarrativeCoherence
            | Self::CharacterDepth
            | Self::PlotComplexity
            | Self::ThematicConsistency => MetricCategory::Content,
            Self::ImageQuality
            | Self::VisualConsistency
            | Self::ProfessionalStandard
            | Self::NarrativeAlignment => MetricCategory::Visual,
        }
    }

    /// Default weight within its category.
    pub fn default_weight(&self) -> f64 {
        match self {
            Self::NarrativeCoherence | Self::ImageQuality => 0.30,
            Self::CharacterDepth | Self::VisualConsistency => 0.25,
            Self::PlotComplexity | Self::ProfessionalStandard => 0.25,
            Self::ThematicConsistency | Self::NarrativeAlignment => 0.20,
        }
    }

    /// Oracle payload key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::NarrativeCoherence => "narrativeCoherence",
            Self::CharacterDepth => "characterDepth",
            Self::PlotComplexity => "plotComplexity",
            Self::ThematicConsistency => "thematicConsistency",
            Self::ImageQuality => "imageQuality",
            Self::VisualConsistency => "visualConsistency",
            Self::ProfessionalStandard => "professionalStandard",
            Self::NarrativeAlignment => "narrativeAlignment",
        }
    }

    /// Parse an oracle payload key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().into_iter().find(|d| d.key() == key)
    }

    /// Human-readable label used in regeneration feedback.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NarrativeCoherence => "narrative coherence",
            Self::CharacterDepth => "character depth",
            Self::PlotComplexity => "plot complexity",
            Self::ThematicConsistency => "thematic consistency",
            Self::ImageQuality => "image quality",
            Self::VisualConsistency => "visual consistency",
            Self::ProfessionalStandard => "professional standard",
            Self::NarrativeAlignment => "narrative alignment",
        }
    }

    /// Targeted guidance appended to adaptive prompts.
    pub fn improvement_hint(&self) -> &'static str {
        match self {
            Self::NarrativeCoherence => {
                "Make every scene follow from the previous one and resolve dangling threads"
            }
            Self::CharacterDepth => {
                "Give each character a clear motivation, a distinct voice and a visible change"
            }
            Self::PlotComplexity => {
                "Add a meaningful complication and make the reader's choices carry consequences"
            }
            Self::ThematicConsistency => {
                "Keep the central theme present in imagery, dialogue and the ending"
            }
            Self::ImageQuality => "Use a clean composition with sharp focus and no artifacts",
            Self::VisualConsistency => {
                "Keep character appearance, palette and art style identical to earlier illustrations"
            }
            Self::ProfessionalStandard => "Aim for a polished, print-ready picture-book finish",
            Self::NarrativeAlignment => {
                "Depict exactly the moment, setting and characters described in the passage"
            }
        }
    }

    /// Dimensions in a category, in weight order.
    pub fn for_category(category: MetricCategory) -> &'static [Self] {
        match category {
            MetricCategory::Content => &CONTENT_DIMENSIONS,
            MetricCategory::Visual => &VISUAL_DIMENSIONS,
        }
    }

    /// All dimensions.
    pub fn all() -> Vec<Self> {
        CONTENT_DIMENSIONS
            .iter()
            .chain(VISUAL_DIMENSIONS.iter())
            .copied()
            .collect()
    }
}

impl std::fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
