//! Content units submitted for validation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use storyforge_quality::{MetricCategory, MetricWeights};

use crate::config::RegenerationConfig;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// What a content unit holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Adventure text, scored on content metrics
    Narrative,
    /// An illustration reference, scored on visual metrics
    Illustration,
}

impl ContentKind {
    pub fn category(&self) -> MetricCategory {
        match self {
            Self::Narrative => MetricCategory::Content,
            Self::Illustration => MetricCategory::Visual,
        }
    }

    pub fn weights(&self) -> MetricWeights {
        MetricWeights::for_category(self.category())
    }

    /// Pass threshold that applies to this kind.
    pub fn threshold(&self, config: &RegenerationConfig) -> f64 {
        match self {
            Self::Narrative => config.quality_threshold,
            Self::Illustration => config.visual_quality_threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::Illustration => "illustration",
        }
    }
}

/// One piece of generated content and how to regenerate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Stable key (e.g. `story-42/page-3`); at most one session per key
    pub key: String,
    pub kind: ContentKind,
    /// Prompt the content was generated from
    pub prompt: String,
    /// Current draft (text, or an image URL for illustrations)
    pub content: String,
}

impl ContentUnit {
    pub fn narrative(
        key: impl Into<String>,
        prompt: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            kind: ContentKind::Narrative,
            prompt: prompt.into(),
            content: content.into(),
        }
    }

    pub fn illustration(
        key: impl Into<String>,
        prompt: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            kind: ContentKind::Illustration,
            prompt: prompt.into(),
            content: image_ref.into(),
        }
    }
}

/// Hex SHA-256 of a draft, recorded in the session log.
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
