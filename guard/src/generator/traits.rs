//! Core trait for generators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::ContentKind;

/// Error types for generation calls.
///
/// Display strings are read by the error classifier, so they name the
/// condition plainly (timeout, rate limit, configuration, ...).
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Generator is not reachable or not serving
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    /// Request rejected for another reason
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Rate limited by the provider
    #[error("Rate limited{}", retry_hint(.retry_after_ms))]
    RateLimited { retry_after_ms: Option<u64> },

    /// Output withheld by the provider's safety filter
    #[error("Content filtered: {reason}")]
    ContentFiltered { reason: String },

    /// Transport error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Credentials or endpoint misconfigured
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An optional enhancement failed while the base generation could proceed
    #[error("Enhancement {feature} failed: {reason}")]
    EnhancementFailed { feature: String, reason: String },

    /// Abandoned because the session budget ran out
    #[error("Generation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

impl GenerationError {
    /// Enhancement the failure is attributed to, if any.
    pub fn feature(&self) -> Option<&str> {
        match self {
            Self::EnhancementFailed { feature, .. } => Some(feature),
            _ => None,
        }
    }
}

/// Core trait for content and image generators.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Identifier (model or service name).
    fn id(&self) -> &str;

    /// What this generator produces.
    fn kind(&self) -> ContentKind;

    /// Check if the generator is currently serving.
    async fn is_available(&self) -> bool;

    /// Produce a new draft.
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedContent, GenerationError>;
}

/// Request for a (re)generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Content unit being regenerated
    pub content_key: String,
    pub kind: ContentKind,
    /// Original prompt
    pub prompt: String,
    /// Accumulated quality feedback, oldest first
    pub feedback: Vec<String>,
    /// Enhancements usable for this call
    pub enhancements: Vec<String>,
    /// Attempt number this generation will become
    pub attempt: u32,
}

impl GenerationRequest {
    pub fn new(content_key: impl Into<String>, kind: ContentKind, prompt: impl Into<String>) -> Self {
        Self {
            content_key: content_key.into(),
            kind,
            prompt: prompt.into(),
            feedback: Vec::new(),
            enhancements: Vec::new(),
            attempt: 1,
        }
    }

    pub fn with_feedback(mut self, feedback: Vec<String>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_enhancements(mut self, enhancements: Vec<String>) -> Self {
        self.enhancements = enhancements;
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Prompt text sent to the provider: original prompt followed by the
    /// feedback section.
    pub fn full_prompt(&self) -> String {
        let mut prompt = self.prompt.clone();

        if !self.feedback.is_empty() {
            prompt.push_str("\n\nRevise the previous attempt. Quality feedback:\n");
            for line in &self.feedback {
                prompt.push_str("- ");
                prompt.push_str(line);
                prompt.push('\n');
            }
        }

        if !self.enhancements.is_empty() {
            prompt.push_str(&format!("\nEnabled enhancements: {}\n", self.enhancements.join(", ")));
        }

        prompt
    }
}

/// A generated draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Text, or image URL / data URI
    pub content: String,
    /// Generator that produced it
    pub generator_id: String,
    /// Prompt as rewritten by the provider, if reported
    pub revised_prompt: Option<String>,
}

impl GeneratedContent {
    pub fn new(content: impl Into<String>, generator_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            generator_id: generator_id.into(),
            revised_prompt: None,
        }
    }
}

fn retry_hint(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {}ms", ms),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_prompt_includes_feedback() {
        let request = GenerationRequest::new("story-1/page-1", ContentKind::Narrative, "A dragon guards a library.")
            .with_feedback(vec![
                "Raise character depth from 5.8 to at least 7.0 (+1.2)".to_string(),
            ])
            .with_enhancements(vec!["character_memory".to_string()]);

        let prompt = request.full_prompt();
        assert!(prompt.starts_with("A dragon guards a library."));
        assert!(prompt.contains("- Raise character depth from 5.8 to at least 7.0 (+1.2)"));
        assert!(prompt.contains("Enabled enhancements: character_memory"));
    }

    #[test]
    fn test_plain_prompt_unchanged() {
        let request = GenerationRequest::new("k", ContentKind::Illustration, "A lighthouse at dusk");
        assert_eq!(request.full_prompt(), "A lighthouse at dusk");
    }

    #[test]
    fn test_error_feature() {
        let err = GenerationError::EnhancementFailed {
            feature: "style_transfer".to_string(),
            reason: "model missing".to_string(),
        };
        assert_eq!(err.feature(), Some("style_transfer"));
        assert_eq!(GenerationError::Timeout { after_ms: 5 }.feature(), None);
    }

    #[test]
    fn test_rate_limit_message() {
        let limited = GenerationError::RateLimited {
            retry_after_ms: Some(2000),
        };
        assert_eq!(limited.to_string(), "Rate limited, retry after 2000ms");
        assert_eq!(
            GenerationError::RateLimited { retry_after_ms: None }.to_string(),
            "Rate limited"
        );
    }
}
