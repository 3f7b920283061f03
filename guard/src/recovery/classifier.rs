//! Heuristic error classification.

use chrono::{DateTime, Utc};

use super::types::{ErrorContext, ErrorType, ProfessionalError, Severity};
use crate::generator::GenerationError;

const FATAL_MARKERS: &[&str] = &["fatal", "panic", "corrupt", "out of memory"];

const CONFIG_MARKERS: &[&str] = &[
    "config",
    "api key",
    "credential",
    "unauthorized",
    "forbidden",
    "missing env",
];

const PARTIAL_MARKERS: &[&str] = &["partial", "degraded", "incomplete", "content filtered"];

const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "rate limit",
    "network",
    "unavailable",
    "connection",
    "429",
    "503",
];

fn mentions(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| message.contains(m))
}

/// Maps raw failures to [`ProfessionalError`]s.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a failure message in context. First matching rule wins.
    pub fn classify(message: &str, context: &ErrorContext, now: DateTime<Utc>) -> ProfessionalError {
        let lower = message.to_lowercase();
        let feature_named = context.feature.is_some();
        let transient = mentions(&lower, TRANSIENT_MARKERS);
        let partial = mentions(&lower, PARTIAL_MARKERS);

        let (error_type, severity) = if context.critical || mentions(&lower, FATAL_MARKERS) {
            (ErrorType::SystemError, Severity::Critical)
        } else if mentions(&lower, CONFIG_MARKERS) {
            if feature_named {
                (ErrorType::ConfigurationError, Severity::High)
            } else {
                (ErrorType::ConfigurationError, Severity::Critical)
            }
        } else if feature_named {
            (ErrorType::FeatureFailure, Severity::High)
        } else if partial {
            (ErrorType::PartialFailure, Severity::Medium)
        } else if transient {
            (ErrorType::SystemError, Severity::Low)
        } else {
            (ErrorType::SystemError, Severity::Medium)
        };

        let recoverable = severity != Severity::Critical && (transient || partial || feature_named);
        let fallback_available = context.fallback_available.unwrap_or(feature_named);

        ProfessionalError {
            id: uuid::Uuid::new_v4().to_string(),
            error_type,
            severity,
            message: message.to_string(),
            feature: context.feature.clone(),
            operation: context.operation.clone(),
            recoverable,
            fallback_available,
            suggested_actions: Self::suggested_actions(error_type),
            occurred_at: now,
        }
    }

    /// Classify a generator failure. An enhancement named by the error fills
    /// in the context's feature when the context has none.
    pub fn classify_generation(
        error: &GenerationError,
        context: &ErrorContext,
        now: DateTime<Utc>,
    ) -> ProfessionalError {
        match (error.feature(), &context.feature) {
            (Some(feature), None) => {
                let context = context.clone().with_feature(feature);
                Self::classify(&error.to_string(), &context, now)
            }
            _ => Self::classify(&error.to_string(), context, now),
        }
    }

    /// Fixed guidance per error type.
    pub fn suggested_actions(error_type: ErrorType) -> Vec<String> {
        let actions: &[&str] = match error_type {
            ErrorType::ConfigurationError => &[
                "Check the generator endpoint and API key settings",
                "Verify required environment variables are set",
                "Contact support if the configuration looks correct",
            ],
            ErrorType::FeatureFailure => &[
                "Continue in standard mode without the enhancement",
                "Retry later once the feature recovers",
            ],
            ErrorType::PartialFailure => &[
                "Review the generated content for missing sections",
                "Regenerate the affected page if needed",
            ],
            ErrorType::SystemError => &[
                "Try again in a few moments",
                "Contact support if the problem persists",
            ],
        };
        actions.iter().map(|a| a.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::types::RecoveryStrategy;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_fatal_is_critical_abort() {
        let error = ErrorClassifier::classify("Fatal: model weights corrupt", &ErrorContext::new(), now());
        assert_eq!(error.error_type, ErrorType::SystemError);
        assert_eq!(error.severity, Severity::Critical);
        assert!(!error.recoverable);
        assert_eq!(error.strategy(), RecoveryStrategy::Abort);
    }

    #[test]
    fn test_critical_context_overrides_message() {
        let error = ErrorClassifier::classify("Network error: reset", &ErrorContext::new().critical(), now());
        assert_eq!(error.severity, Severity::Critical);
        assert_eq!(error.strategy(), RecoveryStrategy::Abort);
    }

    #[test]
    fn test_configuration_errors() {
        let global = ErrorClassifier::classify("Invalid configuration: missing API key", &ErrorContext::new(), now());
        assert_eq!(global.error_type, ErrorType::ConfigurationError);
        assert_eq!(global.severity, Severity::Critical);

        let scoped = ErrorClassifier::classify(
            "Unauthorized",
            &ErrorContext::for_feature("style_transfer"),
            now(),
        );
        assert_eq!(scoped.error_type, ErrorType::ConfigurationError);
        assert_eq!(scoped.severity, Severity::High);
        assert!(scoped.fallback_available);
        assert_eq!(scoped.strategy(), RecoveryStrategy::Fallback);
    }

    #[test]
    fn test_feature_failure_falls_back() {
        let err = GenerationError::EnhancementFailed {
            feature: "character_memory".to_string(),
            reason: "index missing".to_string(),
        };
        let error = ErrorClassifier::classify_generation(&err, &ErrorContext::new(), now());
        assert_eq!(error.error_type, ErrorType::FeatureFailure);
        assert_eq!(error.severity, Severity::High);
        assert_eq!(error.feature.as_deref(), Some("character_memory"));
        assert_eq!(error.strategy(), RecoveryStrategy::Fallback);
    }

    #[test]
    fn test_partial_failure() {
        let err = GenerationError::ContentFiltered {
            reason: "violence".to_string(),
        };
        let error = ErrorClassifier::classify_generation(&err, &ErrorContext::new(), now());
        assert_eq!(error.error_type, ErrorType::PartialFailure);
        assert_eq!(error.severity, Severity::Medium);
        assert!(error.recoverable);
        assert_eq!(error.strategy(), RecoveryStrategy::Partial);
    }

    #[test]
    fn test_transient_errors_retry() {
        for err in [
            GenerationError::RateLimited { retry_after_ms: Some(100) },
            GenerationError::Timeout { after_ms: 5000 },
            GenerationError::NetworkError("connection reset".to_string()),
            GenerationError::Unavailable("503".to_string()),
        ] {
            let error = ErrorClassifier::classify_generation(&err, &ErrorContext::new(), now());
            assert_eq!(error.severity, Severity::Low, "{}", err);
            assert!(error.recoverable);
            assert_eq!(error.strategy(), RecoveryStrategy::Retry);
        }
    }

    #[test]
    fn test_unknown_error_is_medium_retry() {
        let error = ErrorClassifier::classify("Parse error: unexpected token", &ErrorContext::new(), now());
        assert_eq!(error.error_type, ErrorType::SystemError);
        assert_eq!(error.severity, Severity::Medium);
        assert!(!error.recoverable);
        assert_eq!(error.strategy(), RecoveryStrategy::Retry);
    }

    #[test]
    fn test_fallback_override() {
        let error = ErrorClassifier::classify(
            "index missing",
            &ErrorContext::for_feature("character_memory").with_fallback(false),
            now(),
        );
        assert!(!error.fallback_available);
        assert_eq!(error.strategy(), RecoveryStrategy::Retry);
    }
}
