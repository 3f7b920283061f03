//! Error types for the guard crate.

use crate::generator::GenerationError;
use crate::store::StoreError;

/// Errors surfaced to callers of the guard services.
///
/// Failures of external generators inside a regeneration session are not
/// returned here; they are classified and recorded in the session log.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Generator error outside a session
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Scoring input error
    #[error("Quality error: {0}")]
    Quality(#[from] storyforge_quality::QualityError),

    /// History store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Startup contract violated
    #[error("Startup failed: {0}")]
    StartupFailed(String),

    /// Too many sessions in flight
    #[error("Too many active sessions ({active}/{limit})")]
    Overloaded { active: usize, limit: usize },

    /// A session ended without publishing a result
    #[error("Session {0} ended without a result")]
    SessionLost(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
