//! StoryForge Guard - Quality-Gated Story Generation
//!
//! Provides the runtime around generated story content:
//! - Bounded regeneration of drafts that miss the quality threshold
//! - Single-flight sessions per content unit
//! - Feature discovery and health checks for optional capabilities
//! - Error classification, recovery and user notifications
//! - Usage, performance and satisfaction analytics with alerts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          QualityGuardService            │
//! │    (Main entry point for callers)       │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌─────────────┐       ┌─────────────┐
//! │Regeneration │──────▶│ Generator / │
//! │ Controller  │       │ Oracle      │
//! └──────┬──────┘       └─────────────┘
//!        │
//!   ┌────┴─────────┬──────────────┐
//!   ▼              ▼              ▼
//! ┌────────┐  ┌──────────┐  ┌───────────┐
//! │Feature │  │  Error   │  │ Analytics │
//! │Monitor │  │ Handler  │  │ Recorder  │
//! └────────┘  └──────────┘  └───────────┘
//! ```
//!
//! Scoring itself lives in `storyforge-quality`.

pub mod analytics;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod health;
pub mod notify;
pub mod oracle;
pub mod recovery;
pub mod regeneration;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnalyticsConfig, ErrorConfig, GuardConfig, HealthConfig, RegenerationConfig, SessionConfig};
pub use content::{ContentKind, ContentUnit};
pub use error::{GuardError, Result};
pub use generator::{GeneratedContent, GenerationError, GenerationRequest, Generator};
pub use oracle::QualityOracle;
pub use recovery::{ErrorContext, ErrorHandlingResult, ProfessionalError, RecoveryStrategy, Severity};
pub use regeneration::{SessionState, StopReason, ValidationOutcome};
pub use service::{QualityGuardBuilder, QualityGuardService};
