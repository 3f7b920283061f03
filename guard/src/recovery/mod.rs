//! Error classification and recovery.
//!
//! Raw failures are normalized into [`ProfessionalError`]s by the
//! [`ErrorClassifier`], mapped to a [`RecoveryStrategy`], and turned into
//! [`UserNotification`]s by the [`ErrorHandler`].

pub mod classifier;
pub mod handler;
pub mod notification;
pub mod types;

pub use classifier::ErrorClassifier;
pub use handler::{ErrorHandler, ErrorHandlingResult, PipelineResult, RecoveryOutcome, SYSTEM_SESSION};
pub use notification::{NotificationAction, NotificationLevel, UserNotification};
pub use types::{ErrorContext, ErrorType, ProfessionalError, RecoveryStrategy, Severity};
