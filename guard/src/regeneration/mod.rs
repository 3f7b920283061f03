//! Quality-gated regeneration sessions.

pub mod controller;
pub mod feedback;
pub mod registry;
pub mod session;

pub use controller::{RegenerationController, SessionServices};
pub use feedback::build_feedback;
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{
    AttemptOutcome, RegenerationAttempt, RegenerationSession, SessionState, StopReason, TriggerReason,
    ValidationOutcome, BELOW_THRESHOLD_SCORE, NEEDS_IMPROVEMENT_SCORE,
};
