//! Content and image generator collaborators.
//!
//! Generation itself is opaque to the guard. This module only defines the
//! contract and ships two implementations:
//! - OpenAI-compatible HTTP API (text via chat completions, images via image generations)
//! - Scripted mock for tests

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockGenerator;
pub use openai::OpenAiGenerator;
pub use traits::{GeneratedContent, GenerationError, GenerationRequest, Generator};
