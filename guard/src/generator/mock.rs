//! Mock generator for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::*;
use crate::content::ContentKind;

/// Mock generator for testing.
///
/// Scripted outcomes are consumed in order; once the script is empty every
/// call succeeds with `"<id> draft <n>"`.
pub struct MockGenerator {
    generator_id: String,
    kind: ContentKind,
    available: AtomicBool,
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    delay: Duration,
    probe_delay: Duration,
    call_count: AtomicU32,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    /// Create a new mock generator.
    pub fn new(generator_id: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            generator_id: generator_id.into(),
            kind,
            available: AtomicBool::new(true),
            script: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            probe_delay: Duration::ZERO,
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Text generator.
    pub fn text(generator_id: impl Into<String>) -> Self {
        Self::new(generator_id, ContentKind::Narrative)
    }

    /// Image generator.
    pub fn image(generator_id: impl Into<String>) -> Self {
        Self::new(generator_id, ContentKind::Illustration)
    }

    /// Script the next outcomes.
    pub fn with_script(mut self, outcomes: impl IntoIterator<Item = Result<String, GenerationError>>) -> Self {
        self.script.get_mut().extend(outcomes);
        self
    }

    /// Delay every generation call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay every availability probe.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Toggle availability at runtime.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queue another outcome.
    pub async fn push_outcome(&self, outcome: Result<String, GenerationError>) {
        self.script.lock().await.push_back(outcome);
    }

    /// Number of generate calls so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received, in order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn id(&self) -> &str {
        &self.generator_id
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }

    async fn is_available(&self) -> bool {
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        self.available.load(Ordering::SeqCst)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedContent, GenerationError> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().await.push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(GenerationError::Unavailable("Mock generator disabled".to_string()));
        }

        let scripted = self.script.lock().await.pop_front();
        match scripted {
            Some(Ok(content)) => Ok(GeneratedContent::new(content, &self.generator_id)),
            Some(Err(e)) => Err(e),
            None => Ok(GeneratedContent::new(
                format!("{} draft {}", self.generator_id, n),
                &self.generator_id,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator() {
        let generator = MockGenerator::text("mock-writer").with_script([
            Ok("first".to_string()),
            Err(GenerationError::NetworkError("reset".to_string())),
        ]);

        assert!(generator.is_available().await);
        assert_eq!(generator.kind(), ContentKind::Narrative);

        let request = GenerationRequest::new("k", ContentKind::Narrative, "prompt");
        assert_eq!(generator.generate(request.clone()).await.unwrap().content, "first");
        assert!(generator.generate(request.clone()).await.is_err());
        assert_eq!(generator.generate(request).await.unwrap().content, "mock-writer draft 3");
        assert_eq!(generator.call_count(), 3);
        assert_eq!(generator.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_unavailable() {
        let generator = MockGenerator::image("mock-painter").with_available(false);
        assert!(!generator.is_available().await);

        let result = generator
            .generate(GenerationRequest::new("k", ContentKind::Illustration, "p"))
            .await;
        assert!(matches!(result, Err(GenerationError::Unavailable(_))));
    }
}
