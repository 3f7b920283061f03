//! OpenAI-compatible generator.
//!
//! Text drafts go through `/chat/completions`, illustrations through
//! `/images/generations`. Works with any provider exposing those routes
//! (OpenAI, vLLM, Ollama, LocalAI, ...).

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::*;
use crate::content::ContentKind;

/// System prompt for narrative generation.
const STORY_SYSTEM_PROMPT: &str = "You are a children's adventure author. \
Write vivid, coherent, age-appropriate prose and follow any revision feedback exactly.";

/// OpenAI-compatible generator.
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    kind: ContentKind,
    image_size: String,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Create a new generator.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        kind: ContentKind,
    ) -> Result<Self, GenerationError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GenerationError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            kind,
            image_size: "1024x1024".to_string(),
            temperature: 0.8,
        })
    }

    /// Text generator against the OpenAI API.
    pub fn openai_text(model: &str, api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::new("https://api.openai.com/v1", model, Some(api_key.into()), ContentKind::Narrative)
    }

    /// Image generator against the OpenAI API.
    pub fn openai_image(model: &str, api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::new("https://api.openai.com/v1", model, Some(api_key.into()), ContentKind::Illustration)
    }

    /// Text generator against a local Ollama server.
    pub fn ollama(model: &str) -> Result<Self, GenerationError> {
        Self::new("http://localhost:11434/v1", model, None, ContentKind::Narrative)
    }

    /// Set the requested image size (e.g. `1792x1024`).
    pub fn with_image_size(mut self, size: impl Into<String>) -> Self {
        self.image_size = size.into();
        self
    }

    /// Set sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(header::AUTHORIZATION, format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn send<T: Serialize, R: DeserializeOwned>(
        &self,
        route: &str,
        body: &T,
    ) -> Result<R, GenerationError> {
        let response = self
            .authorize(self.client.post(self.url(route)))
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after_ms, body));
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))
    }

    async fn generate_text(&self, request: &GenerationRequest) -> Result<GeneratedContent, GenerationError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: STORY_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.full_prompt(),
                },
            ],
            temperature: self.temperature,
            stream: false,
        };

        let response: ChatResponse = self.send("chat/completions", &body).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::ParseError("No choices in response".to_string()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(GenerationError::ContentFiltered {
                reason: "provider safety filter".to_string(),
            });
        }

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::ParseError("Empty completion".to_string()));
        }

        Ok(GeneratedContent::new(content, &self.model))
    }

    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedContent, GenerationError> {
        let body = ImageRequest {
            model: self.model.clone(),
            prompt: request.full_prompt(),
            n: 1,
            size: self.image_size.clone(),
        };

        let response: ImageResponse = self.send("images/generations", &body).await?;
        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::ParseError("No images in response".to_string()))?;

        let content = match (image.url, image.b64_json) {
            (Some(url), _) => url,
            (None, Some(b64)) => format!("data:image/png;base64,{}", b64),
            (None, None) => {
                return Err(GenerationError::ParseError("Image has neither url nor data".to_string()))
            }
        };

        Ok(GeneratedContent {
            content,
            generator_id: self.model.clone(),
            revised_prompt: image.revised_prompt,
        })
    }
}

fn status_error(status: StatusCode, retry_after_ms: Option<u64>, body: String) -> GenerationError {
    match status.as_u16() {
        429 => GenerationError::RateLimited { retry_after_ms },
        401 | 403 => GenerationError::Configuration(format!(
            "unauthorized (HTTP {}), check the API key",
            status.as_u16()
        )),
        500..=599 => GenerationError::Unavailable(format!("HTTP {}: {}", status, body)),
        _ => GenerationError::RequestFailed(format!("HTTP {}: {}", status, body)),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
    revised_prompt: Option<String>,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn id(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }

    async fn is_available(&self) -> bool {
        self.authorize(self.client.get(self.url("models")))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedContent, GenerationError> {
        match self.kind {
            ContentKind::Narrative => self.generate_text(&request).await,
            ContentKind::Illustration => self.generate_image(&request).await,
        }
    }
}
