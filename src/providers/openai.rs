use std::path::Path;
use std::time::Duration;
use serde::{Serialize, Deserialize};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use log::{error, debug};

use crate::errors::ProviderError;
use super::ProviderUsage;

/// Client for OpenAI-compatible APIs (OpenAI, LM Studio, self-hosted Whisper servers)
#[derive(Debug, Clone)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication, may be empty for local servers
    api_key: String,
    /// Base URL including the version prefix, e.g. https://api.openai.com/v1
    endpoint: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information of a chat completion
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// One segment of a `verbose_json` transcription
#[derive(Debug, Deserialize)]
pub struct TranscriptionSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Token usage reported by token-billed transcription models
#[derive(Debug, Deserialize)]
pub struct TranscriptionUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// `verbose_json` transcription response
#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    /// Detected language, usually an English name such as "english"
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
    #[serde(default)]
    pub usage: Option<TranscriptionUsage>,
}

impl OpenAIRequest {
    /// Create a new chat completion request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the response token cap
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAIResponse {
    pub fn usage(&self) -> Option<ProviderUsage> {
        self.usage.as_ref().map(|u| ProviderUsage {
            prompt_tokens: u.prompt_tokens as u64,
            completion_tokens: u.completion_tokens as u64,
            total_tokens: u.total_tokens as u64,
        })
    }
}

impl TranscriptionResponse {
    pub fn usage(&self) -> Option<ProviderUsage> {
        self.usage.as_ref().map(|u| ProviderUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: if u.total_tokens > 0 { u.total_tokens } else { u.input_tokens + u.output_tokens },
        })
    }
}

impl OpenAI {
    /// Create a new client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let base = if self.endpoint.is_empty() {
            "https://api.openai.com/v1"
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/{}", base, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    async fn check_status(response: reqwest::Response, api: &str) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("{} API error ({}): {}", api, status, error_text);
        Err(ProviderError::from_status(status.as_u16(), error_text))
    }

    /// Complete a chat request
    pub async fn complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let response = self.authorize(self.client.post(self.url("chat/completions")))
            .json(&request)
            .send()
            .await?;

        let response = Self::check_status(response, "Chat completions").await?;
        response.json::<OpenAIResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("chat completion response: {}", e)))
    }

    /// Transcribe one audio file with segment-level timestamps
    pub async fn transcribe(
        &self,
        audio_path: &Path,
        model: &str,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResponse, ProviderError> {
        let bytes = tokio::fs::read(audio_path).await
            .map_err(|e| ProviderError::InvalidInput(format!("cannot read {}: {}", audio_path.display(), e)))?;

        let file_name = audio_path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "chunk.mp3".to_string());

        debug!("Uploading {} ({} bytes) for transcription", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        if let Some(language) = language_hint {
            form = form.text("language", language.to_string());
        }

        let response = self.authorize(self.client.post(self.url("audio/transcriptions")))
            .multipart(form)
            .send()
            .await?;

        let response = Self::check_status(response, "Transcription").await?;
        response.json::<TranscriptionResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("transcription response: {}", e)))
    }

    /// Extract text from a chat completion response
    pub fn extract_text(response: &OpenAIResponse) -> Option<String> {
        response.choices.first().map(|choice| choice.message.content.clone())
    }
}
