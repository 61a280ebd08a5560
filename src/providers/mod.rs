/*!
 * External collaborators used by the pipeline.
 *
 * Speech-to-text and translation services sit behind the `Transcriber` and
 * `Translator` traits so the pipeline can run against real HTTP clients or
 * the mocks in `providers::mock`:
 * - `openai`: OpenAI-compatible audio transcription and chat completions
 * - `anthropic`: Anthropic messages API
 * - `mock`: deterministic in-process collaborators for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

use crate::errors::ProviderError;

/// Timestamped unit of transcribed text, local to one audio chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start in seconds from the beginning of the chunk
    pub start: f64,
    /// End in seconds from the beginning of the chunk
    pub end: f64,
    /// Transcribed text
    pub text: String,
    /// ISO 639-1 code, or empty when unknown
    pub language: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            language: String::new(),
        }
    }
}

/// Token counters reported by a service call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl ProviderUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Result of transcribing one audio chunk
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// Detected spoken language as reported by the service (code or name), may be empty
    pub language: String,
    /// Segments in chunk-local time
    pub segments: Vec<Segment>,
    /// Token usage when the service reports it
    pub usage: Option<ProviderUsage>,
}

/// Speech-to-text collaborator
#[async_trait]
pub trait Transcriber: Send + Sync + Debug {
    /// Transcribe one audio file into chunk-local segments
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, ProviderError>;
}

/// One translation call: a serialized SRT batch and the response budget
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub source_language: String,
    pub target_language: String,
    pub model: String,
    pub system_prompt: String,
    /// SRT interchange text of the batch
    pub payload: String,
    /// Upper bound for the reply, in tokens
    pub max_response_tokens: u64,
}

/// Reply of a translation call
#[derive(Debug, Clone)]
pub struct TranslationReply {
    pub text: String,
    pub usage: Option<ProviderUsage>,
}

/// Text translation collaborator
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate a serialized batch of subtitle entries
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationReply, ProviderError>;
}

pub mod anthropic;
pub mod mock;
pub mod openai;
