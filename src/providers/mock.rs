/*!
 * Mock collaborators for testing.
 *
 * This module provides in-process stand-ins for the speech-to-text and
 * translation services:
 * - `MockTranscriber` - returns scripted segments per audio file
 * - `MockTranslator` - echoes the SRT batch with a `[lang]` prefix, or misbehaves
 *   in one of the ways described by `MockBehavior`
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{ProviderUsage, Segment, Transcript, TranslationReply, TranslationRequest, Transcriber, Translator};
use crate::subtitle_processor::{entries_to_srt, parse_srt_string};

/// Behavior mode for the mock collaborators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with an error
    Failing,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
    /// Translator only: the reply is missing its last entry
    DropLastEntry,
    /// Translator only: every translated cue comes back empty
    EmptyText,
    /// Translator only: the reply numbers its cues from 1 and shifts their timing
    Renumbered,
}

/// Rough token count used for simulated usage
fn simulated_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(4) as u64
}

/// Mock speech-to-text service
///
/// Transcripts are scripted per audio file name; files without a script get
/// the default transcript.
#[derive(Debug)]
pub struct MockTranscriber {
    behavior: MockBehavior,
    scripted: HashMap<String, Transcript>,
    default_transcript: Transcript,
    failing_files: HashSet<String>,
    report_usage: bool,
    request_count: Arc<AtomicUsize>,
}

impl MockTranscriber {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            scripted: HashMap::new(),
            default_transcript: Transcript {
                language: "english".to_string(),
                segments: vec![Segment::new(0.0, 1.0, "Hello.")],
                usage: None,
            },
            failing_files: HashSet::new(),
            report_usage: false,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working transcriber
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a transcriber that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Script the transcript returned for an audio file name
    pub fn with_transcript(mut self, file_name: impl Into<String>, transcript: Transcript) -> Self {
        self.scripted.insert(file_name.into(), transcript);
        self
    }

    /// Transcript for files without a script
    pub fn with_default_transcript(mut self, transcript: Transcript) -> Self {
        self.default_transcript = transcript;
        self
    }

    /// Fail only for the given audio file name
    pub fn failing_on(mut self, file_name: impl Into<String>) -> Self {
        self.failing_files.insert(file_name.into());
        self
    }

    /// Report simulated token usage with each transcript
    pub fn with_usage(mut self) -> Self {
        self.report_usage = true;
        self
    }

    /// Number of transcription requests received
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Build a transcript of `count` evenly spaced segments across `duration_secs`
    pub fn evenly_spaced(count: usize, duration_secs: f64, language: &str, label: &str) -> Transcript {
        let slot = if count > 0 { duration_secs / count as f64 } else { duration_secs };
        let segments = (0..count)
            .map(|i| {
                let start = slot * i as f64;
                Segment::new(start, start + slot * 0.8, format!("{} line {}", label, i + 1))
            })
            .collect();

        Transcript {
            language: language.to_string(),
            segments,
            usage: None,
        }
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let file_name = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        match self.behavior {
            MockBehavior::Failing => {
                return Err(ProviderError::ConnectionError("mock transcriber is failing".to_string()));
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            _ => {}
        }

        if self.failing_files.contains(&file_name) {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("mock failure for {}", file_name),
            });
        }

        let mut transcript = self.scripted.get(&file_name).cloned().unwrap_or_else(|| self.default_transcript.clone());
        if self.report_usage {
            let text_tokens: u64 = transcript.segments.iter().map(|s| simulated_tokens(&s.text)).sum();
            transcript.usage = Some(ProviderUsage::new(0, text_tokens));
        }

        Ok(transcript)
    }
}

/// Mock translation service
#[derive(Debug)]
pub struct MockTranslator {
    behavior: MockBehavior,
    failing_languages: HashSet<String>,
    fail_on_call: Option<usize>,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<TranslationRequest>>>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            failing_languages: HashSet::new(),
            fail_on_call: None,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working translator
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a translator that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a translator whose replies miss an entry
    pub fn dropping_entries() -> Self {
        Self::new(MockBehavior::DropLastEntry)
    }

    /// Fail every request for a target language
    pub fn failing_for(mut self, language: impl Into<String>) -> Self {
        self.failing_languages.insert(language.into());
        self
    }

    /// Fail the n-th request (1-based)
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Number of translation requests received
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of all requests received so far
    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().clone()
    }

    fn render_reply(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let mut entries = parse_srt_string(&request.payload)
            .map_err(|e| ProviderError::InvalidInput(e.to_string()))?;

        for entry in entries.iter_mut() {
            entry.text = match self.behavior {
                MockBehavior::EmptyText => String::new(),
                _ => format!("[{}] {}", request.target_language, entry.text),
            };
        }

        if self.behavior == MockBehavior::DropLastEntry {
            entries.pop();
        }

        if self.behavior == MockBehavior::Renumbered {
            for (position, entry) in entries.iter_mut().enumerate() {
                entry.id = position + 1;
                entry.start_time_ms += 250;
                entry.end_time_ms += 250;
            }
        }

        // Empty cues are written by hand since SubtitleEntry's Display always emits a text line
        if self.behavior == MockBehavior::EmptyText {
            return Ok(entries
                .iter()
                .map(|e| format!("{}\n{} --> {}\n\n", e.id, e.format_start_time(), e.format_end_time()))
                .collect());
        }

        Ok(entries_to_srt(&entries))
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationReply, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Failing => {
                return Err(ProviderError::ConnectionError("mock translator is failing".to_string()));
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            _ => {}
        }

        if self.fail_on_call == Some(call) {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("mock failure on call {}", call),
            });
        }

        if self.failing_languages.contains(&request.target_language) {
            return Err(ProviderError::RateLimitExceeded(format!(
                "mock failure for {}",
                request.target_language
            )));
        }

        let text = self.render_reply(request)?;
        let prompt_tokens = simulated_tokens(&request.system_prompt) + simulated_tokens(&request.payload);
        let completion_tokens = simulated_tokens(&text);

        Ok(TranslationReply {
            text,
            usage: Some(ProviderUsage::new(prompt_tokens, completion_tokens)),
        })
    }
}
