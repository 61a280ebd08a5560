/*!
 * Speech-to-text over audio chunks.
 *
 * `ChunkTranscriber` runs the `Transcriber` collaborator over every chunk with
 * a bounded number of requests in flight. Results are slotted by chunk
 * position, never by completion order, and the first failure aborts the
 * remaining work.
 */

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::errors::{PipelineError, ProviderError};
use crate::language_utils::normalize_detected_language;
use crate::media::AudioChunk;
use crate::progress::{ProgressReporter, Stage};
use crate::providers::openai::OpenAI;
use crate::providers::{Segment, Transcriber, Transcript};
use crate::usage::UsageAccumulator;

/// Segments of one chunk in chunk-local time
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTranscript {
    pub chunk_index: usize,
    /// Normalized ISO 639-1 code, if the service reported a recognizable language
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

/// Whisper-style transcription over an OpenAI-compatible audio endpoint
#[derive(Debug)]
pub struct WhisperTranscriber {
    client: OpenAI,
    model: String,
    language_hint: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(client: OpenAI, model: impl Into<String>, language_hint: Option<String>) -> Self {
        Self {
            client,
            model: model.into(),
            language_hint,
        }
    }

    /// Build from the `transcription` section of the configuration
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.transcription;
        Self::new(
            OpenAI::new(settings.api_key.clone(), settings.endpoint.clone(), settings.timeout_secs),
            settings.model.clone(),
            config.source_language.clone(),
        )
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, ProviderError> {
        let response = self
            .client
            .transcribe(audio_path, &self.model, self.language_hint.as_deref())
            .await?;

        let language = normalize_detected_language(&response.language).unwrap_or_default();
        let usage = response.usage();
        let segments = response
            .segments
            .into_iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
                language: language.clone(),
            })
            .collect();

        Ok(Transcript {
            language: response.language,
            segments,
            usage,
        })
    }
}

/// Drives the speech-to-text collaborator over all audio chunks
#[derive(Debug, Clone)]
pub struct ChunkTranscriber {
    transcriber: Arc<dyn Transcriber>,
    workers: usize,
}

impl ChunkTranscriber {
    pub fn new(transcriber: Arc<dyn Transcriber>, workers: usize) -> Self {
        Self {
            transcriber,
            workers: workers.max(1),
        }
    }

    /// Transcribe one chunk into chunk-local segments
    pub async fn transcribe_chunk(
        &self,
        chunk: &AudioChunk,
        usage: &UsageAccumulator,
    ) -> Result<ChunkTranscript, PipelineError> {
        let failure = |message: String| PipelineError::TranscriptionFailure {
            chunk_index: chunk.index,
            message,
        };

        let metadata = tokio::fs::metadata(&chunk.path)
            .await
            .map_err(|e| failure(format!("cannot read {}: {}", chunk.path.display(), e)))?;
        if metadata.len() == 0 {
            return Err(failure(format!("{} is empty", chunk.path.display())));
        }

        let started = Instant::now();
        let transcript = self
            .transcriber
            .transcribe(&chunk.path)
            .await
            .map_err(|e| failure(e.to_string()))?;
        usage.record_transcription(transcript.usage, started.elapsed());

        let language = normalize_detected_language(&transcript.language);
        if language.is_none() && !transcript.language.trim().is_empty() {
            warn!("Chunk {}: unrecognized language '{}'", chunk.index, transcript.language);
        }

        let segments = clamp_segments(chunk, transcript.segments)?;
        debug!("Chunk {}: {} segment(s)", chunk.index, segments.len());

        Ok(ChunkTranscript {
            chunk_index: chunk.index,
            language,
            segments,
        })
    }

    /// Transcribe all chunks, results in the order of `chunks`
    pub async fn transcribe_all(
        &self,
        chunks: &[AudioChunk],
        usage: &UsageAccumulator,
        progress: &ProgressReporter,
    ) -> Result<Vec<ChunkTranscript>, PipelineError> {
        let total = chunks.len();
        info!("Transcribing {} chunk(s) with {} worker(s)", total, self.workers);

        let mut slots: Vec<Option<ChunkTranscript>> = vec![None; total];
        let mut pending = stream::iter(chunks.iter().enumerate())
            .map(|(position, chunk)| async move { (position, self.transcribe_chunk(chunk, usage).await) })
            .buffer_unordered(self.workers);

        let mut completed = 0;
        while let Some((position, result)) = pending.next().await {
            // Returning drops the stream, which cancels the requests still in flight
            slots[position] = Some(result?);
            completed += 1;
            progress
                .report(
                    Stage::Transcription,
                    completed as f64 / total as f64,
                    format!("Transcribed chunk {}/{}", completed, total),
                )
                .await;
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.ok_or_else(|| PipelineError::TranscriptionFailure {
                    chunk_index: position,
                    message: "no transcript was produced".to_string(),
                })
            })
            .collect()
    }
}

// Drop empty segments and pull times past the end of the chunk back to its duration.
// Segments with unusable times are rejected before any clamping.
fn clamp_segments(chunk: &AudioChunk, segments: Vec<Segment>) -> Result<Vec<Segment>, PipelineError> {
    let limit = chunk.duration_secs;
    segments
        .into_iter()
        .filter(|segment| !segment.text.trim().is_empty())
        .map(|mut segment| {
            if !segment.start.is_finite() || !segment.end.is_finite() || segment.end < segment.start {
                return Err(PipelineError::InvalidSegment {
                    chunk_index: chunk.index,
                    message: format!("segment times {} -> {} are unusable", segment.start, segment.end),
                });
            }
            if segment.end > limit {
                debug!("Chunk {}: clamping segment end {:.3} to {:.3}", chunk.index, segment.end, limit);
                segment.end = limit;
            }
            if segment.start > limit {
                segment.start = limit;
            }
            Ok(segment)
        })
        .collect()
}
