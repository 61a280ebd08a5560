/*!
 * Translation dispatch over (chunk, language) pairs.
 *
 * Every pair is an independent request. Requests run with bounded
 * concurrency, their results are keyed by `(chunk_index, language)` and
 * reassembled per language in chunk order. A failed pair fails its language
 * only; the other languages still complete.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::PipelineError;
use crate::progress::{ProgressReporter, Stage};
use crate::providers::{TranslationRequest, Translator};
use crate::subtitle_processor::{parse_srt_reply, SubtitleDocument, SubtitleEntry};
use crate::usage::UsageAccumulator;

use super::chunker::TranslationChunk;
use super::prompts::{prompt_token_cost, render_system_prompt};
use super::tokens::TokenEstimator;

/// Request settings shared by every pair
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub model: String,
    pub context_window: u64,
    pub safety_margin_tokens: u64,
    /// Template with `{source_language}` / `{target_language}` placeholders
    pub system_prompt: String,
    pub concurrent_requests: usize,
}

/// Result of translating the whole document into one language
#[derive(Debug, Clone)]
pub struct LanguageOutcome {
    pub language: String,
    /// Present only when every chunk succeeded
    pub document: Option<SubtitleDocument>,
    /// Pair-scoped errors, in chunk order
    pub failures: Vec<PipelineError>,
    pub total_chunks: usize,
}

impl LanguageOutcome {
    pub fn is_complete(&self) -> bool {
        self.document.is_some()
    }

    /// The language-level error for an incomplete outcome
    pub fn partial_failure(&self) -> Option<PipelineError> {
        if self.is_complete() {
            return None;
        }
        Some(PipelineError::PartialLanguageFailure {
            language: self.language.clone(),
            failed_chunks: self.failures.len(),
            total_chunks: self.total_chunks,
        })
    }
}

// Positions where the reply does not echo the id that was sent
fn mismatched_ids(sent: &[SubtitleEntry], received: &[SubtitleEntry]) -> usize {
    sent.iter().zip(received).filter(|(sent, received)| sent.id != received.id).count()
}

/// Sends translation chunks to the `Translator` collaborator
pub struct TranslationDispatcher {
    translator: Arc<dyn Translator>,
    estimator: Arc<dyn TokenEstimator>,
    settings: DispatchSettings,
}

impl TranslationDispatcher {
    pub fn new(translator: Arc<dyn Translator>, estimator: Arc<dyn TokenEstimator>, settings: DispatchSettings) -> Self {
        Self {
            translator,
            estimator,
            settings,
        }
    }

    /// Translate one chunk into one language
    ///
    /// Ids and timing come from the sent entries, only the text is replaced.
    pub async fn translate_chunk(
        &self,
        chunk: &TranslationChunk,
        source_language: &str,
        target_language: &str,
        usage: &UsageAccumulator,
    ) -> Result<Vec<SubtitleEntry>, PipelineError> {
        let system_prompt = render_system_prompt(&self.settings.system_prompt, source_language, target_language);
        let prompt_tokens = prompt_token_cost(&system_prompt, &chunk.entries, self.estimator.as_ref());

        let room = self.settings.context_window as i64 - prompt_tokens as i64 - self.settings.safety_margin_tokens as i64;
        if room <= 0 {
            return Err(PipelineError::ChunkTooLarge {
                chunk_index: chunk.index,
                language: target_language.to_string(),
                prompt_tokens,
            });
        }

        let request = TranslationRequest {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            model: self.settings.model.clone(),
            system_prompt,
            payload: chunk.to_srt(),
            max_response_tokens: room as u64,
        };

        let started = Instant::now();
        let reply = self.translator.translate(&request).await.map_err(|e| PipelineError::TranslationFailure {
            chunk_index: chunk.index,
            language: target_language.to_string(),
            message: e.to_string(),
        })?;
        usage.record_translation(reply.usage, started.elapsed());

        let received = parse_srt_reply(&reply.text).unwrap_or_default();
        if received.len() != chunk.len() {
            return Err(PipelineError::TranslationFormatError {
                chunk_index: chunk.index,
                language: target_language.to_string(),
                expected: chunk.len(),
                actual: received.len(),
            });
        }

        let renumbered = mismatched_ids(&chunk.entries, &received);
        if renumbered > 0 {
            warn!(
                "Chunk {} ({}): {} cue(s) came back with a different number, matching them by position",
                chunk.index, target_language, renumbered
            );
        }

        let entries = chunk
            .entries
            .iter()
            .zip(received)
            .map(|(sent, translated)| {
                let text = translated.text.trim();
                let text = if text.is_empty() {
                    warn!(
                        "Empty {} translation for entry {}, keeping the source text",
                        target_language, sent.id
                    );
                    sent.text.clone()
                } else {
                    text.to_string()
                };
                SubtitleEntry::new(sent.id, sent.start_time_ms, sent.end_time_ms, text)
            })
            .collect();

        Ok(entries)
    }

    /// Translate every chunk into every target language
    ///
    /// Returns one outcome per distinct target language, in the order given.
    pub async fn dispatch(
        &self,
        chunks: &[TranslationChunk],
        source_language: &str,
        target_languages: &[String],
        usage: &UsageAccumulator,
        progress: &ProgressReporter,
    ) -> Vec<LanguageOutcome> {
        let mut languages: Vec<&str> = Vec::new();
        for language in target_languages {
            if languages.contains(&language.as_str()) {
                warn!("Target language {} is listed more than once, translating it once", language);
            } else {
                languages.push(language.as_str());
            }
        }

        let pairs: Vec<(&TranslationChunk, &str)> = languages
            .iter()
            .flat_map(|language| chunks.iter().map(move |chunk| (chunk, *language)))
            .collect();
        let total = pairs.len();
        let workers = self.settings.concurrent_requests.max(1);
        info!(
            "Dispatching {} translation request(s) ({} chunk(s) x {} language(s)) with {} worker(s)",
            total,
            chunks.len(),
            languages.len(),
            workers
        );

        let mut results: HashMap<(usize, String), Result<Vec<SubtitleEntry>, PipelineError>> = HashMap::new();
        let mut pending = stream::iter(pairs)
            .map(|(chunk, language)| async move {
                let result = self.translate_chunk(chunk, source_language, language, usage).await;
                (chunk.index, language, result)
            })
            .buffer_unordered(workers);

        let mut completed = 0;
        while let Some((chunk_index, language, result)) = pending.next().await {
            completed += 1;
            match &result {
                Ok(entries) => debug!("Chunk {} ({}) translated, {} entries", chunk_index, language, entries.len()),
                Err(e) => error!("{}", e),
            }
            results.insert((chunk_index, language.to_string()), result);
            progress
                .report(
                    Stage::Translation,
                    completed as f64 / total as f64,
                    format!("Translated {}/{} requests", completed, total),
                )
                .await;
        }

        languages
            .iter()
            .map(|language| Self::assemble(chunks, language, &mut results))
            .collect()
    }

    fn assemble(
        chunks: &[TranslationChunk],
        language: &str,
        results: &mut HashMap<(usize, String), Result<Vec<SubtitleEntry>, PipelineError>>,
    ) -> LanguageOutcome {
        let mut entries = Vec::new();
        let mut failures = Vec::new();

        for chunk in chunks {
            match results.remove(&(chunk.index, language.to_string())) {
                Some(Ok(translated)) => entries.extend(translated),
                Some(Err(e)) => failures.push(e),
                None => failures.push(PipelineError::TranslationFailure {
                    chunk_index: chunk.index,
                    language: language.to_string(),
                    message: "no result was produced".to_string(),
                }),
            }
        }

        let document = failures.is_empty().then(|| SubtitleDocument::new(entries, language));
        LanguageOutcome {
            language: language.to_string(),
            document,
            failures,
            total_chunks: chunks.len(),
        }
    }
}
