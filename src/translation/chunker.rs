/*!
 * Packing the subtitle timeline into translation requests.
 *
 * A greedy pass fills each chunk until the entry cap or the token budget
 * would be exceeded. When that yields more chunks than the call ceiling
 * allows, the document is sliced evenly instead. The even slices may go over
 * the token budget; the dispatcher still refuses any request that leaves no
 * room for a response.
 */

use log::{debug, warn};

use crate::app_config::ChunkingConfig;
use crate::errors::PipelineError;
use crate::subtitle_processor::{entries_to_srt, SubtitleEntry};

use super::tokens::TokenEstimator;

/// A batch of consecutive entries sent in one translation request
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationChunk {
    /// Position of the chunk, 0-based
    pub index: usize,
    pub entries: Vec<SubtitleEntry>,
    /// Prompt overhead plus the estimated cost of the entries
    pub estimated_tokens: u64,
}

impl TranslationChunk {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the entries to the SRT interchange format
    pub fn to_srt(&self) -> String {
        entries_to_srt(&self.entries)
    }
}

/// Caps applied when packing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkLimits {
    pub max_entries_per_chunk: usize,
    pub token_budget_per_chunk: u64,
    pub max_total_chunks: usize,
    pub prompt_overhead_tokens: u64,
    pub expansion_factor: f64,
}

impl ChunkLimits {
    /// Limits for a model context window; `prompt_overhead_tokens` is used when the config leaves it at 0
    pub fn from_config(chunking: &ChunkingConfig, context_window: u64, prompt_overhead_tokens: u64) -> Self {
        Self {
            max_entries_per_chunk: chunking.max_entries_per_chunk,
            token_budget_per_chunk: chunking.token_budget_per_chunk(context_window),
            max_total_chunks: chunking.max_api_calls,
            prompt_overhead_tokens: if chunking.prompt_overhead_tokens > 0 {
                chunking.prompt_overhead_tokens
            } else {
                prompt_overhead_tokens
            },
            expansion_factor: chunking.expansion_factor,
        }
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.max_entries_per_chunk == 0 {
            return Err(PipelineError::Configuration("max entries per chunk must be at least 1".to_string()));
        }
        if self.max_total_chunks == 0 {
            return Err(PipelineError::Configuration("max api calls must be at least 1".to_string()));
        }
        if self.token_budget_per_chunk == 0 {
            return Err(PipelineError::Configuration("token budget per chunk must be positive".to_string()));
        }
        if !self.expansion_factor.is_finite() || self.expansion_factor <= 0.0 {
            return Err(PipelineError::Configuration(format!(
                "expansion factor must be positive, got {}",
                self.expansion_factor
            )));
        }
        Ok(())
    }
}

/// Partitions a subtitle timeline into translation chunks
pub struct SubtitleChunker<'a> {
    limits: ChunkLimits,
    estimator: &'a dyn TokenEstimator,
}

impl<'a> SubtitleChunker<'a> {
    pub fn new(limits: ChunkLimits, estimator: &'a dyn TokenEstimator) -> Self {
        Self { limits, estimator }
    }

    /// Pack entries into ordered chunks that together contain every entry exactly once
    pub fn pack(&self, entries: &[SubtitleEntry]) -> Result<Vec<TranslationChunk>, PipelineError> {
        self.limits.validate()?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let costs: Vec<u64> = entries.iter().map(|e| self.estimator.estimate_entry(e)).collect();
        let chunks = self.greedy(entries, &costs);

        if chunks.len() <= self.limits.max_total_chunks {
            debug!("Packed {} entries into {} chunk(s)", entries.len(), chunks.len());
            return Ok(chunks);
        }

        warn!(
            "Greedy packing needs {} chunks but at most {} calls are allowed, slicing evenly",
            chunks.len(),
            self.limits.max_total_chunks
        );
        Ok(self.even_slices(entries, &costs))
    }

    fn greedy(&self, entries: &[SubtitleEntry], costs: &[u64]) -> Vec<TranslationChunk> {
        let overhead = self.limits.prompt_overhead_tokens;
        let mut chunks = Vec::new();
        let mut buffer: Vec<SubtitleEntry> = Vec::new();
        let mut running = overhead;

        for (entry, &raw) in entries.iter().zip(costs) {
            let expanded = (raw as f64 * self.limits.expansion_factor).ceil() as u64;
            let too_many = buffer.len() + 1 > self.limits.max_entries_per_chunk;
            let too_costly = running + raw + expanded > self.limits.token_budget_per_chunk;

            if (too_many || too_costly) && !buffer.is_empty() {
                chunks.push(TranslationChunk {
                    index: chunks.len(),
                    entries: std::mem::take(&mut buffer),
                    estimated_tokens: running,
                });
                running = overhead;
            }

            buffer.push(entry.clone());
            running += raw;
        }

        if !buffer.is_empty() {
            chunks.push(TranslationChunk {
                index: chunks.len(),
                entries: buffer,
                estimated_tokens: running,
            });
        }

        chunks
    }

    fn even_slices(&self, entries: &[SubtitleEntry], costs: &[u64]) -> Vec<TranslationChunk> {
        let size = entries.len().div_ceil(self.limits.max_total_chunks);

        entries
            .chunks(size)
            .zip(costs.chunks(size))
            .enumerate()
            .map(|(index, (slice, slice_costs))| TranslationChunk {
                index,
                entries: slice.to_vec(),
                estimated_tokens: self.limits.prompt_overhead_tokens + slice_costs.iter().sum::<u64>(),
            })
            .collect()
    }
}
