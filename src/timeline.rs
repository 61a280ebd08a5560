/*!
 * Timeline reconciliation.
 *
 * Each chunk is transcribed in its own local time. Shifting every chunk by
 * the summed duration of the chunks before it puts all segments on one global
 * timeline, which is then stable-sorted and renumbered.
 */

use log::debug;

use crate::errors::PipelineError;
use crate::media::AudioChunk;
use crate::subtitle_processor::{SubtitleDocument, SubtitleEntry};
use crate::transcription::ChunkTranscript;

/// `offsets[i]` is the sum of `durations[0..i]`
pub fn compute_offsets(durations: &[f64]) -> Vec<f64> {
    durations
        .iter()
        .scan(0.0, |running, duration| {
            let offset = *running;
            *running += duration;
            Some(offset)
        })
        .collect()
}

/// Offsets of probed audio chunks, in chunk order
pub fn chunk_offsets(chunks: &[AudioChunk]) -> Vec<f64> {
    let durations: Vec<f64> = chunks.iter().map(|chunk| chunk.duration_secs).collect();
    compute_offsets(&durations)
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

/// Merge per-chunk transcripts into one ordered document
pub fn reconcile(
    per_chunk: &[ChunkTranscript],
    offsets: &[f64],
    fallback_language: &str,
) -> Result<SubtitleDocument, PipelineError> {
    let mut entries = Vec::new();

    for chunk in per_chunk {
        let invalid = |message: String| PipelineError::InvalidSegment {
            chunk_index: chunk.chunk_index,
            message,
        };

        let offset = *offsets
            .get(chunk.chunk_index)
            .ok_or_else(|| invalid(format!("no offset for chunk {}", chunk.chunk_index)))?;

        if chunk.segments.is_empty() {
            return Err(PipelineError::EmptyTranscription {
                chunk_index: chunk.chunk_index,
            });
        }

        for segment in &chunk.segments {
            if !segment.start.is_finite() || !segment.end.is_finite() || segment.start < 0.0 {
                return Err(invalid(format!("unusable times {} -> {}", segment.start, segment.end)));
            }
            if segment.end < segment.start {
                return Err(invalid(format!(
                    "segment ends before it starts ({} -> {})",
                    segment.start, segment.end
                )));
            }

            let start_ms = seconds_to_ms(segment.start + offset);
            let mut end_ms = seconds_to_ms(segment.end + offset);
            if end_ms <= start_ms {
                end_ms = start_ms + 1;
            }

            entries.push(SubtitleEntry::new(0, start_ms, end_ms, segment.text.trim().to_string()));
        }
    }

    let detected_language = per_chunk
        .iter()
        .filter(|chunk| chunk.language.is_some())
        .min_by_key(|chunk| chunk.chunk_index)
        .and_then(|chunk| chunk.language.clone())
        .unwrap_or_else(|| fallback_language.to_string());

    let mut document = SubtitleDocument::new(entries, detected_language);
    document.sort_and_renumber();
    debug!(
        "Reconciled {} chunk(s) into {} entries ({})",
        per_chunk.len(),
        document.len(),
        document.detected_language
    );

    Ok(document)
}
