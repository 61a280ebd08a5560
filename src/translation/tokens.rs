/*!
 * Token cost estimation.
 *
 * The chunker and dispatcher only need a consistent upper-bound-ish guess
 * of how many tokens a piece of text costs, not the exact tokenizer count.
 */

use crate::subtitle_processor::SubtitleEntry;

/// Estimates the service token cost of text
pub trait TokenEstimator: Send + Sync {
    /// Estimated tokens of a piece of text
    fn estimate(&self, text: &str) -> u64;

    /// Estimated tokens of an entry as it is sent, id and timing line included
    fn estimate_entry(&self, entry: &SubtitleEntry) -> u64 {
        self.estimate(&entry.to_string())
    }
}

/// Roughly four characters per token
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> u64 {
        text.chars().count().div_ceil(4) as u64
    }
}
