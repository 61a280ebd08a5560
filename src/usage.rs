/*!
 * Run-wide usage accounting.
 *
 * Every transcription and translation call is folded into one
 * `UsageAccumulator` shared by all workers. Counters only ever grow.
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::providers::ProviderUsage;

/// Token and call counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStats {
    /// Total tokens billed
    pub tokens_used: u64,

    /// Prompt / input tokens
    pub input_tokens: u64,

    /// Completion / output tokens
    pub output_tokens: u64,

    /// Number of outbound service calls
    pub api_calls: u64,
}

impl UsageStats {
    /// Usage of a single call; calls without reported counters still count as a call
    pub fn from_call(usage: Option<ProviderUsage>) -> Self {
        let usage = usage.unwrap_or_default();
        let total = if usage.total_tokens > 0 {
            usage.total_tokens
        } else {
            usage.prompt_tokens + usage.completion_tokens
        };

        Self {
            tokens_used: total,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            api_calls: 1,
        }
    }

    /// Add another set of counters
    pub fn merge(&mut self, other: &UsageStats) {
        self.tokens_used += other.tokens_used;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.api_calls += other.api_calls;
    }
}

#[derive(Debug)]
struct UsageTotals {
    stats: UsageStats,
    transcription_calls: u64,
    translation_calls: u64,
    api_duration: Duration,
}

/// Shared, additive usage fold
///
/// Cloning is cheap and every clone updates the same totals.
#[derive(Debug, Clone)]
pub struct UsageAccumulator {
    totals: Arc<Mutex<UsageTotals>>,
    start_time: Instant,
}

impl Default for UsageAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self {
            totals: Arc::new(Mutex::new(UsageTotals {
                stats: UsageStats::default(),
                transcription_calls: 0,
                translation_calls: 0,
                api_duration: Duration::ZERO,
            })),
            start_time: Instant::now(),
        }
    }

    /// Record one speech-to-text call
    pub fn record_transcription(&self, usage: Option<ProviderUsage>, duration: Duration) {
        let call = UsageStats::from_call(usage);
        let mut totals = self.totals.lock();
        totals.stats.merge(&call);
        totals.transcription_calls += 1;
        totals.api_duration += duration;
    }

    /// Record one translation call
    pub fn record_translation(&self, usage: Option<ProviderUsage>, duration: Duration) {
        let call = UsageStats::from_call(usage);
        let mut totals = self.totals.lock();
        totals.stats.merge(&call);
        totals.translation_calls += 1;
        totals.api_duration += duration;
    }

    /// Current totals
    pub fn snapshot(&self) -> UsageStats {
        self.totals.lock().stats
    }

    /// Number of speech-to-text calls so far
    pub fn transcription_calls(&self) -> u64 {
        self.totals.lock().transcription_calls
    }

    /// Number of translation calls so far
    pub fn translation_calls(&self) -> u64 {
        self.totals.lock().translation_calls
    }

    /// Calculate tokens per minute over the time spent waiting on services
    pub fn tokens_per_minute(&self) -> f64 {
        let totals = self.totals.lock();
        let minutes = if totals.api_duration.as_secs_f64() > 0.0 {
            totals.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if minutes > 0.0 {
            totals.stats.tokens_used as f64 / minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of usage
    pub fn summary(&self, detected_language: &str) -> String {
        let tokens_per_minute = self.tokens_per_minute();
        let totals = self.totals.lock();

        format!(
            "Usage Summary:\n\
             Detected language: {}\n\
             API calls: {} ({} transcription, {} translation)\n\
             Input tokens: {}\n\
             Output tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            detected_language,
            totals.stats.api_calls,
            totals.transcription_calls,
            totals.translation_calls,
            totals.stats.input_tokens,
            totals.stats.output_tokens,
            totals.stats.tokens_used,
            self.start_time.elapsed().as_secs_f64() / 60.0,
            tokens_per_minute
        )
    }
}
