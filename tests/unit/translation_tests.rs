/*!
 * Tests for translation chunking and dispatch through the public API
 */

use std::sync::Arc;

use subweave::app_config::ChunkingConfig;
use subweave::errors::PipelineError;
use subweave::progress::ProgressReporter;
use subweave::providers::mock::MockTranslator;
use subweave::subtitle_processor::SubtitleEntry;
use subweave::translation::{
    ChunkLimits, DispatchSettings, HeuristicEstimator, SubtitleChunker, TokenEstimator, TranslationDispatcher,
};
use subweave::usage::UsageAccumulator;

/// Every entry costs the same, whatever its text
struct FlatEstimator(u64);

impl TokenEstimator for FlatEstimator {
    fn estimate(&self, _text: &str) -> u64 {
        self.0
    }
}

fn entries(count: usize) -> Vec<SubtitleEntry> {
    (0..count)
        .map(|i| {
            let start = i as u64 * 2000;
            SubtitleEntry::new(i + 1, start, start + 1500, format!("Line number {}", i + 1))
        })
        .collect()
}

#[test]
fn test_chunker_with_custom_estimator_should_respect_token_budget() {
    let limits = ChunkLimits {
        max_entries_per_chunk: 100,
        token_budget_per_chunk: 100,
        max_total_chunks: 25,
        prompt_overhead_tokens: 10,
        expansion_factor: 2.0,
    };
    let estimator = FlatEstimator(10);

    let chunks = SubtitleChunker::new(limits, &estimator).pack(&entries(12)).unwrap();

    // overhead 10 + n*10 + 20 for the next entry stays within 100 up to 7 entries
    let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
    assert_eq!(sizes, vec![7, 5]);
    assert_eq!(chunks[0].estimated_tokens, 80);
    assert_eq!(chunks[1].index, 1);
    assert_eq!(chunks[1].entries[0].id, 8);
}

#[test]
fn test_chunker_from_default_config_should_cap_entries() {
    let limits = ChunkLimits::from_config(&ChunkingConfig::default(), 128_000, 50);
    let chunks = SubtitleChunker::new(limits, &HeuristicEstimator).pack(&entries(31)).unwrap();

    let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
    assert_eq!(sizes, vec![15, 15, 1]);
    let ids: Vec<usize> = chunks.iter().flat_map(|c| c.entries.iter().map(|e| e.id)).collect();
    assert_eq!(ids, (1..=31).collect::<Vec<_>>());
}

#[test]
fn test_chunker_with_zero_budget_should_be_a_configuration_error() {
    let mut chunking = ChunkingConfig::default();
    chunking.safety_margin_tokens = 10_000;
    let limits = ChunkLimits::from_config(&chunking, 8192, 0);

    let result = SubtitleChunker::new(limits, &HeuristicEstimator).pack(&entries(3));

    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}

#[tokio::test]
async fn test_dispatcher_should_rebuild_documents_in_chunk_order() {
    let limits = ChunkLimits::from_config(&ChunkingConfig::default(), 128_000, 50);
    let chunks = SubtitleChunker::new(limits, &HeuristicEstimator).pack(&entries(40)).unwrap();
    let translator = Arc::new(MockTranslator::working());
    let dispatcher = TranslationDispatcher::new(
        translator.clone(),
        Arc::new(HeuristicEstimator),
        DispatchSettings {
            model: "mock".to_string(),
            context_window: 128_000,
            safety_margin_tokens: 1000,
            system_prompt: "Translate from {source_language} to {target_language}.".to_string(),
            concurrent_requests: 8,
        },
    );
    let usage = UsageAccumulator::new();

    let outcomes = dispatcher
        .dispatch(
            &chunks,
            "en",
            &["ja".to_string(), "de".to_string()],
            &usage,
            &ProgressReporter::disabled(),
        )
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].language, "ja");
    assert_eq!(outcomes[1].language, "de");
    for outcome in &outcomes {
        assert!(outcome.is_complete());
        let document = outcome.document.as_ref().unwrap();
        assert_eq!(document.len(), 40);
        assert!(document.verify_ordering().is_ok());
        assert!(document.entries[39].text.starts_with(&format!("[{}] ", outcome.language)));
        assert_eq!(document.entries[39].start_time_ms, 78_000);
    }

    assert_eq!(translator.request_count(), 2 * chunks.len());
    assert_eq!(usage.translation_calls(), 2 * chunks.len() as u64);

    let requests = translator.requests();
    assert!(requests.iter().any(|r| r.system_prompt.contains("Japanese (ja)")));
    assert!(requests.iter().all(|r| r.system_prompt.contains("English (en)")));
}
