/*!
 * Subtitle translation.
 *
 * This module turns the merged subtitle timeline into per-language
 * documents. It is split into several submodules:
 *
 * - `tokens`: Token cost estimation
 * - `chunker`: Packing entries into request-sized chunks
 * - `prompts`: System prompt rendering and prompt cost
 * - `core`: The production `Translator` over OpenAI, LM Studio and Anthropic
 * - `dispatcher`: Bounded-concurrency dispatch over (chunk, language) pairs
 */

// Re-export main types for easier usage
pub use self::chunker::{ChunkLimits, SubtitleChunker, TranslationChunk};
pub use self::core::TranslationService;
pub use self::dispatcher::{DispatchSettings, LanguageOutcome, TranslationDispatcher};
pub use self::tokens::{HeuristicEstimator, TokenEstimator};

// Submodules
pub mod chunker;
pub mod core;
pub mod dispatcher;
pub mod prompts;
pub mod tokens;
