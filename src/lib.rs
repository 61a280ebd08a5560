/*!
 * # subweave - spoken audio to multilingual subtitles
 *
 * A Rust library that turns the speech of a video into time-aligned
 * subtitles in several languages.
 *
 * ## Features
 *
 * - Split long audio into bounded chunks with ffmpeg
 * - Transcribe chunks in parallel with an OpenAI-compatible speech-to-text API
 * - Merge per-chunk timestamps into one ordered subtitle timeline
 * - Pack the timeline into translation requests under entry, token and call caps
 * - Translate into every target language with OpenAI, Anthropic or LM Studio
 * - Track token usage and report monotonic progress
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `media`: Chunk planning and the ffmpeg transcoder
 * - `transcription`: Bounded-parallel speech-to-text over chunks
 * - `timeline`: Offset computation and timeline reconciliation
 * - `translation`: Chunking and dispatch of translation requests:
 *   - `translation::chunker`: Packing entries into translation chunks
 *   - `translation::dispatcher`: (chunk, language) dispatch and reassembly
 *   - `translation::core`: Provider-backed translation service
 * - `subtitle_processor`: Subtitle document model and SRT format
 * - `usage` / `progress`: Run-wide usage totals and progress events
 * - `app_controller`: Pipeline orchestration and folder processing
 * - `providers`: Collaborator traits and HTTP clients:
 *   - `providers::openai`: OpenAI-compatible transcription and chat client
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::mock`: In-process collaborators for tests
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod progress;
pub mod providers;
pub mod subtitle_processor;
pub mod timeline;
pub mod transcription;
pub mod translation;
pub mod usage;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, FolderSummary, RunSummary};
pub use errors::{PipelineError, ProviderError};
pub use language_utils::{get_language_name, language_codes_match, normalize_detected_language};
pub use media::{AudioChunk, ChunkPlanner, Transcoder};
pub use subtitle_processor::{SubtitleDocument, SubtitleEntry};
pub use translation::{SubtitleChunker, TranslationChunk, TranslationService};
pub use usage::{UsageAccumulator, UsageStats};
