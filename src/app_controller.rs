use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::app_config::Config;
use crate::errors::PipelineError;
use crate::file_utils::{FileManager, ORIGINAL_LABEL};
use crate::media::{ChunkPlanner, FfmpegTranscoder, Transcoder};
use crate::progress::{ProgressEvent, ProgressReporter, Stage};
use crate::providers::{Transcriber, Translator};
use crate::timeline::{chunk_offsets, reconcile};
use crate::transcription::{ChunkTranscriber, WhisperTranscriber};
use crate::translation::prompts::prompt_overhead_tokens;
use crate::translation::{
    ChunkLimits, DispatchSettings, HeuristicEstimator, SubtitleChunker, TokenEstimator, TranslationDispatcher,
    TranslationService,
};
use crate::usage::{UsageAccumulator, UsageStats};

// @module: Application controller driving the subtitle pipeline

// @const: Issues log written next to the outputs
pub const ISSUES_LOG_NAME: &str = "subweave.issues.log";

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    // @field: Processed media file
    pub input: PathBuf,

    // @field: Spoken language of the media
    pub detected_language: String,

    // @field: Usage totals over every call of the run
    pub usage: UsageStats,

    // @field: Number of audio chunks transcribed
    pub audio_chunks: usize,

    // @field: Entries in the merged subtitle document
    pub entries: usize,

    // @field: Translation chunks per language
    pub translation_chunks: usize,

    // @field: Languages written in full
    pub completed_languages: Vec<String>,

    // @field: Subtitle files written
    pub written: Vec<PathBuf>,

    // @field: Pair-scoped and language-level failures
    pub failures: Vec<PipelineError>,

    // @field: All outputs already existed and the run was skipped
    pub skipped: bool,
}

impl RunSummary {
    fn skipped(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            detected_language: String::new(),
            usage: UsageStats::default(),
            audio_chunks: 0,
            entries: 0,
            translation_chunks: 0,
            completed_languages: Vec::new(),
            written: Vec::new(),
            failures: Vec::new(),
            skipped: true,
        }
    }

    /// Whether at least one requested language is missing from the output
    pub fn is_partial(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f, PipelineError::PartialLanguageFailure { .. }))
    }

    /// Languages that were requested but not written
    pub fn failed_languages(&self) -> Vec<String> {
        self.failures
            .iter()
            .filter_map(|f| match f {
                PipelineError::PartialLanguageFailure { language, .. } => Some(language.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Totals of a folder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub partial: usize,
    pub failed: usize,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Media collaborator
    transcoder: Arc<dyn Transcoder>,

    // @field: Speech-to-text collaborator
    transcriber: Arc<dyn Transcriber>,

    // @field: Translation collaborator
    translator: Arc<dyn Translator>,

    // @field: Token cost estimator for chunking and budgets
    estimator: Arc<dyn TokenEstimator>,
}

impl Controller {
    // @method: Create a controller with the production collaborators
    pub fn with_config(config: Config) -> Result<Self> {
        let transcoder = Arc::new(FfmpegTranscoder::default());
        let transcriber = Arc::new(WhisperTranscriber::from_config(&config));
        let translator = Arc::new(TranslationService::new(config.translation.clone())?);

        Ok(Self::with_collaborators(config, transcoder, transcriber, translator))
    }

    // @method: Create a controller with explicit collaborators
    pub fn with_collaborators(
        config: Config,
        transcoder: Arc<dyn Transcoder>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            config,
            transcoder,
            transcriber,
            translator,
            estimator: Arc::new(HeuristicEstimator),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output files of a run: one per target language plus the original transcript
    pub fn output_paths(&self, input_file: &Path, output_dir: &Path) -> Vec<PathBuf> {
        self.config
            .target_languages
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(ORIGINAL_LABEL))
            .map(|label| FileManager::subtitle_output_path(input_file, output_dir, label))
            .collect()
    }

    /// Run the pipeline on one media file with a progress bar
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<RunSummary, PipelineError> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress_bar(&input_file, &output_dir, force_overwrite, &multi_progress).await
    }

    async fn run_with_progress_bar(
        &self,
        input_file: &Path,
        output_dir: &Path,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<RunSummary, PipelineError> {
        let progress_bar = multi_progress.add(ProgressBar::new(100));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let (reporter, receiver) = ProgressReporter::channel(64);
        let consumer = tokio::spawn(drive_progress_bar(receiver, progress_bar.clone()));

        let result = self.run_with_progress(input_file, output_dir, force_overwrite, &reporter).await;

        drop(reporter);
        if let Err(e) = consumer.await {
            debug!("Progress consumer stopped: {}", e);
        }

        match &result {
            Ok(summary) if summary.skipped => progress_bar.finish_and_clear(),
            Ok(_) => progress_bar.finish_with_message("Done"),
            Err(_) => progress_bar.abandon_with_message("Failed"),
        }

        result
    }

    /// Run the pipeline on one media file, reporting progress to `progress`
    pub async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        force_overwrite: bool,
        progress: &ProgressReporter,
    ) -> Result<RunSummary, PipelineError> {
        if !FileManager::file_exists(input_file) {
            return Err(PipelineError::MediaNotFound(input_file.display().to_string()));
        }

        let outputs = self.output_paths(input_file, output_dir);
        if !force_overwrite && outputs.iter().all(|path| path.exists()) {
            warn!(
                "Skipping {}, subtitles already exist (use -f to force overwrite)",
                input_file.display()
            );
            return Ok(RunSummary::skipped(input_file));
        }

        FileManager::ensure_dir(output_dir).map_err(|e| PipelineError::Output(e.to_string()))?;

        let work_dir = tempfile::Builder::new()
            .prefix("subweave-")
            .tempdir()
            .map_err(|e| PipelineError::ChunkingFailure(format!("cannot create work directory: {}", e)))?;
        debug!("Audio chunks go to {}", work_dir.path().display());

        let start_time = Instant::now();
        let usage = UsageAccumulator::new();
        let result = self
            .process(input_file, output_dir, work_dir.path(), &usage, progress)
            .await;

        // Chunk files are removed whatever happened above
        if let Err(e) = work_dir.close() {
            warn!("Failed to remove temporary audio chunks: {}", e);
        }
        progress.report(Stage::Cleanup, 1.0, "Finished").await;

        match &result {
            Ok(summary) => {
                info!(
                    "Processed {} in {}",
                    input_file.display(),
                    Self::format_duration(start_time.elapsed())
                );
                info!("{}", usage.summary(&summary.detected_language));
            }
            Err(e) => {
                error!("Processing {} failed: {}", input_file.display(), e);
                info!("{}", usage.summary("unknown"));
            }
        }

        result
    }

    async fn process(
        &self,
        input_file: &Path,
        output_dir: &Path,
        work_dir: &Path,
        usage: &UsageAccumulator,
        progress: &ProgressReporter,
    ) -> Result<RunSummary, PipelineError> {
        let config = &self.config;

        // Split
        progress.report(Stage::Split, 0.0, "Extracting audio").await;
        let chunks = self
            .transcoder
            .split_audio(input_file, config.chunking.segment_seconds, work_dir)
            .await?;
        let chunks = ChunkPlanner::order_chunks(chunks)?;
        progress
            .report(Stage::Split, 1.0, format!("Split audio into {} chunk(s)", chunks.len()))
            .await;

        // Transcribe, offsets come from the probed durations
        let offsets = chunk_offsets(&chunks);
        let transcriber = ChunkTranscriber::new(self.transcriber.clone(), config.transcription.concurrent_requests);
        let transcripts = transcriber.transcribe_all(&chunks, usage, progress).await?;

        // Merge
        let document = reconcile(&transcripts, &offsets, &config.fallback_language)?;
        info!(
            "Transcribed {} entries, detected language: {}",
            document.len(),
            document.detected_language
        );
        progress
            .report(Stage::Merge, 1.0, format!("Merged {} subtitle entries", document.len()))
            .await;

        let mut written = Vec::new();
        let original_path = FileManager::subtitle_output_path(input_file, output_dir, ORIGINAL_LABEL);
        document
            .write_to_srt(&original_path)
            .map_err(|e| PipelineError::Output(e.to_string()))?;
        written.push(original_path);

        // Translate
        let template = &config.translation.common.system_prompt;
        let context_window = config.translation.get_context_window();
        let limits = ChunkLimits::from_config(
            &config.chunking,
            context_window,
            prompt_overhead_tokens(template, self.estimator.as_ref()),
        );
        let translation_chunks = SubtitleChunker::new(limits, self.estimator.as_ref()).pack(&document.entries)?;
        info!(
            "Translating {} chunk(s) into {}",
            translation_chunks.len(),
            config.target_languages.join(", ")
        );

        let dispatcher = TranslationDispatcher::new(
            self.translator.clone(),
            self.estimator.clone(),
            DispatchSettings {
                model: config.translation.get_model(),
                context_window,
                safety_margin_tokens: config.chunking.safety_margin_tokens,
                system_prompt: template.clone(),
                concurrent_requests: config.translation.optimal_concurrent_requests(),
            },
        );
        let outcomes = dispatcher
            .dispatch(
                &translation_chunks,
                &document.detected_language,
                &config.target_languages,
                usage,
                progress,
            )
            .await;

        // Output
        let issues_log = output_dir.join(ISSUES_LOG_NAME);
        let mut completed_languages = Vec::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            match &outcome.document {
                Some(translated) => {
                    let path = FileManager::subtitle_output_path(input_file, output_dir, &outcome.language);
                    translated
                        .write_to_srt(&path)
                        .map_err(|e| PipelineError::Output(e.to_string()))?;
                    info!("Wrote {} subtitles to {}", outcome.language, path.display());
                    written.push(path);
                    completed_languages.push(outcome.language.clone());
                }
                None => {
                    for failure in outcome.failures.iter().cloned().chain(outcome.partial_failure()) {
                        // Pair failures were already reported by the dispatcher
                        if !failure.is_pair_scoped() {
                            error!("{}", failure);
                        }
                        Self::log_issue(&issues_log, input_file, &failure);
                        failures.push(failure);
                    }
                }
            }
        }

        if completed_languages.is_empty() {
            return Err(PipelineError::AllLanguagesFailed(config.target_languages.join(", ")));
        }

        Ok(RunSummary {
            input: input_file.to_path_buf(),
            detected_language: document.detected_language.clone(),
            usage: usage.snapshot(),
            audio_chunks: chunks.len(),
            entries: document.len(),
            translation_chunks: translation_chunks.len(),
            completed_languages,
            written,
            failures,
            skipped: false,
        })
    }

    fn log_issue(issues_log: &Path, input_file: &Path, failure: &PipelineError) {
        let line = format!("{}: {}", input_file.display(), failure);
        if let Err(e) = FileManager::append_to_log_file(issues_log, &line) {
            warn!("Failed to write to {}: {}", issues_log.display(), e);
        }
    }

    /// Process every video file below `input_dir`
    ///
    /// Outputs go next to each video unless `output_dir` is given. Failures of
    /// single files are logged and counted, not returned.
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow::anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let video_files = FileManager::find_video_files(&input_dir)?;
        if video_files.is_empty() {
            return Err(anyhow::anyhow!("No video files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(video_files.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();

        for video_file in &video_files {
            let file_name = video_file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let target_dir = match (&output_dir, video_file.parent()) {
                (Some(dir), _) => dir.clone(),
                (None, Some(parent)) => parent.to_path_buf(),
                (None, None) => input_dir.clone(),
            };

            match self
                .run_with_progress_bar(video_file, &target_dir, force_overwrite, &multi_progress)
                .await
            {
                Ok(run) if run.skipped => summary.skipped += 1,
                Ok(run) if run.is_partial() => {
                    warn!("{}: missing languages {}", file_name, run.failed_languages().join(", "));
                    summary.partial += 1;
                }
                Ok(_) => summary.processed += 1,
                Err(e) => {
                    error!("Error processing file {}: {}", file_name, e);
                    Self::log_issue(&input_dir.join(ISSUES_LOG_NAME), video_file, &e);
                    summary.failed += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        let summary_message = format!(
            "Folder processing completed in {}: {} processed, {} partial, {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.processed,
            summary.partial,
            summary.skipped,
            summary.failed
        );
        info!("{}", summary_message);
        if let Err(e) = FileManager::append_to_log_file(input_dir.join(ISSUES_LOG_NAME), &summary_message) {
            warn!("Failed to write folder summary: {}", e);
        }

        Ok(summary)
    }

    /// Format a duration as a human-readable string
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Mirror progress events onto a progress bar until the channel closes
async fn drive_progress_bar(mut receiver: mpsc::Receiver<ProgressEvent>, progress_bar: ProgressBar) {
    while let Some(event) = receiver.recv().await {
        progress_bar.set_position(event.percent.round() as u64);
        progress_bar.set_message(event.message);
    }
}
