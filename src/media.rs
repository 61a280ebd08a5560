/*!
 * Audio chunking.
 *
 * `ChunkPlanner` decides chunk boundaries and validates chunk artifacts,
 * `Transcoder` is the media collaborator that writes the chunk files.
 * The production transcoder drives `ffmpeg` / `ffprobe`.
 */

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::PipelineError;

/// One bounded-duration slice of the source audio, written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Position of the chunk in the source, 0-based
    pub index: usize,
    /// Audio file of this chunk
    pub path: PathBuf,
    /// Probed duration in seconds
    pub duration_secs: f64,
}

/// Planned boundaries of one chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkSpan {
    pub index: usize,
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Decides chunk boundaries and orders transcoder output
pub struct ChunkPlanner;

impl ChunkPlanner {
    /// Split `total_duration` into `ceil(total / segment)` contiguous spans
    pub fn plan(total_duration: f64, segment_secs: f64) -> Result<Vec<ChunkSpan>, PipelineError> {
        if !segment_secs.is_finite() || segment_secs <= 0.0 {
            return Err(PipelineError::Configuration(format!(
                "segment length must be positive, got {}",
                segment_secs
            )));
        }
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(PipelineError::ChunkingFailure(format!(
                "media has no usable duration ({})",
                total_duration
            )));
        }

        let count = (total_duration / segment_secs).ceil() as usize;
        let spans = (0..count)
            .map(|index| {
                let start_secs = index as f64 * segment_secs;
                ChunkSpan {
                    index,
                    start_secs,
                    duration_secs: segment_secs.min(total_duration - start_secs),
                }
            })
            .collect();

        Ok(spans)
    }

    /// Check transcoder output against the plan
    ///
    /// Segment cuts land on packet boundaries, so a sliver at the end may add
    /// or drop one chunk. That is logged; any larger difference is a failure.
    pub fn check_against_plan(planned: &[ChunkSpan], chunks: &[AudioChunk]) -> Result<(), PipelineError> {
        match planned.len().abs_diff(chunks.len()) {
            0 => Ok(()),
            1 => {
                warn!("Planned {} chunk(s), transcoder wrote {}", planned.len(), chunks.len());
                Ok(())
            }
            _ => Err(PipelineError::ChunkingFailure(format!(
                "planned {} chunk(s) but the transcoder wrote {}",
                planned.len(),
                chunks.len()
            ))),
        }
    }

    /// Sort transcoder artifacts by index and require indices to be exactly `0..n-1`
    pub fn order_chunks(mut chunks: Vec<AudioChunk>) -> Result<Vec<AudioChunk>, PipelineError> {
        if chunks.is_empty() {
            return Err(PipelineError::ChunkingFailure("transcoder produced no audio chunks".to_string()));
        }

        chunks.sort_by_key(|chunk| chunk.index);
        for (expected, chunk) in chunks.iter().enumerate() {
            if chunk.index != expected {
                return Err(PipelineError::ChunkingFailure(format!(
                    "chunk indices are not contiguous: expected {}, found {}",
                    expected, chunk.index
                )));
            }
            if !chunk.duration_secs.is_finite() || chunk.duration_secs < 0.0 {
                return Err(PipelineError::ChunkingFailure(format!(
                    "chunk {} has invalid duration {}",
                    chunk.index, chunk.duration_secs
                )));
            }
        }

        Ok(chunks)
    }
}

/// Media collaborator that probes and splits audio
#[async_trait]
pub trait Transcoder: Send + Sync + Debug {
    /// Duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, PipelineError>;

    /// Extract the audio track of `source` into chunks of at most `segment_secs`
    /// under `work_dir`, each with its probed duration
    async fn split_audio(
        &self,
        source: &Path,
        segment_secs: f64,
        work_dir: &Path,
    ) -> Result<Vec<AudioChunk>, PipelineError>;
}

/// `ffmpeg` / `ffprobe` based transcoder
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    /// Upper bound for a single ffmpeg or ffprobe invocation
    timeout: Duration,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

// Segment list written by the ffmpeg segment muxer, one file name per line
const SEGMENT_LIST_NAME: &str = "chunks.txt";

impl FfmpegTranscoder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, program: &str, command: &mut Command) -> Result<Output, String> {
        let future = command.kill_on_drop(true).output();

        let output = tokio::select! {
            result = future => {
                result.map_err(|e| format!("Failed to execute {}: {}", program, e))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(format!("{} timed out after {} seconds", program, self.timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("{} failed: {}", program, filtered);
            return Err(format!("{} failed: {}", program, filtered));
        }

        Ok(output)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe_duration(&self, path: &Path) -> Result<f64, PipelineError> {
        let mut command = Command::new("ffprobe");
        command
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path);

        let output = self.run("ffprobe", &mut command).await.map_err(PipelineError::ChunkingFailure)?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        stdout.trim().parse::<f64>().map_err(|e| {
            PipelineError::ChunkingFailure(format!(
                "Unparseable duration '{}' for {}: {}",
                stdout.trim(),
                path.display(),
                e
            ))
        })
    }

    async fn split_audio(
        &self,
        source: &Path,
        segment_secs: f64,
        work_dir: &Path,
    ) -> Result<Vec<AudioChunk>, PipelineError> {
        let total = self.probe_duration(source).await?;
        let planned = ChunkPlanner::plan(total, segment_secs)?;
        info!("Splitting {:.1}s of audio into {} chunk(s) of {}s", total, planned.len(), segment_secs);

        let list_path = work_dir.join(SEGMENT_LIST_NAME);
        let mut command = Command::new("ffmpeg");
        command
            .args(["-y", "-hide_banner", "-i"])
            .arg(source)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-c:a", "libmp3lame", "-b:a", "64k"])
            .args(["-f", "segment", "-segment_time", &format!("{}", segment_secs)])
            .args(["-reset_timestamps", "1", "-segment_list_type", "flat", "-segment_list"])
            .arg(&list_path)
            .arg(work_dir.join("chunk_%03d.mp3"));

        self.run("ffmpeg", &mut command).await.map_err(PipelineError::ChunkingFailure)?;

        let listing = tokio::fs::read_to_string(&list_path).await.map_err(|e| {
            PipelineError::ChunkingFailure(format!("Cannot read segment list {}: {}", list_path.display(), e))
        })?;

        let mut chunks = Vec::new();
        for (index, name) in listing.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
            let path = work_dir.join(name);
            let duration_secs = self.probe_duration(&path).await?;
            debug!("Chunk {} at {} lasts {:.3}s", index, path.display(), duration_secs);
            chunks.push(AudioChunk {
                index,
                path,
                duration_secs,
            });
        }

        ChunkPlanner::check_against_plan(&planned, &chunks)?;
        ChunkPlanner::order_chunks(chunks)
    }
}

/// Keep only the meaningful lines of ffmpeg stderr, dropping the banner and stream dump
fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
