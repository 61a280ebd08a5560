/*!
 * Common test utilities for the subweave test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use subweave::app_config::Config;
use subweave::errors::PipelineError;
use subweave::media::{AudioChunk, ChunkPlanner, Transcoder};
use subweave::providers::mock::MockTranscriber;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a placeholder video file; the fake transcoder never reads it
pub fn create_test_video(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, "not really a video")
}

/// Config for pipeline tests: mocked collaborators, given target languages
pub fn test_config(target_languages: &[&str]) -> Config {
    let mut config = Config::default();
    config.target_languages = target_languages.iter().map(|l| l.to_string()).collect();
    config.transcription.api_key = "test-key".to_string();
    config.translation.active_provider_config_mut().api_key = "test-key".to_string();
    config
}

/// Transcoder that writes dummy chunk files for a fixed media duration
///
/// Chunks are returned in reverse order so callers have to sort them.
#[derive(Debug)]
pub struct FakeTranscoder {
    total_duration: f64,
    fail: bool,
    work_dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeTranscoder {
    pub fn new(total_duration: f64) -> Self {
        Self {
            total_duration,
            fail: false,
            work_dirs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0.0)
        }
    }

    /// Work directories the transcoder was handed, in call order
    pub fn work_dirs(&self) -> Vec<PathBuf> {
        self.work_dirs.lock().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn probe_duration(&self, _path: &Path) -> Result<f64, PipelineError> {
        Ok(self.total_duration)
    }

    async fn split_audio(
        &self,
        source: &Path,
        segment_secs: f64,
        work_dir: &Path,
    ) -> Result<Vec<AudioChunk>, PipelineError> {
        self.work_dirs.lock().push(work_dir.to_path_buf());
        if self.fail {
            return Err(PipelineError::ChunkingFailure(format!("cannot decode {}", source.display())));
        }

        let spans = ChunkPlanner::plan(self.probe_duration(source).await?, segment_secs)?;
        let mut chunks = Vec::new();
        for span in spans {
            let path = work_dir.join(format!("chunk_{:03}.mp3", span.index));
            fs::write(&path, b"ID3 fake audio").map_err(|e| PipelineError::ChunkingFailure(e.to_string()))?;
            chunks.push(AudioChunk {
                index: span.index,
                path,
                duration_secs: span.duration_secs,
            });
        }

        chunks.reverse();
        Ok(chunks)
    }
}

/// Transcriber scripted with `segments_per_chunk[i]` evenly spaced segments for chunk i
pub fn scripted_transcriber(segments_per_chunk: &[(usize, f64)], language: &str) -> MockTranscriber {
    segments_per_chunk
        .iter()
        .enumerate()
        .fold(MockTranscriber::working().with_usage(), |mock, (index, (count, duration))| {
            mock.with_transcript(
                format!("chunk_{:03}.mp3", index),
                MockTranscriber::evenly_spaced(*count, *duration, language, &format!("chunk {}", index)),
            )
        })
}
