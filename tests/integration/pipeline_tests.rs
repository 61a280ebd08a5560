/*!
 * End-to-end pipeline tests with fake media and mock services
 */

use anyhow::Result;
use std::sync::Arc;

use subweave::app_controller::{Controller, ISSUES_LOG_NAME};
use subweave::errors::PipelineError;
use subweave::progress::ProgressReporter;
use subweave::providers::mock::{MockTranscriber, MockTranslator};
use subweave::subtitle_processor::SubtitleDocument;

use crate::common::{self, FakeTranscoder};

fn controller(
    target_languages: &[&str],
    transcoder: Arc<FakeTranscoder>,
    transcriber: MockTranscriber,
    translator: Arc<MockTranslator>,
) -> Controller {
    Controller::with_collaborators(
        common::test_config(target_languages),
        transcoder,
        Arc::new(transcriber),
        translator,
    )
}

/// A twelve minute video in 300 second chunks, translated into two languages
#[tokio::test]
async fn test_pipeline_with_twelve_minute_video_should_write_all_languages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "lecture.mp4")?;
    let output_dir = temp_dir.path().join("subs");

    let transcoder = Arc::new(FakeTranscoder::new(720.0));
    let transcriber = common::scripted_transcriber(&[(150, 300.0), (150, 300.0), (53, 120.0)], "english");
    let translator = Arc::new(MockTranslator::working());
    let controller = controller(&["ja", "es"], transcoder.clone(), transcriber, translator.clone());

    let summary = controller.run(video.clone(), output_dir.clone(), false).await?;

    assert_eq!(summary.audio_chunks, 3);
    assert_eq!(summary.entries, 353);
    assert_eq!(summary.detected_language, "en");
    assert!(summary.translation_chunks <= 25);
    assert_eq!(summary.completed_languages, vec!["ja".to_string(), "es".to_string()]);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.usage.api_calls, 3 + 2 * summary.translation_chunks as u64);
    assert_eq!(translator.request_count(), 2 * summary.translation_chunks);

    for label in ["ja", "es", "original"] {
        let path = output_dir.join(format!("lecture.subtitles_{}.srt", label));
        assert!(path.exists(), "missing {}", path.display());

        let document = SubtitleDocument::read_from_srt(&path, label)?;
        assert_eq!(document.len(), 353);
        assert!(document.verify_ordering().is_ok());
    }

    let japanese = SubtitleDocument::read_from_srt(output_dir.join("lecture.subtitles_ja.srt"), "ja")?;
    let original = SubtitleDocument::read_from_srt(output_dir.join("lecture.subtitles_original.srt"), "en")?;
    assert!(japanese.entries[0].text.starts_with("[ja] "));
    assert_eq!(japanese.entries[200].start_time_ms, original.entries[200].start_time_ms);

    // The third chunk starts after both full chunks
    assert_eq!(original.entries[300].start_time_ms, 600_000);

    // Temporary chunks are gone
    assert!(transcoder.work_dirs().iter().all(|dir| !dir.exists()));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_one_failing_language_should_report_partial_outcome() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "clip.mkv")?;
    let output_dir = temp_dir.path().to_path_buf();

    let transcriber = common::scripted_transcriber(&[(20, 60.0)], "japanese");
    let translator = Arc::new(MockTranslator::working().failing_for("es"));
    let controller = controller(&["fr", "es"], Arc::new(FakeTranscoder::new(60.0)), transcriber, translator);

    let summary = controller.run(video, output_dir.clone(), false).await?;

    assert_eq!(summary.detected_language, "ja");
    assert_eq!(summary.completed_languages, vec!["fr".to_string()]);
    assert!(summary.is_partial());
    assert_eq!(summary.failed_languages(), vec!["es".to_string()]);
    assert!(output_dir.join("clip.subtitles_fr.srt").exists());
    assert!(!output_dir.join("clip.subtitles_es.srt").exists());

    let issues = std::fs::read_to_string(output_dir.join(ISSUES_LOG_NAME))?;
    assert!(issues.contains("(es)"));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_all_languages_failing_should_error() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "clip.mp4")?;

    let transcriber = common::scripted_transcriber(&[(5, 30.0)], "english");
    let controller = controller(
        &["de"],
        Arc::new(FakeTranscoder::new(30.0)),
        transcriber,
        Arc::new(MockTranslator::dropping_entries()),
    );

    let result = controller.run(video, temp_dir.path().to_path_buf(), false).await;

    assert!(matches!(result, Err(PipelineError::AllLanguagesFailed(_))));
    // The transcript itself was still written
    assert!(temp_dir.path().join("clip.subtitles_original.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_transcription_failure_should_abort_and_clean_up() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "clip.mp4")?;

    let transcoder = Arc::new(FakeTranscoder::new(900.0));
    let transcriber = common::scripted_transcriber(&[(10, 300.0), (10, 300.0), (10, 300.0)], "english")
        .failing_on("chunk_001.mp3");
    let translator = Arc::new(MockTranslator::working());
    let controller = controller(&["fr"], transcoder.clone(), transcriber, translator.clone());

    let result = controller.run(video, temp_dir.path().to_path_buf(), false).await;

    assert!(matches!(result, Err(PipelineError::TranscriptionFailure { chunk_index: 1, .. })));
    assert_eq!(translator.request_count(), 0);
    assert!(!temp_dir.path().join("clip.subtitles_original.srt").exists());
    assert_eq!(transcoder.work_dirs().len(), 1);
    assert!(!transcoder.work_dirs()[0].exists());
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_chunking_failure_should_clean_up() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "broken.mp4")?;
    let transcoder = Arc::new(FakeTranscoder::failing());
    let controller = controller(
        &["fr"],
        transcoder.clone(),
        MockTranscriber::working(),
        Arc::new(MockTranslator::working()),
    );

    let result = controller.run(video, temp_dir.path().to_path_buf(), false).await;

    assert!(matches!(result, Err(PipelineError::ChunkingFailure(_))));
    assert!(!transcoder.work_dirs()[0].exists());
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_empty_chunk_should_fail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "quiet.mp4")?;
    let transcriber = common::scripted_transcriber(&[(4, 300.0), (0, 100.0)], "english");
    let controller = controller(
        &["fr"],
        Arc::new(FakeTranscoder::new(400.0)),
        transcriber,
        Arc::new(MockTranslator::working()),
    );

    let result = controller.run(video, temp_dir.path().to_path_buf(), false).await;

    assert!(matches!(result, Err(PipelineError::EmptyTranscription { chunk_index: 1 })));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_missing_media_should_not_start() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let transcoder = Arc::new(FakeTranscoder::new(10.0));
    let controller = controller(
        &["fr"],
        transcoder.clone(),
        MockTranscriber::working(),
        Arc::new(MockTranslator::working()),
    );

    let result = controller
        .run(temp_dir.path().join("missing.mp4"), temp_dir.path().to_path_buf(), false)
        .await;

    assert!(matches!(result, Err(PipelineError::MediaNotFound(_))));
    assert!(transcoder.work_dirs().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_existing_outputs_should_skip_unless_forced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "done.mp4")?;
    for label in ["fr", "original"] {
        common::create_test_file(temp_dir.path(), &format!("done.subtitles_{}.srt", label), "")?;
    }

    let translator = Arc::new(MockTranslator::working());
    let controller = controller(
        &["fr"],
        Arc::new(FakeTranscoder::new(10.0)),
        MockTranscriber::working(),
        translator.clone(),
    );

    let skipped = controller.run(video.clone(), temp_dir.path().to_path_buf(), false).await?;
    assert!(skipped.skipped);
    assert_eq!(translator.request_count(), 0);

    let forced = controller.run(video, temp_dir.path().to_path_buf(), true).await?;
    assert!(!forced.skipped);
    assert_eq!(translator.request_count(), 1);
    let french = SubtitleDocument::read_from_srt(temp_dir.path().join("done.subtitles_fr.srt"), "fr")?;
    assert_eq!(french.entries[0].text, "[fr] Hello.");
    Ok(())
}

#[tokio::test]
async fn test_pipeline_over_call_ceiling_should_slice_evenly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "long.mp4")?;

    let mut config = common::test_config(&["fr"]);
    config.chunking.max_api_calls = 2;
    let controller = Controller::with_collaborators(
        config,
        Arc::new(FakeTranscoder::new(200.0)),
        Arc::new(common::scripted_transcriber(&[(40, 200.0)], "english")),
        Arc::new(MockTranslator::working()),
    );

    let summary = controller.run(video, temp_dir.path().to_path_buf(), false).await?;

    assert_eq!(summary.entries, 40);
    assert_eq!(summary.translation_chunks, 2);
    assert_eq!(summary.usage.api_calls, 1 + 2);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_progress_should_be_monotonic_and_complete() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_video(temp_dir.path(), "clip.mp4")?;
    let controller = controller(
        &["fr", "es"],
        Arc::new(FakeTranscoder::new(650.0)),
        common::scripted_transcriber(&[(30, 300.0), (30, 300.0), (5, 50.0)], "english"),
        Arc::new(MockTranslator::working()),
    );

    let (reporter, mut receiver) = ProgressReporter::channel(1024);
    let collector = tokio::spawn(async move {
        let mut percents = Vec::new();
        while let Some(event) = receiver.recv().await {
            percents.push(event.percent);
        }
        percents
    });

    controller
        .run_with_progress(&video, temp_dir.path(), false, &reporter)
        .await?;
    drop(reporter);
    let percents = collector.await?;

    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last().copied(), Some(100.0));
    Ok(())
}
