/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use subweave::file_utils::{FileManager, ORIGINAL_LABEL};
use crate::common;

#[test]
fn test_file_exists_with_existing_file_should_return_true() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.tmp", "content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(FileManager::dir_exists(temp_dir.path()));
    Ok(())
}

#[test]
fn test_file_exists_with_missing_file_should_return_false() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

#[test]
fn test_subtitle_output_path_should_use_stem_and_label() {
    let input_file = Path::new("/videos/talk.final.mkv");
    let output_dir = Path::new("/subs");

    assert_eq!(
        FileManager::subtitle_output_path(input_file, output_dir, "ja"),
        Path::new("/subs/talk.final.subtitles_ja.srt")
    );
    assert_eq!(
        FileManager::subtitle_output_path(input_file, output_dir, ORIGINAL_LABEL),
        Path::new("/subs/talk.final.subtitles_original.srt")
    );
}

#[test]
fn test_find_video_files_should_walk_subdirectories_in_order() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_video(temp_dir.path(), "b.mp4")?;
    common::create_test_video(temp_dir.path(), "a.MKV")?;
    common::create_test_video(temp_dir.path(), "season1/ep1.webm")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "not a video")?;
    common::create_test_file(temp_dir.path(), "b.subtitles_fr.srt", "")?;

    let found = FileManager::find_video_files(temp_dir.path())?;
    let names: Vec<String> = found
        .iter()
        .map(|p| p.strip_prefix(temp_dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();

    assert_eq!(names, vec!["a.MKV", "b.mp4", "season1/ep1.webm"]);
    Ok(())
}

#[test]
fn test_write_to_file_should_create_parent_directories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested/deeper/out.srt");

    FileManager::write_to_file(&path, "1\n00:00:01,000 --> 00:00:02,000\nHi\n\n")?;

    assert!(fs::read_to_string(&path)?.contains("Hi"));
    Ok(())
}

#[test]
fn test_append_to_log_file_should_keep_previous_lines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log = temp_dir.path().join("issues.log");

    FileManager::append_to_log_file(&log, "first")?;
    FileManager::append_to_log_file(&log, "second")?;

    let content = fs::read_to_string(&log)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("first"));
    assert!(lines[1].ends_with("second"));
    Ok(())
}
