/*!
 * Tests for subtitle processing functionality
 */

use anyhow::Result;
use subweave::subtitle_processor::{parse_srt_reply, parse_srt_string, SubtitleDocument, SubtitleEntry};
use crate::common;

/// Test timestamp parsing and formatting
#[test]
fn test_timestamp_parsing_should_parse_and_format() {
    let ms = SubtitleEntry::parse_timestamp("01:23:45,678").unwrap();
    assert_eq!(ms, 5_025_678);
    assert_eq!(SubtitleEntry::format_timestamp(ms), "01:23:45,678");

    assert_eq!(SubtitleEntry::parse_timestamp("00:00:01.500").unwrap(), 1500);
    assert!(SubtitleEntry::parse_timestamp("00:61:00,000").is_err());
    assert!(SubtitleEntry::parse_timestamp("garbage").is_err());
}

#[test]
fn test_subtitle_entry_display_should_emit_srt_block() {
    let entry = SubtitleEntry::new(3, 5000, 10_250, "Two\nlines".to_string());
    assert_eq!(entry.to_string(), "3\n00:00:05,000 --> 00:00:10,250\nTwo\nlines\n\n");
    assert_eq!(entry.start_secs(), 5.0);
    assert_eq!(entry.end_secs(), 10.25);
}

#[test]
fn test_new_validated_should_reject_bad_entries() {
    assert!(SubtitleEntry::new_validated(1, 2000, 2000, "x".to_string()).is_err());
    assert!(SubtitleEntry::new_validated(1, 1000, 2000, "   ".to_string()).is_err());
    assert_eq!(
        SubtitleEntry::new_validated(1, 1000, 2000, "  padded  ".to_string()).unwrap().text,
        "padded"
    );
}

#[test]
fn test_sort_and_renumber_should_order_by_start_and_keep_ties_stable() {
    let mut document = SubtitleDocument::new(
        vec![
            SubtitleEntry::new(9, 5000, 6000, "third".to_string()),
            SubtitleEntry::new(4, 1000, 2000, "first".to_string()),
            SubtitleEntry::new(7, 1000, 1500, "second".to_string()),
        ],
        "en",
    );

    document.sort_and_renumber();

    let texts: Vec<&str> = document.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
    let ids: Vec<usize> = document.entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(document.verify_ordering().is_ok());
}

#[test]
fn test_verify_ordering_should_catch_gaps_and_inversions() {
    let gap = SubtitleDocument::new(
        vec![
            SubtitleEntry::new(1, 0, 1000, "a".to_string()),
            SubtitleEntry::new(3, 2000, 3000, "b".to_string()),
        ],
        "en",
    );
    assert!(gap.verify_ordering().is_err());

    let inverted = SubtitleDocument::new(
        vec![
            SubtitleEntry::new(1, 5000, 6000, "a".to_string()),
            SubtitleEntry::new(2, 2000, 3000, "b".to_string()),
        ],
        "en",
    );
    assert!(inverted.verify_ordering().is_err());
}

#[test]
fn test_parse_srt_should_handle_fences_bom_and_multiline_text() -> Result<()> {
    let content = "```srt\n\u{feff}1\n00:00:01,000 --> 00:00:02,000\nHello\nthere\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n```\n";

    let entries = parse_srt_string(content)?;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "Hello\nthere");
    assert_eq!(entries[1].start_time_ms, 3000);
    Ok(())
}

#[test]
fn test_parse_srt_should_drop_empty_cues_but_reply_parser_keeps_them() -> Result<()> {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\n\n3\n00:00:05,000 --> 00:00:06,000\nBye\n\n";

    assert_eq!(parse_srt_string(content)?.len(), 2);

    let reply = parse_srt_reply(content)?;
    assert_eq!(reply.len(), 3);
    assert_eq!(reply[1].id, 2);
    assert!(reply[1].text.is_empty());
    Ok(())
}

#[test]
fn test_parse_srt_with_no_entries_should_error() {
    assert!(parse_srt_string("this is not a subtitle file").is_err());
    assert!(parse_srt_string("").unwrap().is_empty());
}

#[test]
fn test_document_should_survive_a_file_round_trip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out/talk.subtitles_original.srt");
    let document = SubtitleDocument::new(
        vec![
            SubtitleEntry::new(1, 0, 1200, "Bonjour".to_string()),
            SubtitleEntry::new(2, 3_600_000, 3_601_000, "Une heure plus tard".to_string()),
        ],
        "fr",
    );

    document.write_to_srt(&path)?;
    let read_back = SubtitleDocument::read_from_srt(&path, "fr")?;

    assert_eq!(read_back, document);
    Ok(())
}
