use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::warn;

// @module: Subtitle document model and SRT interchange format

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

// @const: Markdown code fence some models wrap their answer in
static CODE_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*```[a-zA-Z]*\s*$").expect("code fence regex is valid")
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: 1-based position in the document
    pub id: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(id: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            id,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range and non-empty text
    pub fn new_validated(id: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Result<Self> {
        if end_time_ms <= start_time_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} <= start time {}",
                end_time_ms, start_time_ms
            ));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty subtitle text for entry {}", id));
        }

        Ok(SubtitleEntry {
            id,
            start_time_ms,
            end_time_ms,
            text: trimmed_text.to_string(),
        })
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Start time in seconds
    pub fn start_secs(&self) -> f64 {
        self.start_time_ms as f64 / 1000.0
    }

    /// End time in seconds
    pub fn end_secs(&self) -> f64 {
        self.end_time_ms as f64 / 1000.0
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Merged, renumbered subtitle timeline plus the spoken language it was transcribed from
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleDocument {
    /// Entries ordered by start time, ids 1..=N
    pub entries: Vec<SubtitleEntry>,

    /// ISO 639-1 code of the spoken language
    pub detected_language: String,
}

impl SubtitleDocument {
    pub fn new(entries: Vec<SubtitleEntry>, detected_language: impl Into<String>) -> Self {
        Self {
            entries,
            detected_language: detected_language.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stable-sort by start time and assign ids 1..=N in that order
    pub fn sort_and_renumber(&mut self) {
        self.entries.sort_by_key(|entry| entry.start_time_ms);
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.id = i + 1;
        }
    }

    /// Check the ordering invariant: non-decreasing starts, contiguous ids, end after start
    pub fn verify_ordering(&self) -> Result<()> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.id != i + 1 {
                return Err(anyhow!("Entry at position {} has id {}", i + 1, entry.id));
            }
            if entry.end_time_ms <= entry.start_time_ms {
                return Err(anyhow!("Entry {} ends before it starts", entry.id));
            }
        }

        if let Some(pair) = self.entries.windows(2).find(|w| w[0].start_time_ms > w[1].start_time_ms) {
            return Err(anyhow!("Entry {} starts after entry {}", pair[0].id, pair[1].id));
        }

        Ok(())
    }

    /// Serialize to the SRT interchange format
    pub fn to_srt_string(&self) -> String {
        entries_to_srt(&self.entries)
    }

    /// Write subtitles to an SRT file (UTF-8)
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

        for entry in &self.entries {
            write!(file, "{}", entry)
                .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;
        }

        Ok(())
    }

    /// Parse an SRT file into a document
    pub fn read_from_srt<P: AsRef<Path>>(path: P, language: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        Ok(Self::new(parse_srt_string(&content)?, language))
    }
}

/// Serialize a slice of entries to SRT
pub fn entries_to_srt(entries: &[SubtitleEntry]) -> String {
    entries.iter().map(|entry| entry.to_string()).collect()
}

/// Parse SRT format string into subtitle entries
///
/// Malformed or empty entries are skipped with a warning, so callers comparing
/// entry counts see them as missing.
pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
    parse_srt_blocks(content, false)
}

/// Parse a translated SRT reply, keeping blocks whose text came back empty
///
/// Translation replies are matched against the request block by block, so an
/// empty cue must still occupy its position.
pub fn parse_srt_reply(content: &str) -> Result<Vec<SubtitleEntry>> {
    parse_srt_blocks(content, true)
}

fn parse_srt_blocks(content: &str, keep_empty: bool) -> Result<Vec<SubtitleEntry>> {
    let content = CODE_FENCE_REGEX.replace_all(content, "");
    let mut entries = Vec::new();

    let mut current_id: Option<usize> = None;
    let mut current_times: Option<(u64, u64)> = None;
    let mut current_text = String::new();

    let mut flush = |id: Option<usize>, times: Option<(u64, u64)>, text: &mut String| {
        if let (Some(id), Some((start_ms, end_ms))) = (id, times) {
            if keep_empty && text.trim().is_empty() {
                entries.push(SubtitleEntry::new(id, start_ms, end_ms, String::new()));
                text.clear();
                return;
            }
            match SubtitleEntry::new_validated(id, start_ms, end_ms, text.clone()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping invalid subtitle entry {}: {}", id, e),
            }
        }
        text.clear();
    };

    for (line_number, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if current_times.is_some() {
                flush(current_id.take(), current_times.take(), &mut current_text);
            }
            continue;
        }

        if current_id.is_none() && current_text.is_empty() {
            if let Ok(num) = trimmed.trim_start_matches('\u{feff}').parse::<usize>() {
                current_id = Some(num);
                continue;
            }
        }

        if current_id.is_some() && current_times.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                match (captures_to_ms(&caps, 1), captures_to_ms(&caps, 5)) {
                    (Ok(start_ms), Ok(end_ms)) => {
                        current_times = Some((start_ms, end_ms));
                        continue;
                    }
                    _ => warn!("Invalid timestamp format at line {}: {}", line_number + 1, trimmed),
                }
            }
        }

        if current_times.is_some() {
            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        }
    }

    flush(current_id, current_times, &mut current_text);

    if entries.is_empty() && !content.trim().is_empty() {
        return Err(anyhow!("No subtitle entries could be parsed"));
    }

    Ok(entries)
}

fn captures_to_ms(caps: &regex::Captures, first_group: usize) -> Result<u64> {
    let mut parts = [0u64; 4];
    for (i, part) in parts.iter_mut().enumerate() {
        *part = caps
            .get(first_group + i)
            .ok_or_else(|| anyhow!("Missing timestamp component"))?
            .as_str()
            .parse()?;
    }
    let [hours, minutes, seconds, millis] = parts;
    if minutes >= 60 || seconds >= 60 {
        return Err(anyhow!("Invalid time components"));
    }
    Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
}
