//! Subtitle rendering and timestamp handling
//!
//! Turns timed transcript segments into plain subtitle blocks. Blocks carry
//! no index numbers, only a timing line and the cue text, so the output can
//! be concatenated or diffed without renumbering.

use std::path::Path;

use tracing::info;

use crate::gapfill::Suggestion;
use crate::transcription::TranscriptSegment;
use crate::{RelayError, Result};

/// Format a time offset in seconds as `HH:MM:SS,mmm`.
///
/// Sub-second precision truncates to the millisecond, so `1.2509` renders
/// as `,250`. Hours are not wrapped: offsets past a day render as `25:00:00`
/// and beyond, which keeps cue ordering intact for long recordings.
pub fn format_timestamp(seconds: f64) -> Result<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(RelayError::InvalidTimestamp(seconds));
    }

    let total_seconds = seconds as u64;
    let millis = ((seconds - total_seconds as f64) * 1000.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    Ok(format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis))
}

/// Parse a `HH:MM:SS,mmm` timestamp back into seconds.
///
/// Accepts hour fields wider than two digits so offsets past a day survive
/// a render/parse cycle with millisecond accuracy.
pub fn parse_timestamp(value: &str) -> Result<f64> {
    let malformed = || RelayError::InvalidInput(format!("malformed timestamp: {}", value));

    let (clock, millis_raw) = value.rsplit_once(',').ok_or_else(malformed)?;
    if millis_raw.len() != 3 || !millis_raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let fields: Vec<&str> = clock.split(':').collect();
    let [hours_raw, minutes_raw, secs_raw] = fields.as_slice() else {
        return Err(malformed());
    };
    if hours_raw.len() < 2 || minutes_raw.len() != 2 || secs_raw.len() != 2 {
        return Err(malformed());
    }

    let hours: u64 = hours_raw.parse().map_err(|_| malformed())?;
    let minutes: u64 = minutes_raw.parse().map_err(|_| malformed())?;
    let secs: u64 = secs_raw.parse().map_err(|_| malformed())?;
    let millis: u64 = millis_raw.parse().map_err(|_| malformed())?;

    if minutes >= 60 || secs >= 60 {
        return Err(malformed());
    }

    // The hour field has no width limit, so the arithmetic must not either.
    let total_seconds = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + secs))
        .ok_or_else(malformed)?;

    Ok(total_seconds as f64 + millis as f64 / 1000.0)
}

/// Render transcript segments as subtitle blocks in input order.
///
/// Each block is a timing line followed by the cue text. Text passes through
/// untouched, no wrapping and no length limits. An empty slice renders as an
/// empty string.
pub fn render_segments(segments: &[TranscriptSegment]) -> Result<String> {
    render_blocks(segments.iter().map(|s| (s.start, s.end, s.text.as_str())))
}

/// Render gap filler suggestions with the same block layout as segments.
pub fn render_suggestions(suggestions: &[Suggestion]) -> Result<String> {
    render_blocks(
        suggestions
            .iter()
            .map(|s| (s.start, s.end, s.suggestion.as_str())),
    )
}

fn render_blocks<'a>(blocks: impl Iterator<Item = (f64, f64, &'a str)>) -> Result<String> {
    let mut output = String::new();

    for (start, end, text) in blocks {
        output.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_timestamp(start)?,
            format_timestamp(end)?,
            text
        ));
    }

    Ok(output.trim_end().to_string())
}

/// Parse rendered subtitle blocks back into timed segments.
pub fn parse_subtitles(content: &str) -> Result<Vec<TranscriptSegment>> {
    let mut segments = Vec::new();

    for block in content.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let (header, text) = block.split_once('\n').unwrap_or((block, ""));
        let (start_raw, end_raw) = header
            .split_once(" --> ")
            .ok_or_else(|| RelayError::InvalidInput(format!("malformed cue header: {}", header)))?;

        segments.push(TranscriptSegment {
            start: parse_timestamp(start_raw.trim())?,
            end: parse_timestamp(end_raw.trim())?,
            text: text.trim().to_string(),
        });
    }

    Ok(segments)
}

/// Write rendered subtitle content to disk, creating parent directories.
pub async fn write_subtitle_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tokio::fs::write(path, content).await?;
    info!("📝 Wrote subtitle file: {}", path.display());

    Ok(())
}
