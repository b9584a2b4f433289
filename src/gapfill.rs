//! Gap filling for subtitle timelines
//!
//! Silent stretches between spoken segments get filler captions generated
//! by the chat model. The model proposes the cue text and timing, but the
//! timing rules are enforced here: suggestions must tile each gap exactly,
//! and a reply that breaks the rules is rejected rather than repaired.
//! Generation is not idempotent, so a failed call is never retried.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chat::ChatCompletion;
use crate::config::GapfillConfig;
use crate::{payload, prompts, subtitle, RelayError, Result};

/// Matching tolerance for model-produced timestamps, about one millisecond.
const TIME_EPSILON: f64 = 1e-3;

/// A silent stretch of the timeline that needs filler captions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub start: f64,
    pub end: f64,
}

/// A filler caption proposed by the model for part of a gap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Deserialize)]
struct SuggestionEnvelope {
    suggestions: Vec<Suggestion>,
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIME_EPSILON
}

fn validate_gaps(gaps: &[Gap]) -> Result<()> {
    for gap in gaps {
        for value in [gap.start, gap.end] {
            if !value.is_finite() || value < 0.0 {
                return Err(RelayError::InvalidTimestamp(value));
            }
        }
        if gap.end <= gap.start {
            return Err(RelayError::InvalidInput(format!(
                "gap end {} must be after start {}",
                gap.end, gap.start
            )));
        }
    }
    Ok(())
}

/// Fills silent gaps with generated captions via a chat completion backend
pub struct GapFiller {
    chat: Arc<dyn ChatCompletion>,
    config: GapfillConfig,
}

impl GapFiller {
    pub fn new(chat: Arc<dyn ChatCompletion>, config: GapfillConfig) -> Self {
        Self { chat, config }
    }

    /// Generate filler captions for the given gaps and render them as
    /// subtitle blocks.
    ///
    /// When an output path is given the rendered blocks are also written
    /// there. Returns the rendered text either way.
    pub async fn fill_gaps(
        &self,
        transcript: &str,
        gaps: &[Gap],
        output_path: Option<&Path>,
    ) -> Result<String> {
        validate_gaps(gaps)?;

        if gaps.is_empty() {
            return Ok(String::new());
        }

        let messages =
            prompts::gapfill_messages(transcript, gaps, self.config.max_suggestion_seconds)?;
        let content = self.chat.complete(messages).await?;

        let envelope: SuggestionEnvelope = payload::parse_json_payload(&content)?;
        self.validate_suggestions(gaps, &envelope.suggestions)?;

        let rendered = subtitle::render_suggestions(&envelope.suggestions)?;

        if let Some(path) = output_path {
            subtitle::write_subtitle_file(path, &rendered).await?;
        }

        info!(
            "🎯 Filled {} gaps with {} suggestions",
            gaps.len(),
            envelope.suggestions.len()
        );

        Ok(rendered)
    }

    /// Check that the suggestions tile the gaps exactly, in order.
    ///
    /// A gap no longer than the configured span gets exactly one suggestion
    /// covering it whole. A longer gap must be split into consecutive
    /// pieces, each within the span limit, the first anchored at the gap
    /// start and the last at the gap end.
    fn validate_suggestions(&self, gaps: &[Gap], suggestions: &[Suggestion]) -> Result<()> {
        let max_span = self.config.max_suggestion_seconds;
        let mut idx = 0;

        for gap in gaps {
            let first = suggestions.get(idx).ok_or_else(|| {
                RelayError::MalformedResponse(format!(
                    "no suggestions cover gap {:.3}-{:.3}",
                    gap.start, gap.end
                ))
            })?;
            if !close(first.start, gap.start) {
                return Err(RelayError::MalformedResponse(format!(
                    "first suggestion for gap {:.3}-{:.3} starts at {:.3}",
                    gap.start, gap.end, first.start
                )));
            }

            let mut cursor = gap.start;
            let mut count = 0;

            while idx < suggestions.len() {
                if count > 0 && close(cursor, gap.end) {
                    break;
                }

                let s = &suggestions[idx];
                if !close(s.start, cursor) {
                    return Err(RelayError::MalformedResponse(format!(
                        "suggestion at {:.3} leaves the gap discontinuous after {:.3}",
                        s.start, cursor
                    )));
                }
                if s.end <= s.start {
                    return Err(RelayError::MalformedResponse(format!(
                        "suggestion {:.3}-{:.3} has no duration",
                        s.start, s.end
                    )));
                }
                if s.end > gap.end + TIME_EPSILON {
                    return Err(RelayError::MalformedResponse(format!(
                        "suggestion ends at {:.3}, past the gap end {:.3}",
                        s.end, gap.end
                    )));
                }
                if s.end - s.start > max_span + TIME_EPSILON {
                    return Err(RelayError::MalformedResponse(format!(
                        "suggestion {:.3}-{:.3} exceeds the {}s span limit",
                        s.start, s.end, max_span
                    )));
                }

                cursor = s.end;
                idx += 1;
                count += 1;
            }

            if !close(cursor, gap.end) {
                return Err(RelayError::MalformedResponse(format!(
                    "suggestions stop at {:.3}, short of the gap end {:.3}",
                    cursor, gap.end
                )));
            }

            let duration = gap.end - gap.start;
            if duration <= max_span + TIME_EPSILON {
                if count != 1 {
                    return Err(RelayError::MalformedResponse(format!(
                        "gap of {:.3}s must be covered by exactly one suggestion, got {}",
                        duration, count
                    )));
                }
            } else if count < 2 {
                return Err(RelayError::MalformedResponse(format!(
                    "gap of {:.3}s must be split into multiple suggestions",
                    duration
                )));
            }
        }

        if idx != suggestions.len() {
            return Err(RelayError::MalformedResponse(format!(
                "{} suggestions left over after covering all gaps",
                suggestions.len() - idx
            )));
        }

        Ok(())
    }
}
