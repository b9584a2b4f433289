//! Prompt construction for the chat completion API
//!
//! Both tasks demand a bare JSON object back. The instructions spell out the
//! exact shape because the downstream parsers are strict and reject anything
//! with commentary around it.

use crate::chat::ChatMessage;
use crate::gapfill::Gap;
use crate::transcription::TranscriptionResult;
use crate::{RelayError, Result};

pub const TOPIC_SYSTEM_PROMPT: &str =
    "You are an AI that extracts structured topic-based segments from transcripts.";

pub const GAPFILL_SYSTEM_PROMPT: &str =
    "You are an AI that writes natural filler captions for silent gaps in a transcript.";

const TOPIC_FORMAT: &str = r#"{
  "topics": [
    {
      "topic": "Topic Name",
      "start": start_time_in_seconds,
      "end": end_time_in_seconds
    }
  ]
}"#;

const SUGGESTION_FORMAT: &str = r#"{
  "suggestions": [
    {
      "suggestion": "Filler text",
      "start": start_time_in_seconds,
      "end": end_time_in_seconds
    }
  ]
}"#;

/// Build the conversation for topic extraction over a transcription result.
pub fn topic_messages(transcription: &TranscriptionResult) -> Result<Vec<ChatMessage>> {
    let transcription_json = serde_json::to_string(transcription)
        .map_err(|e| RelayError::InvalidInput(format!("cannot serialize transcript: {}", e)))?;

    let user = format!(
        "Analyze the following transcript and segment it into topics. \
         Return ONLY a JSON object formatted as follows:\n\n\
         ```json\n{TOPIC_FORMAT}\n```\n\n\
         Ensure timestamps are in seconds and numbers are correctly formatted as floats. \
         Do not include any explanations or extra text.{transcription_json}"
    );

    Ok(vec![
        ChatMessage::system(TOPIC_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ])
}

/// Build the conversation for filling silent gaps with caption suggestions.
pub fn gapfill_messages(
    transcript: &str,
    gaps: &[Gap],
    max_suggestion_seconds: f64,
) -> Result<Vec<ChatMessage>> {
    let gaps_json = serde_json::to_string(gaps)
        .map_err(|e| RelayError::InvalidInput(format!("cannot serialize gaps: {}", e)))?;

    let user = format!(
        "The following transcript has silent gaps that need filler captions.\n\n\
         Transcript:\n{transcript}\n\n\
         Gaps (seconds):\n{gaps_json}\n\n\
         Return ONLY a JSON object formatted as follows:\n\n\
         ```json\n{SUGGESTION_FORMAT}\n```\n\n\
         Every gap must be covered exactly. A gap of {max_suggestion_seconds} seconds or less \
         gets exactly one suggestion spanning the whole gap. A longer gap must be split into \
         consecutive suggestions of at most {max_suggestion_seconds} seconds each: the first \
         starts at the gap start, each next one starts where the previous ended, and the last \
         ends at the gap end. Keep suggestions for short gaps concise and give longer gaps \
         fuller descriptions. \
         Ensure timestamps are in seconds and numbers are correctly formatted as floats. \
         Do not include any explanations or extra text."
    );

    Ok(vec![
        ChatMessage::system(GAPFILL_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptSegment;

    #[test]
    fn test_topic_messages_embed_transcription_json() {
        let transcription = TranscriptionResult {
            text: "hello world".to_string(),
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: 1.5,
                text: "hello world".to_string(),
            }],
        };

        let messages = topic_messages(&transcription).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, TOPIC_SYSTEM_PROMPT);
        assert!(messages[1].content.contains("\"topics\""));
        assert!(messages[1].content.contains("\"hello world\""));
        assert!(messages[1].content.contains("Do not include any explanations"));
    }

    #[test]
    fn test_gapfill_messages_embed_gap_bounds() {
        let gaps = vec![Gap {
            start: 10.0,
            end: 30.0,
        }];

        let messages = gapfill_messages("some transcript", &gaps, 5.0).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, GAPFILL_SYSTEM_PROMPT);
        assert!(messages[1].content.contains("some transcript"));
        assert!(messages[1].content.contains("\"start\":10.0"));
        assert!(messages[1].content.contains("5 seconds or less"));
    }
}
