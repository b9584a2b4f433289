//! API data models

use serde::Deserialize;

use crate::gapfill::Gap;

/// Request body for POST /transcribe
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    /// Local path of the audio file to transcribe
    pub audio_path: String,
}

/// Request body for POST /fill-gaps
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillGapsRequest {
    /// Transcript text giving the model context around the gaps
    pub transcript: String,

    /// Silent spans to fill, in timeline order
    pub gaps: Vec<Gap>,

    /// Optional destination for the rendered subtitle file. Relative paths
    /// land under the configured output directory.
    #[serde(default)]
    pub output_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcribe_request_uses_camel_case() {
        let request: TranscribeRequest =
            serde_json::from_str(r#"{"audioPath": "/tmp/clip.mp3"}"#).unwrap();
        assert_eq!(request.audio_path, "/tmp/clip.mp3");
    }

    #[test]
    fn test_fill_gaps_request_output_path_is_optional() {
        let request: FillGapsRequest = serde_json::from_str(
            r#"{"transcript": "hello", "gaps": [{"start": 1.0, "end": 4.0}]}"#,
        )
        .unwrap();

        assert_eq!(request.gaps.len(), 1);
        assert!(request.output_path.is_none());
    }
}
