//! Remote transcription client
//!
//! Uploads audio files to a Whisper-compatible HTTP API and normalizes the
//! verbose JSON reply into a transcript with timed segments. Uploads are
//! idempotent, so transient failures get a bounded number of retries.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TranscriptionConfig;
use crate::{RelayError, Result};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// A single timed span of transcribed speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Full transcription output: complete text plus timed segments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

// Wire shapes. The upstream omits fields depending on response_format, so
// everything stays optional until conversion.
#[derive(Debug, Deserialize)]
struct RawTranscription {
    text: Option<String>,
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: f64,
    text: String,
}

// A reply that lied about its body keeps the status it arrived with, so the
// retry policy can tell it apart from a transport failure.
fn from_raw(raw: RawTranscription, status: u16) -> Result<TranscriptionResult> {
    let text = raw.text.ok_or_else(|| RelayError::Upstream {
        message: "transcription response missing text field".to_string(),
        status: Some(status),
    })?;

    let segments = raw
        .segments
        .into_iter()
        .map(|s| TranscriptSegment {
            start: s.start,
            end: s.end,
            text: s.text.trim().to_string(),
        })
        .collect();

    Ok(TranscriptionResult { text, segments })
}

/// Client for the remote transcription API
pub struct TranscriptionClient {
    config: TranscriptionConfig,
    api_key: String,
    client: reqwest::Client,
}

impl TranscriptionClient {
    pub fn new(config: TranscriptionConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RelayError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    /// Transcribe an audio file through the remote API.
    ///
    /// The file must exist locally. Transient upstream failures are retried
    /// up to the configured limit before the error surfaces.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionResult> {
        if !audio_path.is_file() {
            return Err(RelayError::FileNotFound(audio_path.to_path_buf()));
        }

        let mut attempt = 0;
        loop {
            match self.transcribe_once(audio_path).await {
                Ok(result) => {
                    info!(
                        "✅ Transcribed {}: {} segments",
                        audio_path.display(),
                        result.segments.len()
                    );
                    return Ok(result);
                }
                Err(e) if attempt < self.config.max_retries && e.is_transient() => {
                    attempt += 1;
                    warn!(
                        "⚠️ Transcription attempt {}/{} failed: {}",
                        attempt,
                        self.config.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn transcribe_once(&self, audio_path: &Path) -> Result<TranscriptionResult> {
        let form = self.build_form(audio_path).await?;

        debug!(
            "Uploading {} to {}",
            audio_path.display(),
            self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError::from_request(e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                message: format!("transcription API error {}: {}", status, text),
                status: Some(status.as_u16()),
            });
        }

        let raw: RawTranscription = response.json().await.map_err(|e| RelayError::Upstream {
            message: format!("transcription response is not JSON: {}", e),
            status: Some(status.as_u16()),
        })?;

        from_raw(raw, status.as_u16())
    }

    // The form is rebuilt per attempt since a multipart body cannot be reused.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|_| RelayError::FileNotFound(audio_path.to_path_buf()))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| RelayError::InvalidInput(format!("invalid mime type: {}", e)))?;

        Ok(Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone())
            .text("response_format", self.config.response_format.clone())
            .text("temperature", self.config.temperature.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_from_raw_verbose_json() {
        let raw: RawTranscription = serde_json::from_str(
            r#"{
                "task": "transcribe",
                "language": "en",
                "duration": 3.2,
                "text": "hello world",
                "segments": [
                    {
                        "id": 0,
                        "seek": 0,
                        "start": 0.0,
                        "end": 1.6,
                        "text": " hello",
                        "no_speech_prob": 0.01
                    },
                    {
                        "id": 1,
                        "seek": 0,
                        "start": 1.6,
                        "end": 3.2,
                        "text": " world",
                        "no_speech_prob": 0.02
                    }
                ]
            }"#,
        )
        .unwrap();

        let result = from_raw(raw, 200).unwrap();

        assert_eq!(result.text, "hello world");
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].text, "hello");
        assert_eq!(result.segments[1].start, 1.6);
    }

    #[test]
    fn test_from_raw_without_segments() {
        let raw: RawTranscription = serde_json::from_str(r#"{"text": "short clip"}"#).unwrap();

        let result = from_raw(raw, 200).unwrap();
        assert_eq!(result.text, "short clip");
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_from_raw_missing_text_is_upstream_error() {
        let raw: RawTranscription = serde_json::from_str(r#"{"segments": []}"#).unwrap();

        assert!(matches!(
            from_raw(raw, 200),
            Err(RelayError::Upstream {
                status: Some(200),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_transcribe_missing_file() {
        let config = Config::default();
        let client = TranscriptionClient::new(config.transcription, "test-key").unwrap();

        let result = client
            .transcribe(Path::new("/nonexistent/audio.mp3"))
            .await;

        assert!(matches!(result, Err(RelayError::FileNotFound(_))));
    }

    // Local stand-in for the transcription API with a fixed answer and a
    // request counter, for exercising the retry policy end to end.
    async fn scripted_upstream(
        status: StatusCode,
        body: &'static str,
        hits: Arc<AtomicU32>,
    ) -> String {
        let app = Router::new().route(
            "/transcribe",
            post(move || {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/transcribe", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        endpoint
    }

    fn client_for(endpoint: String) -> TranscriptionClient {
        let mut config = Config::default().transcription;
        config.endpoint = endpoint;
        TranscriptionClient::new(config, "test-key").unwrap()
    }

    fn test_audio(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("clip.mp3");
        std::fs::write(&path, b"not really audio").unwrap();
        path
    }

    #[tokio::test]
    async fn test_success_reply_missing_text_is_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let endpoint =
            scripted_upstream(StatusCode::OK, r#"{"segments": []}"#, Arc::clone(&hits)).await;

        let dir = tempfile::tempdir().unwrap();
        let result = client_for(endpoint).transcribe(&test_audio(&dir)).await;

        assert!(matches!(
            result,
            Err(RelayError::Upstream {
                status: Some(200),
                ..
            })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let endpoint =
            scripted_upstream(StatusCode::BAD_REQUEST, "no file field", Arc::clone(&hits)).await;

        let dir = tempfile::tempdir().unwrap();
        let result = client_for(endpoint).transcribe(&test_audio(&dir)).await;

        assert!(matches!(
            result,
            Err(RelayError::Upstream {
                status: Some(400),
                ..
            })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_to_the_limit() {
        let hits = Arc::new(AtomicU32::new(0));
        let endpoint =
            scripted_upstream(StatusCode::SERVICE_UNAVAILABLE, "overloaded", Arc::clone(&hits))
                .await;

        let dir = tempfile::tempdir().unwrap();
        let result = client_for(endpoint).transcribe(&test_audio(&dir)).await;

        assert!(matches!(
            result,
            Err(RelayError::Upstream {
                status: Some(503),
                ..
            })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
