//! API request handlers

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use super::models::{FillGapsRequest, TranscribeRequest};
use super::server::AppState;
use crate::config::Config;
use crate::transcription::TranscriptionResult;
use crate::{subtitle, Result};

/// Handle health check requests
pub async fn health_check() -> Result<Value> {
    Ok(serde_json::json!({
        "status": "healthy",
        "service": "caption-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Run the full pipeline for one audio file: transcribe, render subtitles,
/// then segment the transcript into topics.
///
/// All-or-nothing: any failing stage fails the whole request.
pub async fn transcribe(state: &AppState, request: TranscribeRequest) -> Result<Value> {
    // Acquire fails only after close(), which the serving path never calls.
    let _permit = state
        .limiter
        .acquire()
        .await
        .expect("request limiter is never closed");

    info!("🎙️ Transcribing {}", request.audio_path);

    let audio_path = PathBuf::from(&request.audio_path);
    let transcription = state.transcriber.transcribe(&audio_path).await?;

    assemble_transcription_response(state, &audio_path, transcription).await
}

/// Render, persist and package a finished transcription.
///
/// The subtitle file lands in the configured output directory, named after
/// the audio file it came from.
pub(crate) async fn assemble_transcription_response(
    state: &AppState,
    audio_path: &Path,
    transcription: TranscriptionResult,
) -> Result<Value> {
    let subtitles = subtitle::render_segments(&transcription.segments)?;
    let topics = state.topics.extract_topics(&transcription).await?;

    let stem = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcription".to_string());
    let subtitle_path = state.config.output.base_dir.join(format!("{}.srt", stem));
    subtitle::write_subtitle_file(&subtitle_path, &subtitles).await?;

    Ok(serde_json::json!({
        "transcription": transcription,
        "topics": topics,
        "subtitles": subtitles,
    }))
}

/// Generate filler captions for silent gaps in an existing transcript.
pub async fn fill_gaps(state: &AppState, request: FillGapsRequest) -> Result<Value> {
    let _permit = state
        .limiter
        .acquire()
        .await
        .expect("request limiter is never closed");

    info!("🔇 Filling {} gaps", request.gaps.len());

    let output_path = request
        .output_path
        .map(|p| resolve_output_path(&state.config, p));

    let subtitles = state
        .gapfill
        .fill_gaps(&request.transcript, &request.gaps, output_path.as_deref())
        .await?;

    let mut body = serde_json::json!({ "subtitles": subtitles });
    if let Some(path) = output_path {
        body["outputPath"] = Value::String(path.display().to_string());
    }

    Ok(body)
}

fn resolve_output_path(config: &Config, raw: String) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        config.output.base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatCompletion, ChatMessage};
    use crate::config::ConfigBuilder;
    use crate::gapfill::GapFiller;
    use crate::topics::TopicExtractor;
    use crate::transcription::{TranscriptSegment, TranscriptionClient};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    struct ScriptedChat {
        reply: String,
    }

    #[async_trait]
    impl ChatCompletion for ScriptedChat {
        async fn complete(&self, _messages: Vec<ChatMessage>) -> crate::Result<String> {
            Ok(self.reply.clone())
        }
    }

    fn scripted_state(reply: &str, output_dir: &Path) -> AppState {
        let config = Arc::new(
            ConfigBuilder::new()
                .with_api_key("test-key")
                .with_output_dir(output_dir.to_path_buf())
                .build(),
        );
        let chat: Arc<dyn ChatCompletion> = Arc::new(ScriptedChat {
            reply: reply.to_string(),
        });

        AppState {
            transcriber: Arc::new(
                TranscriptionClient::new(config.transcription.clone(), "test-key").unwrap(),
            ),
            topics: Arc::new(TopicExtractor::new(Arc::clone(&chat), 0)),
            gapfill: Arc::new(GapFiller::new(chat, config.gapfill.clone())),
            limiter: Arc::new(Semaphore::new(2)),
            config,
        }
    }

    #[tokio::test]
    async fn test_assembled_response_writes_subtitle_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = scripted_state(
            r#"{"topics": [{"topic": "Greeting", "start": 0.0, "end": 1.5}]}"#,
            dir.path(),
        );
        let transcription = TranscriptionResult {
            text: "hello world".to_string(),
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: 1.5,
                text: "hello world".to_string(),
            }],
        };

        let body = assemble_transcription_response(
            &state,
            Path::new("/media/episode-1.mp3"),
            transcription,
        )
        .await
        .unwrap();

        assert_eq!(body["transcription"]["text"], "hello world");
        assert_eq!(body["topics"][0]["topic"], "Greeting");
        assert_eq!(
            body["subtitles"],
            "00:00:00,000 --> 00:00:01,500\nhello world"
        );

        let written = std::fs::read_to_string(dir.path().join("episode-1.srt")).unwrap();
        assert_eq!(written, "00:00:00,000 --> 00:00:01,500\nhello world");
    }

    #[tokio::test]
    async fn test_assembled_response_fails_on_bad_topic_payload() {
        let dir = tempfile::tempdir().unwrap();
        let state = scripted_state("not json at all", dir.path());
        let transcription = TranscriptionResult {
            text: "hello".to_string(),
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: 1.0,
                text: "hello".to_string(),
            }],
        };

        let err = assemble_transcription_response(&state, Path::new("clip.mp3"), transcription)
            .await
            .unwrap_err();

        assert!(matches!(err, crate::RelayError::MalformedResponse(_)));
        assert!(!dir.path().join("clip.srt").exists());
    }

    #[tokio::test]
    #[should_panic(expected = "request limiter")]
    async fn test_closed_limiter_refuses_to_serve() {
        let dir = tempfile::tempdir().unwrap();
        let state = scripted_state("{}", dir.path());
        state.limiter.close();

        let _ = transcribe(
            &state,
            TranscribeRequest {
                audio_path: "/nonexistent/clip.mp3".to_string(),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn test_health_check_shape() {
        let health = health_check().await.unwrap();

        assert_eq!(health["status"], "healthy");
        assert_eq!(health["service"], "caption-relay");
        assert!(health["timestamp"].is_string());
    }

    #[test]
    fn test_relative_output_path_lands_in_base_dir() {
        let config = ConfigBuilder::new()
            .with_output_dir(PathBuf::from("/var/captions"))
            .build();

        let resolved = resolve_output_path(&config, "episode-1.srt".to_string());
        assert_eq!(resolved, PathBuf::from("/var/captions/episode-1.srt"));
    }

    #[test]
    fn test_absolute_output_path_is_kept() {
        let config = ConfigBuilder::new().build();

        let resolved = resolve_output_path(&config, "/tmp/out.srt".to_string());
        assert_eq!(resolved, PathBuf::from("/tmp/out.srt"));
    }
}
