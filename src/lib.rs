//! caption-relay - HTTP relay for audio transcription and subtitle generation
//!
//! Forwards audio files to a remote Whisper-compatible transcription API,
//! sends the transcript to a chat-completion API for topic segmentation,
//! renders the timed segments as subtitle blocks and fills timeline gaps
//! with generated filler content.

pub mod api;
pub mod chat;
pub mod config;
pub mod gapfill;
pub mod payload;
pub mod prompts;
pub mod subtitle;
pub mod topics;
pub mod transcription;

// Re-export main types for easy access
pub use crate::chat::{ChatCompletion, ChatMessage, GroqChatClient};
pub use crate::config::Config;
pub use crate::gapfill::{Gap, GapFiller, Suggestion};
pub use crate::subtitle::{format_timestamp, parse_timestamp};
pub use crate::topics::{Topic, TopicExtractor};
pub use crate::transcription::{TranscriptSegment, TranscriptionClient, TranscriptionResult};

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error types for relay operations
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio file not readable: {0}")]
    FileNotFound(std::path::PathBuf),

    #[error("upstream request failed: {message}")]
    Upstream {
        message: String,
        /// HTTP status of the upstream answer, `None` when the request never
        /// produced one (connect or transport failure).
        status: Option<u16>,
    },

    #[error("upstream request timed out after {0}s")]
    UpstreamTimeout(u64),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("invalid timestamp value: {0}")]
    InvalidTimestamp(f64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl RelayError {
    /// Classify an outbound request failure, separating timeouts from the rest.
    pub(crate) fn from_request(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            RelayError::UpstreamTimeout(timeout_secs)
        } else {
            RelayError::Upstream {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
            }
        }
    }

    /// Whether a failed upstream call is worth retrying on an idempotent path.
    ///
    /// Timeouts, transport failures and 5xx answers qualify. A deliberate 4xx
    /// refusal or a success response with a broken body will not get better
    /// on a resend.
    pub fn is_transient(&self) -> bool {
        match self {
            RelayError::UpstreamTimeout(_) => true,
            RelayError::Upstream { status: None, .. } => true,
            RelayError::Upstream {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }
}
