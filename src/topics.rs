//! Topic extraction over chat completions
//!
//! Sends the transcription to the chat model and parses the structured
//! topic list out of its reply. Transport failures are retried, but a reply
//! that parses wrong is final since resending rarely fixes model output.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chat::ChatCompletion;
use crate::transcription::TranscriptionResult;
use crate::{payload, prompts, Result};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// A topic-based span of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub topic: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Deserialize)]
struct TopicEnvelope {
    topics: Vec<Topic>,
}

fn parse_topics(content: &str) -> Result<Vec<Topic>> {
    let envelope: TopicEnvelope = payload::parse_json_payload(content)?;
    Ok(envelope.topics)
}

/// Segments transcripts into topics via a chat completion backend
pub struct TopicExtractor {
    chat: Arc<dyn ChatCompletion>,
    max_retries: u32,
}

impl TopicExtractor {
    pub fn new(chat: Arc<dyn ChatCompletion>, max_retries: u32) -> Self {
        Self { chat, max_retries }
    }

    /// Ask the chat model to segment a transcription into topics.
    pub async fn extract_topics(&self, transcription: &TranscriptionResult) -> Result<Vec<Topic>> {
        let messages = prompts::topic_messages(transcription)?;

        let mut attempt = 0;
        let content = loop {
            match self.chat.complete(messages.clone()).await {
                Ok(content) => break content,
                Err(e) if attempt < self.max_retries && e.is_transient() => {
                    attempt += 1;
                    warn!(
                        "⚠️ Topic extraction attempt {}/{} failed: {}",
                        attempt,
                        self.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        };

        let topics = parse_topics(&content)?;
        info!("🧩 Extracted {} topics", topics.len());

        Ok(topics)
    }
}
