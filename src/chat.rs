//! Chat completion client
//!
//! One upstream provider speaking the OpenAI chat-completion wire format.
//! The trait keeps callers independent of the HTTP layer so topic
//! extraction and gap filling can run against scripted backends in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ChatConfig;
use crate::{RelayError, Result};

/// Chat message for upstream communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for chat completion backends
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send a conversation upstream and return the assistant's reply text.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;
}

/// Chat client for the Groq OpenAI-compatible API
pub struct GroqChatClient {
    config: ChatConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl GroqChatClient {
    pub fn new(config: ChatConfig, api_key: impl Into<String>) -> Result<Self> {
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
}

#[async_trait]
impl ChatCompletion for GroqChatClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending chat request to {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::from_request(e, self.config.timeout_seconds))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                message: format!("chat API error {}: {}", status, text),
                status: Some(status.as_u16()),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            RelayError::MalformedResponse(format!("chat response is not JSON: {}", e))
        })?;

        let content = chat_response
            .choices
            .first()
            .ok_or_else(|| {
                RelayError::MalformedResponse("chat response has no choices".to_string())
            })?
            .message
            .content
            .clone();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let system = ChatMessage::system("be brief");
        let user = ChatMessage::user("hello");

        assert_eq!(system.role, "system");
        assert_eq!(user.role, "user");
        assert_eq!(user.content, "hello");
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 64,
            temperature: 0.0,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama-3.3-70b-versatile");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 64);
    }
}
