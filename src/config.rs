use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{RelayError, Result};

/// Configuration for the caption relay service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API key for the upstream provider (overridden by GROQ_API_KEY)
    pub api_key: Option<String>,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Transcription service settings
    pub transcription: TranscriptionConfig,

    /// Chat completion settings
    pub chat: ChatConfig,

    /// Gap filler settings
    pub gapfill: GapfillConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Maximum number of requests processed at once
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Endpoint of the Whisper-compatible transcription API
    pub endpoint: String,

    /// Model to use for transcription
    pub model: String,

    /// Language hint for transcription
    pub language: String,

    /// Response format requested from the API
    pub response_format: String,

    /// Temperature setting (0.0 = deterministic)
    pub temperature: f32,

    /// Timeout for transcription requests (seconds)
    pub timeout_seconds: u64,

    /// Maximum retries for failed uploads
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Endpoint of the chat completion API
    pub endpoint: String,

    /// Model to use for chat completions
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Timeout for chat requests (seconds)
    pub timeout_seconds: u64,

    /// Maximum retries for failed topic extractions
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapfillConfig {
    /// Longest span a single filler cue may cover (seconds)
    pub max_suggestion_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base directory for generated subtitle files
    pub base_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Config {
    /// Load configuration from file, then apply environment overrides.
    ///
    /// Missing or unparseable candidates are skipped; with no usable file
    /// the configuration is built from defaults and the environment alone.
    pub fn load() -> Self {
        // Try to load from various locations
        let config_paths = [
            "caption-relay.toml",
            "config/caption-relay.toml",
            "~/.config/caption-relay/config.toml",
            "/etc/caption-relay/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env_overrides();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Self::from_env()
    }

    /// Load configuration from an explicit file path
    pub fn load_from(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&config_str)
            .map_err(|e| RelayError::Configuration(format!("cannot parse {}: {}", path, e)))?;

        tracing::info!("📄 Loaded configuration from: {}", path);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Build configuration from defaults and environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CAPTION_RELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("CAPTION_RELAY_PORT") {
            self.server.port = port.parse().unwrap_or(self.server.port);
        }

        if let Ok(workers) = std::env::var("CAPTION_RELAY_WORKERS") {
            self.server.max_concurrent_requests =
                workers.parse().unwrap_or(self.server.max_concurrent_requests);
        }

        if let Ok(output_dir) = std::env::var("CAPTION_RELAY_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = std::env::var("CAPTION_RELAY_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(api_key) = std::env::var("GROQ_API_KEY") {
            self.api_key = Some(api_key);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| RelayError::Configuration(format!("cannot serialize config: {}", e)))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// The upstream API key, required before any request leaves the process
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(RelayError::MissingCredential("GROQ_API_KEY"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(RelayError::Configuration(
                "server.port must be greater than 0".to_string(),
            ));
        }

        if self.server.max_concurrent_requests == 0 {
            return Err(RelayError::Configuration(
                "server.max_concurrent_requests must be greater than 0".to_string(),
            ));
        }

        for (name, endpoint) in [
            ("transcription.endpoint", &self.transcription.endpoint),
            ("chat.endpoint", &self.chat.endpoint),
        ] {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(RelayError::Configuration(format!(
                    "{} must be an http(s) URL",
                    name
                )));
            }
        }

        for (name, timeout) in [
            ("transcription.timeout_seconds", self.transcription.timeout_seconds),
            ("chat.timeout_seconds", self.chat.timeout_seconds),
        ] {
            if timeout == 0 {
                return Err(RelayError::Configuration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        if self.gapfill.max_suggestion_seconds <= 0.0 {
            return Err(RelayError::Configuration(
                "gapfill.max_suggestion_seconds must be positive".to_string(),
            ));
        }

        if !self.output.base_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.output.base_dir) {
                return Err(RelayError::Configuration(format!(
                    "cannot create output directory: {}",
                    e
                )));
            }
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Caption Relay Configuration:\n\
            - Bind Address: {}:{}\n\
            - Concurrent Requests: {}\n\
            - Transcription Model: {}\n\
            - Chat Model: {}\n\
            - Max Filler Span: {}s\n\
            - Output Directory: {}",
            self.server.host,
            self.server.port,
            self.server.max_concurrent_requests,
            self.transcription.model,
            self.chat.model,
            self.gapfill.max_suggestion_seconds,
            self.output.base_dir.display()
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                max_concurrent_requests: num_cpus::get().min(8),
            },
            transcription: TranscriptionConfig {
                endpoint: "https://api.groq.com/openai/v1/audio/transcriptions".to_string(),
                model: "whisper-large-v3-turbo".to_string(),
                language: "en".to_string(),
                response_format: "verbose_json".to_string(),
                temperature: 0.0,
                timeout_seconds: 300, // large uploads take a while
                max_retries: 2,
            },
            chat: ChatConfig {
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                max_tokens: 2048,
                temperature: 0.0,
                timeout_seconds: 120,
                max_retries: 2,
            },
            gapfill: GapfillConfig {
                max_suggestion_seconds: 5.0,
            },
            output: OutputConfig {
                base_dir: PathBuf::from("./output"),
                log_level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.config.server.max_concurrent_requests = limit;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    pub fn with_transcription_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.transcription.endpoint = endpoint.into();
        self
    }

    pub fn with_chat_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.chat.endpoint = endpoint.into();
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_max_suggestion_seconds(mut self, seconds: f64) -> Self {
        self.config.gapfill.max_suggestion_seconds = seconds;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
