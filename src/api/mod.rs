//! HTTP API for the caption relay
//!
//! Exposes transcription, topic segmentation and gap filling as REST
//! endpoints for the upstream application.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::Result;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::AppState;

/// API server for handling relay requests
pub struct ApiServer {
    config: Arc<Config>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Start the API server in the background
    pub fn start_background(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start().await })
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!(
            "🚀 Starting API server on port {}",
            self.config.server.port
        );

        server::start_http_server(self.config).await
    }
}
