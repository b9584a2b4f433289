//! HTTP server implementation for the API

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers;
use super::models::{FillGapsRequest, TranscribeRequest};
use crate::chat::{ChatCompletion, GroqChatClient};
use crate::config::Config;
use crate::gapfill::GapFiller;
use crate::topics::TopicExtractor;
use crate::transcription::TranscriptionClient;
use crate::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub transcriber: Arc<TranscriptionClient>,
    pub topics: Arc<TopicExtractor>,
    pub gapfill: Arc<GapFiller>,
    pub limiter: Arc<Semaphore>,
}

impl AppState {
    /// Wire up the relay components from configuration.
    ///
    /// Fails when the upstream credential is missing so the server never
    /// starts half-configured.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        let chat: Arc<dyn ChatCompletion> =
            Arc::new(GroqChatClient::new(config.chat.clone(), api_key.clone())?);
        let transcriber = Arc::new(TranscriptionClient::new(
            config.transcription.clone(),
            api_key,
        )?);
        let topics = Arc::new(TopicExtractor::new(
            Arc::clone(&chat),
            config.chat.max_retries,
        ));
        let gapfill = Arc::new(GapFiller::new(chat, config.gapfill.clone()));
        let limiter = Arc::new(Semaphore::new(config.server.max_concurrent_requests));

        Ok(Self {
            config,
            transcriber,
            topics,
            gapfill,
            limiter,
        })
    }
}

/// Configure and start the HTTP server
pub async fn start_http_server(config: Arc<Config>) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::from_config(config)?;
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 API server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all relay routes and middleware
pub fn router(state: AppState) -> Router {
    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/transcribe", post(transcribe_handler))
        .route("/fill-gaps", post(fill_gaps_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    match handlers::health_check().await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Transcription pipeline handler
async fn transcribe_handler(
    State(state): State<AppState>,
    Json(request): Json<TranscribeRequest>,
) -> impl IntoResponse {
    match handlers::transcribe(&state, request).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            warn!("Transcription request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Gap filling handler
async fn fill_gaps_handler(
    State(state): State<AppState>,
    Json(request): Json<FillGapsRequest>,
) -> impl IntoResponse {
    match handlers::fill_gaps(&state, request).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            warn!("Gap fill request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::RelayError;

    #[test]
    fn test_from_config_requires_credential() {
        let config = Arc::new(Config::default());

        assert!(matches!(
            AppState::from_config(config),
            Err(RelayError::MissingCredential("GROQ_API_KEY"))
        ));
    }

    #[test]
    fn test_from_config_wires_components() {
        let config = Arc::new(ConfigBuilder::new().with_api_key("test-key").build());

        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.limiter.available_permits(), num_cpus::get().min(8));
    }
}
