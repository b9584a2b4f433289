use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use caption_relay::api::ApiServer;
use caption_relay::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_level =
        std::env::var("CAPTION_RELAY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(format!("caption_relay={},warn", log_level))
        .init();

    let matches = Command::new("Caption Relay")
        .version("0.1.0")
        .about("HTTP relay for audio transcription, topic segmentation and subtitle gap filling")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a configuration file"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDR")
                .help("Bind address for the HTTP server (overrides config)"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Listen port (overrides config)"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Maximum concurrent requests (overrides config)"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for generated subtitle files (overrides config)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration. An explicit --config path must parse; the default
    // search falls back to built-in settings.
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = matches.get_one::<String>("port") {
        config.server.port = port.parse()?;
    }
    if let Some(workers) = matches.get_one::<String>("workers") {
        config.server.max_concurrent_requests = workers.parse()?;
    }
    if let Some(output_dir) = matches.get_one::<String>("output-dir") {
        config.output.base_dir = PathBuf::from(output_dir);
    }

    config.validate()?;

    if matches.get_flag("verbose") {
        info!("{}", config.summary());
    }

    // The relay cannot do anything without an upstream credential, so bail
    // out before binding the listener.
    if let Err(e) = config.require_api_key() {
        error!("❌ {}", e);
        return Err(e.into());
    }

    info!("🚀 Caption Relay starting...");
    info!(
        "🌐 Bind address: {}:{}",
        config.server.host, config.server.port
    );
    info!("🎙️ Transcription model: {}", config.transcription.model);
    info!("💬 Chat model: {}", config.chat.model);
    info!(
        "🔧 Concurrent requests: {}",
        config.server.max_concurrent_requests
    );
    info!("📂 Output directory: {}", config.output.base_dir.display());

    ApiServer::new(Arc::new(config)).start().await?;

    Ok(())
}
