use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod tts;

use api::routes::{create_router, AppState};
use config::Config;
use tts::{EspeakEngine, GoogleTts, TtsService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = config.bind_addr().parse()?;

    tracing::info!("TTS API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);
    tracing::info!(
        tld = %config.gtts_tld,
        espeak = %config.espeak_bin,
        base_rate = config.espeak_base_rate,
        "Engines configured"
    );

    let google = GoogleTts::new(&config.gtts_tld, config.gtts_timeout)?;
    let espeak = EspeakEngine::new(config.espeak_bin.clone(), config.espeak_base_rate);
    let tts = TtsService::new(Arc::new(google), Arc::new(espeak));

    let state = Arc::new(AppState { tts });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
