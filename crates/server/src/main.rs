use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use espada_core::{
    load_config, validate_config, CatalogSource, ContentResolver, HttpPageFetcher,
    LibrqbitSwarmClient, PageFetcher, SiteCatalog, StreamService, StreamSettings, SwarmClient,
};
use espada_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ESPADA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Listing URL: {}", config.source.listing_url);
    info!("Public URL: {}", config.server.public_url);

    // Remote site access shared by the catalog and the resolver
    let fetcher: Arc<dyn PageFetcher> = Arc::new(
        HttpPageFetcher::new(&config.source).context("Failed to create page fetcher")?,
    );

    let catalog: Arc<dyn CatalogSource> = Arc::new(
        SiteCatalog::new(Arc::clone(&fetcher), &config.source.listing_url)
            .context("Failed to create catalog source")?,
    );

    let resolver = ContentResolver::new(Arc::clone(&fetcher), config.trackers.baseline.clone());

    // Embedded swarm client
    info!(
        "Initializing embedded librqbit client (scratch path: {})",
        config.swarm.download_path.display()
    );
    let swarm: Arc<dyn SwarmClient> = Arc::new(
        LibrqbitSwarmClient::new(&config.swarm)
            .await
            .context("Failed to initialize swarm client")?,
    );

    let streams = StreamService::new(resolver, swarm, StreamSettings::from_config(&config));

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), catalog, streams));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);
    info!("Manifest: {}/manifest.json", config.server.public_url.trim_end_matches('/'));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
