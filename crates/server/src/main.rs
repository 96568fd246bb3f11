use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swarmprobe_core::{
    ensure_databases, load_config, validate_config, AnnounceClient, Enricher, HttpTrackerList,
    LibrqbitMetadataFetcher, MainlineEngineFactory, MaxmindEnricher, MetadataFetcher,
    ProbeController, ProbeDeps, ProbeStore, SqliteProbeStore,
};
use swarmprobe_server::{api::create_router, state::AppState};

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
    let config_path = std::env::var("SWARMPROBE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Create SQLite probe store
    let store: Arc<dyn ProbeStore> = Arc::new(
        SqliteProbeStore::new(&config.database.path).context("Failed to create probe store")?,
    );
    info!("Probe store initialized");

    // Enrichment tables are required: every persisted peer carries a location
    ensure_databases(&config.geoip)
        .await
        .context("Failed to download GeoIP databases")?;
    let enricher: Arc<dyn Enricher> = Arc::new(
        MaxmindEnricher::open(&config.geoip).context("Failed to open GeoIP databases")?,
    );
    info!(
        "GeoIP databases loaded (city: {:?}, asn: {:?})",
        config.geoip.city_db, config.geoip.asn_db
    );

    let announcer = AnnounceClient::new(config.probe.announce_timeout())
        .context("Failed to create announce client")?;
    let tracker_list = HttpTrackerList::new(
        config.probe.tracker_list_url.clone(),
        config.probe.tracker_list_timeout(),
    )
    .context("Failed to create tracker list client")?;

    // Metadata is best-effort; tracker rounds still record peers without it
    let metadata: Option<Arc<dyn MetadataFetcher>> = if config.metadata.enabled {
        match LibrqbitMetadataFetcher::new(&config.metadata).await {
            Ok(fetcher) => {
                info!("Metadata fetcher initialized");
                Some(Arc::new(fetcher))
            }
            Err(e) => {
                warn!("Failed to initialize metadata fetcher, continuing without: {}", e);
                None
            }
        }
    } else {
        info!("Metadata fetching disabled in config");
        None
    };

    let deps = ProbeDeps {
        store: Arc::clone(&store),
        enricher,
        engines: Arc::new(MainlineEngineFactory),
        announcer: Arc::new(announcer),
        tracker_list: Arc::new(tracker_list),
        metadata,
    };
    let controller = Arc::new(ProbeController::new(config.probe.clone(), deps));

    if let Some(outcome) = controller
        .autostart()
        .await
        .context("Failed to autostart probe session")?
    {
        info!("Autostart: {:?}", outcome);
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&controller),
        store,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    let outcome = controller.stop().await;
    info!("Probe session: {:?}", outcome);

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
