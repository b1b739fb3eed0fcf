use anyhow::{Context, Result};
use fleetwatch::agreement::AgreementStore;
use fleetwatch::api::{
    create_provisioning_router, create_telemetry_router, ProvisioningAppState, TelemetryAppState,
};
use fleetwatch::config::{self, FleetwatchConfig};
use fleetwatch::directory::InMemoryTokenDirectory;
use fleetwatch::evaluator::ThresholdEvaluator;
use fleetwatch::monitor::SpeedMonitor;
use fleetwatch::notify::{DispatchWorker, PushDispatcher};
use fleetwatch::telemetry::TelemetryFeed;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetwatch=info".into()),
        )
        .init();

    info!("Fleetwatch starting...");

    let config_path =
        std::env::var("FLEETWATCH_CONFIG").unwrap_or_else(|_| "fleetwatch.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        config::load_config(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", config_path, e))?
    } else {
        info!(path = %config_path, "No config file found, using defaults");
        FleetwatchConfig::default()
    };

    let server_key = config
        .push
        .resolved_server_key()
        .context("Push server key not configured (set FLEETWATCH_PUSH_SERVER_KEY)")?;

    let store = Arc::new(AgreementStore::new());
    let directory = Arc::new(InMemoryTokenDirectory::new());

    // Dispatch worker owns all push backend I/O
    let (notification_tx, notification_rx) = mpsc::channel(config.dispatch.queue_capacity);
    let dispatcher = PushDispatcher::new(
        &config.push,
        server_key,
        Arc::clone(&directory) as Arc<dyn fleetwatch::directory::TokenDirectory>,
    )?;
    tokio::spawn(DispatchWorker::new(dispatcher, notification_rx).run());

    let evaluator = Arc::new(ThresholdEvaluator::new(Arc::clone(&store), notification_tx));
    let feed = Arc::new(TelemetryFeed::new(config.feed.channel_capacity));
    let monitor = Arc::new(SpeedMonitor::new(Arc::clone(&feed), evaluator));

    // Startup provisioning (optional file)
    if let Some(path) = &config.provisioning.file {
        let file = config::load_provisioning(path)?;
        for (customer_id, token) in &file.device_tokens {
            directory.register(customer_id, token);
        }
        let loaded = store
            .reload(file.agreements)
            .map_err(|e| anyhow::anyhow!("Invalid provisioning file {}: {}", path, e))?;
        info!(
            agreements = loaded,
            device_tokens = directory.len(),
            "Startup provisioning loaded"
        );
    }
    monitor.sync(&store.asset_ids());

    let app = create_telemetry_router(TelemetryAppState {
        feed: Arc::clone(&feed),
    })
    .merge(create_provisioning_router(ProvisioningAppState {
        store,
        directory,
        monitor,
        admin_token: config::admin_token_from_env(),
    }))
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.api.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.api.bind_addr))?;
    info!(addr = %config.api.bind_addr, "Fleetwatch listening");

    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}
