// src/main.rs - Bridge entry point
use clap::Parser;
use std::sync::Arc;

use printbridge::adapters::{BroadcastNotifier, CameraManager, CloudOutbox, MaterialCounter, cloud};
use printbridge::config::{self, Config};
use printbridge::web::api::{AppStateInner, create_router};
use printbridge::{Adapters, EventOrchestrator, PrinterLinkListener, SessionState};

#[derive(Parser, Debug)]
#[command(name = "printbridge", version, about = "Printer event bridge to cloud, camera and clients")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(default_value = "printbridge.toml")]
    config: String,
    /// Override the HTTP bind address from the config
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let args = Args::parse();

    let config = match config::load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::INFO)
                .init();
            tracing::error!("Failed to load config from '{}': {}", args.config, e);
            tracing::error!("Please ensure the configuration file exists and is properly formatted");
            return Err(e.into());
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(config.log.max_level()?)
        .init();

    tracing::info!("Starting printbridge {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Printer: {}", config.printer_name());
    tracing::info!("Cloud API: {}", config.cloud.api_host);
    tracing::info!("Camera: {}", if config.camera.enabled { "enabled" } else { "disabled" });

    run(config, args.bind).await
}

async fn run(
    config: Config,
    bind: Option<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let notifier = BroadcastNotifier::new(config.notifier.channel_capacity);
    let camera = Arc::new(CameraManager::new(&config.camera));
    let material = Arc::new(MaterialCounter::new());
    let (outbox, outbox_rx) = CloudOutbox::new();
    let drain = tokio::spawn(cloud::drain_outbox(outbox_rx, config.cloud.clone()));

    let adapters = Adapters {
        cloud: Arc::new(outbox),
        camera: camera.clone(),
        material,
        notifier: Arc::new(notifier.clone()),
    };
    let orchestrator = Arc::new(EventOrchestrator::new(adapters, SessionState::default()));
    let (events, worker) = orchestrator.clone().spawn();

    // The printer is available once the bridge is up
    orchestrator
        .register_listener(Arc::new(PrinterLinkListener::with_sink(events.clone())))
        .await?;

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let app = create_router(Arc::new(AppStateInner {
        orchestrator: orchestrator.clone(),
        events: events.clone(),
        notifier,
        config,
    }));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down printbridge");
    orchestrator.unregister_listener().await;
    camera.shutdown().await;
    events.shutdown()?;
    worker.await?;
    drop(orchestrator);
    if let Err(e) = drain.await {
        tracing::warn!("Cloud outbox task failed: {}", e);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
