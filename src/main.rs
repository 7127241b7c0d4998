//! draft-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints, the
//! deadline sweeper and, on PostgreSQL, the cross-instance event relay.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use draft_gateway::api;
use draft_gateway::app_state::AppState;
use draft_gateway::config::{EngineConfig, LogFormat, StorageBackend};
use draft_gateway::domain::{Clock, EventBus, EventSink, SystemClock};
use draft_gateway::persistence::listener::NotifyRelay;
use draft_gateway::persistence::{
    ClusterMutex, DraftStore, MemoryClusterMutex, MemoryDraftStore, PgClusterMutex, PgDraftStore,
};
use draft_gateway::service::{DeadlineSweeper, SweeperSettings, TimerService};
use draft_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = EngineConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        backend = ?config.storage_backend,
        "starting draft-gateway"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let event_bus = EventBus::new(config.event_bus_capacity);
    let sink: Arc<dyn EventSink> = Arc::new(event_bus.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Build persistence layer
    let (store, mutex): (Arc<dyn DraftStore>, Arc<dyn ClusterMutex>) = match config.storage_backend
    {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await?;
            Migrator::new(Path::new(&config.migrations_dir))
                .await?
                .run(&pool)
                .await?;
            tracing::info!("database migrations applied");

            let instance_id = Uuid::new_v4();
            let store: Arc<dyn DraftStore> =
                Arc::new(PgDraftStore::new(pool.clone(), instance_id));
            let relay = NotifyRelay::new(
                pool.clone(),
                instance_id,
                Arc::clone(&store),
                Arc::clone(&sink),
            );
            let relay_shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = relay.run(relay_shutdown).await {
                    tracing::error!(error = %e, "event relay stopped");
                }
            });
            (store, Arc::new(PgClusterMutex::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("in-memory storage: state is lost on restart");
            (
                Arc::new(MemoryDraftStore::new()),
                Arc::new(MemoryClusterMutex::new()),
            )
        }
    };

    // Build application state
    let app_state = AppState::new(
        Arc::clone(&store),
        event_bus,
        Arc::clone(&clock),
        config.events_page_limit,
    );

    // Start the deadline sweeper
    let sweeper_handle = if config.sweeper_enabled {
        let sweeper = DeadlineSweeper::new(
            Arc::clone(&store),
            mutex,
            TimerService::new(Arc::clone(&store), sink, Arc::clone(&clock)),
            clock,
            SweeperSettings {
                interval: config.sweeper_interval(),
                batch_size: config.sweeper_batch_size,
                lock_name: config.sweeper_lock_name.clone(),
            },
        );
        Some(tokio::spawn(sweeper.run(shutdown_rx.clone())))
    } else {
        tracing::info!("deadline sweeper disabled on this instance");
        None
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }
    tracing::info!("draft-gateway stopped");

    Ok(())
}
