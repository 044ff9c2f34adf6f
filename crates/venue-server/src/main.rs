//! Venue Search Server - Main entry point

use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;
use venue_common::logging::{init_logging, LogConfig};

use venue_server::{
    api,
    batch::{spawn_workers, BatchQueue, BatchStore, PgBatchStore, Reaper},
    config::Config,
    db,
    features::FeatureState,
    search::{SearchInvoker, SearchStore, SerpApiClient, SerpApiInvoker},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("venue-server")
        .filter_directives("venue_server=debug,tower_http=debug,sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    init_logging(&log_config)?;

    info!("Starting Venue Search Server");

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to the database")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Search pipeline
    let client = SerpApiClient::new(&config.search).context("Failed to build search client")?;
    let invoker: Arc<dyn SearchInvoker> = Arc::new(SerpApiInvoker::new(
        client,
        SearchStore::new(pool.clone()),
        config.search.hotel_details,
    ));

    // Batch workers; the reaper's first sweep resumes pending imports
    let store: Arc<dyn BatchStore> = Arc::new(PgBatchStore::new(pool.clone()));
    let (queue, receiver) = BatchQueue::channel(config.batch.queue_capacity);
    let workers = spawn_workers(store.clone(), invoker.clone(), &config.batch, receiver);
    let reaper = Reaper::new(store.clone(), queue.clone(), config.batch.max_attempts)
        .spawn(config.batch.reaper_interval());
    info!(workers = workers.len(), "Batch workers started");

    let state = FeatureState {
        db: pool.clone(),
        store,
        invoker,
        queue,
        max_names: config.batch.max_names,
    };
    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last queue sender, so workers see the channel close
    // once their current import is drained.
    reaper.abort();
    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    if tokio::time::timeout(grace, futures::future::join_all(workers))
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Batch workers still busy at shutdown; unfinished items will be reclaimed on restart"
        );
    }

    pool.close().await;
    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
