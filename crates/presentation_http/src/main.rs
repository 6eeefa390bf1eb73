//! WebhookQ HTTP Server
//!
//! Main entry point: loads configuration, opens the database, wires the
//! worker engine and due scanner, and serves the HTTP API until a shutdown
//! signal arrives. On shutdown the control flag is cleared and in-flight
//! workers drain before the process exits.

use std::sync::Arc;

use application::ports::{ApplicationStore, InstructionBroker, TaskStore};
use application::{
    ControlFlag, DueScanner, EnqueueService, TaskAccessPolicy, TaskPerformer, WorkerPool,
};
use infrastructure::{
    AppConfig, AsyncDatabase, BrokerSelection, MemoryBroker, SqliteApplicationStore, SqliteBroker,
    SqliteTaskStore, WebhookClient,
};
use presentation_http::{ApiKeyAuthLayer, routes, state::AppState};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhookq=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("WebhookQ v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    info!(
        host = %config.server.host,
        port = %config.server.port,
        broker = %config.broker,
        database = %config.database.url,
        "Configuration loaded"
    );

    // Database and stores
    let db = AsyncDatabase::new(&config.database).await?;
    db.migrate().await?;
    let task_store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(db.pool().clone()));
    let app_store = Arc::new(SqliteApplicationStore::new(db.pool().clone()));

    // Bootstrap application for unauthenticated mode and first-run setups
    let bootstrap = match app_store.find_by_name(&config.security.bootstrap_app).await? {
        Some(app) => app,
        None => {
            let (app, key) = app_store.create(&config.security.bootstrap_app).await?;
            info!(
                app_id = %app.id,
                api_key = %key.value,
                "bootstrap application created; store this key, it is not shown again"
            );
            app
        }
    };

    // Instruction broker
    let broker: Arc<dyn InstructionBroker> = match config.broker {
        BrokerSelection::Sqlite => Arc::new(SqliteBroker::new(db.pool().clone())),
        BrokerSelection::Memory => Arc::new(MemoryBroker::new()),
    };

    // Worker engine
    let webhook = Arc::new(
        WebhookClient::new(&config.delivery)
            .map_err(|e| anyhow::anyhow!("Failed to build webhook client: {e}"))?,
    );
    let performer = Arc::new(TaskPerformer::new(
        Arc::clone(&task_store),
        webhook,
        config.worker.due_factory(),
        config.worker.max_task_errors,
    ));
    let flag = ControlFlag::new();
    let pool = WorkerPool::new(
        Arc::clone(&broker),
        Arc::clone(&task_store),
        performer,
        config.worker.poller_config(),
        flag.clone(),
    );
    let pool_handle = tokio::spawn(async move {
        if let Err(e) = pool.run().await {
            warn!(error = %e, "worker pool exited with error");
        }
    });

    // Due scanner
    let scanner_handle = if config.scanner.enabled {
        let scanner = DueScanner::new(
            Arc::clone(&task_store),
            Arc::clone(&broker),
            config.scanner.scanner_config(),
        );
        let scanner_flag = flag.clone();
        Some(tokio::spawn(async move {
            scanner.run(scanner_flag).await;
        }))
    } else {
        None
    };

    // HTTP surface
    let state = AppState {
        enqueue: Arc::new(EnqueueService::new(
            Arc::clone(&task_store),
            Arc::clone(&broker),
            config.delivery.proxy_header_prefix.clone(),
        )),
        task_store: Arc::clone(&task_store),
        access_policy: Arc::new(TaskAccessPolicy::new(app_store.clone())),
        default_timeout: config.delivery.default_timeout_secs,
    };

    let auth_layer = if config.security.require_auth {
        ApiKeyAuthLayer::required(app_store)
    } else {
        ApiKeyAuthLayer::with_fallback(app_store, bootstrap.id)
    };

    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(auth_layer);

    // Start server
    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain workers before exit
    info!("shutting down, draining workers");
    flag.clear();
    let _ = pool_handle.await;
    if let Some(handle) = scanner_handle {
        let _ = handle.await;
    }
    db.close().await;
    info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
