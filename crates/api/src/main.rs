use anyhow::Result;
use domain::models::{LogLevel, LogSource, NewLogRecord};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use erp_api::app::{create_router, AppState};
use erp_api::config::Config;
use erp_api::middleware::{init_logging, init_metrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging; the guard flushes the file sinks on exit
    let _logging = init_logging(&config.logging)?;

    info!("Starting ERP backend v{}", env!("CARGO_PKG_VERSION"));

    init_metrics()?;

    // Create database pool
    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    // Run migrations
    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let addr = config.socket_addr()?;
    let audit_shutdown_timeout = Duration::from_secs(config.audit.shutdown_timeout_secs);
    let (state, audit_worker) = AppState::with_database(config, pool);

    state.audit.dispatch(
        NewLogRecord::new(LogLevel::Info, "Server gestartet")
            .with_module("system")
            .with_action("startup")
            .with_source(LogSource::SystemStartup)
            .add_detail("version", json!(env!("CARGO_PKG_VERSION")))
            .add_detail("address", json!(addr.to_string())),
    );

    let app = create_router(state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router and its state are gone; the worker writes what is left.
    audit_worker.wait_for_shutdown(audit_shutdown_timeout).await;
    info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
