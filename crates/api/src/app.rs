use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use domain::services::{EventLogService, LogStore};
use persistence::repositories::LogRecordRepository;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, request_log, require_admin, require_user_auth, trace_id,
};
use crate::routes::{health, logs, settings};
use crate::services::{AuditDispatcher, AuditWorker};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub events: EventLogService,
    pub audit: AuditDispatcher,
}

impl AppState {
    /// Build the state around an event log store and start the audit worker.
    ///
    /// The worker drains the queue once the state and every clone of it are
    /// dropped. Must be called from within a Tokio runtime.
    pub fn new(config: Config, pool: PgPool, store: Arc<dyn LogStore>) -> (Self, AuditWorker) {
        let events = EventLogService::new(store);
        let (audit, worker) = AuditDispatcher::spawn(events.clone(), config.audit.queue_capacity);

        let state = Self {
            pool,
            config: Arc::new(config),
            events,
            audit,
        };
        (state, worker)
    }

    /// State backed by the PostgreSQL event log.
    pub fn with_database(config: Config, pool: PgPool) -> (Self, AuditWorker) {
        let store = Arc::new(LogRecordRepository::new(pool.clone()));
        Self::new(config, pool, store)
    }
}

pub fn create_app(config: Config, pool: PgPool) -> (Router, AuditWorker) {
    let (state, worker) = AppState::with_database(config, pool);
    (create_router(state), worker)
}

pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Event log administration (admin only)
    let log_routes = Router::new().nest(
        "/api/v1/logs",
        logs::router().route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        )),
    );

    // Settings: any authenticated user may read
    let settings_read_routes = Router::new()
        .route("/api/v1/settings", get(settings::get_settings))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Settings: only admins may write
    let settings_write_routes = Router::new()
        .route("/api/v1/settings", put(settings::update_settings))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/api/health/ready", get(health::ready))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(log_routes)
        .merge(settings_read_routes)
        .merge(settings_write_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(middleware::from_fn_with_state(state.clone(), request_log)) // Audit taps
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID
        .layer(cors)
        .with_state(state)
}
