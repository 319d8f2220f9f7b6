//! Lockstep API server entry point.

use std::sync::Arc;

use lockstep_api::config::AppConfig;
use lockstep_api::error::AppError;
use lockstep_api::routes;
use lockstep_api::state::{AppState, LogBackend};
use lockstep_core::clock::{Clock, MonotonicClock, SystemClock};
use lockstep_core::event_log::EventLog;
use lockstep_event_store::in_memory_event_log::InMemoryEventLog;
use lockstep_event_store::pg_event_log::PgEventLog;
use lockstep_orders::application::service::OrderService;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Lockstep API server");

    let config = AppConfig::from_env()?;

    let (log, backend) = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            let log: Arc<dyn EventLog> = Arc::new(PgEventLog::new(pool));
            (log, LogBackend::Postgres)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; events are kept in memory only");
            let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
            (log, LogBackend::InMemory)
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new(SystemClock));
    let app_state = AppState::new(OrderService::new(clock, log), backend);

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = config.socket_addr()?;
    tracing::info!(%addr, event_log = backend.as_str(), "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
