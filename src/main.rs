// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::application::metrics_table_service::MetricsTableService;
use crate::infrastructure::config::{load_app_config, load_seed_config};
use crate::infrastructure::in_memory_backend::InMemoryMetricsBackend;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let app_config = load_app_config()?;
    let seed_config = load_seed_config()?;

    // Create backend (infrastructure layer)
    let backend = Arc::new(InMemoryMetricsBackend::from_seed(&seed_config)?);

    // Create services (application layer)
    let table_service = MetricsTableService::new(
        backend.clone(),
        app_config.terminology.clone(),
        app_config.table.clone(),
    );

    // Create application state
    let state = Arc::new(AppState {
        client: backend.clone(),
        mutations: backend,
        table_service,
        metric_term: app_config.terminology.metric.clone(),
        sessions: Mutex::new(HashMap::new()),
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", app_config.server.host, app_config.server.port).parse()?;
    tracing::info!("Starting meeting-metrics-tabs service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
