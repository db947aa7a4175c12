// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use citation_dashboard::application::dashboard_cache::DashboardCache;
use citation_dashboard::application::dashboard_service::DashboardService;
use citation_dashboard::application::mock_generator::MockDashboardGenerator;
use citation_dashboard::infrastructure::config::load_dashboard_config;
use citation_dashboard::infrastructure::http_dashboard_source::HttpDashboardSource;
use citation_dashboard::presentation::app_state::AppState;
use citation_dashboard::presentation::routes::router;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create backend source (infrastructure layer)
    let source = Arc::new(HttpDashboardSource::from_settings(&config.api)?);

    let generator = |seed: Option<u64>| match seed {
        Some(seed) => MockDashboardGenerator::seeded(seed),
        None => MockDashboardGenerator::new(),
    };

    // Create services (application layer)
    let dashboard_service = DashboardService::new(
        source,
        Arc::new(generator(config.mock.seed)),
        Arc::new(DashboardCache::new(config.fetch.stale_after())),
        config.fetch.policy(),
    );

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        backend_generator: Arc::new(generator(config.mock.seed)),
    });

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(
        "Starting citation-dashboard on {} (backend {})",
        addr,
        config.api.base_url
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;

    Ok(())
}
