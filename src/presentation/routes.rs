// Router wiring
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{backend_dashboard, dashboard_view, health_check};
use axum::http::{HeaderName, Method, header};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(dashboard_view))
        .route("/api/v1/dashboard", get(backend_dashboard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
