// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::mock_generator::MockDashboardGenerator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    /// Feeds the stand-in backend dashboard function.
    pub backend_generator: Arc<MockDashboardGenerator>,
}
