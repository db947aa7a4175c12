// HTTP request handlers
use crate::application::dashboard_service::{DashboardOutcome, FallbackNotice, Provenance};
use crate::domain::dashboard::{ApiErrorBody, DashboardEnvelope, DashboardPayload};
use crate::domain::date_range::{DashboardQuery, DateRange};
use crate::domain::error::DashboardError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    #[serde(rename = "dateRange")]
    pub date_range: Option<String>,
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
}

impl DashboardParams {
    fn date_range(&self) -> &str {
        self.date_range
            .as_deref()
            .unwrap_or(DateRange::default().as_str())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView<'a> {
    pub payload: &'a DashboardPayload,
    pub is_loading: bool,
    pub error_occurred: bool,
    pub notice: Option<FallbackNotice>,
    pub notice_message: Option<&'static str>,
    pub provenance: Provenance,
}

impl<'a> DashboardView<'a> {
    fn from_outcome(outcome: &'a DashboardOutcome) -> Self {
        let notice = outcome.notice();
        Self {
            payload: outcome.payload.as_ref(),
            is_loading: false,
            error_occurred: outcome.error_occurred(),
            notice,
            notice_message: notice.map(|n| n.message()),
            provenance: outcome.provenance,
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiErrorBody::new(message))).into_response()
}

fn has_bearer_token(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| !token.trim().is_empty())
        .unwrap_or(false)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Stand-in for the backend dashboard function
pub async fn backend_dashboard(
    headers: HeaderMap,
    Query(params): Query<DashboardParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if !has_bearer_token(&headers) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Unauthorized: Missing or invalid token",
        );
    }

    let query = match DashboardQuery::parse(params.date_range(), params.project_id.as_deref()) {
        Ok(query) => query,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match state.backend_generator.generate(query.date_range) {
        Ok(payload) => Json(DashboardEnvelope { data: payload }).into_response(),
        Err(e) => {
            tracing::error!("Dashboard API error: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred while fetching dashboard data.",
            )
        }
    }
}

/// Dashboard data for the UI, with fallback applied
pub async fn dashboard_view(
    Query(params): Query<DashboardParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let result = state
        .dashboard_service
        .request(params.date_range(), params.project_id.as_deref())
        .await;

    match result {
        Ok(outcome) => Json(DashboardView::from_outcome(&outcome)).into_response(),
        Err(DashboardError::Validation(e)) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => {
            tracing::error!("Dashboard view failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
