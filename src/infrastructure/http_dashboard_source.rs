// HTTP dashboard source - Talks to the backend dashboard function
use crate::application::dashboard_source::DashboardSource;
use crate::domain::dashboard::{ApiErrorBody, DashboardEnvelope, DashboardPayload};
use crate::domain::date_range::DashboardQuery;
use crate::domain::error::FetchFailure;
use crate::infrastructure::config::ApiSettings;
use async_trait::async_trait;
use reqwest::{StatusCode, header};

const DASHBOARD_PATH: &str = "/api/v1/dashboard";

#[derive(Debug, Clone)]
pub struct HttpDashboardSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDashboardSource {
    pub fn new(client: reqwest::Client, base_url: String, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_settings(settings: &ApiSettings) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self::new(
            client,
            settings.base_url.clone(),
            settings.token.clone(),
        ))
    }

    fn build_url(&self, query: &DashboardQuery) -> String {
        let mut url = format!(
            "{}{}?dateRange={}",
            self.base_url,
            DASHBOARD_PATH,
            urlencoding::encode(query.date_range.as_str())
        );
        if let Some(project_id) = &query.project_id {
            url.push_str("&projectId=");
            url.push_str(&urlencoding::encode(project_id.as_str()));
        }
        url
    }

    async fn failure_from_response(status: StatusCode, response: reqwest::Response) -> FetchFailure {
        let body = response.bytes().await.unwrap_or_default();
        let structured = serde_json::from_slice::<ApiErrorBody>(&body)
            .ok()
            .map(|b| b.error.message);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return FetchFailure::Auth {
                status: status.as_u16(),
                message: structured
                    .unwrap_or_else(|| "Unauthorized: Please log in again".to_string()),
            };
        }

        match structured {
            Some(message) => FetchFailure::Status {
                status: status.as_u16(),
                message,
                structured: true,
            },
            None => FetchFailure::Status {
                status: status.as_u16(),
                message: format!(
                    "HTTP Error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                ),
                structured: false,
            },
        }
    }
}

#[async_trait]
impl DashboardSource for HttpDashboardSource {
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardPayload, FetchFailure> {
        let url = self.build_url(query);
        tracing::debug!("Fetching dashboard from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.as_deref().unwrap_or_default())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure_from_response(status, response).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;

        let envelope: DashboardEnvelope =
            serde_json::from_slice(&body).map_err(|e| FetchFailure::Decode(e.to_string()))?;

        Ok(envelope.data)
    }
}
