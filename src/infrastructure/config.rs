use crate::application::dashboard_service::FetchPolicy;
use serde::Deserialize;
use std::time::Duration;

const ENV_PREFIX: &str = "CITATION_DASHBOARD";

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub api: ApiSettings,
    pub fetch: FetchSettings,
    #[serde(default)]
    pub mock: MockSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    pub timeout_ms: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchSettings {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub stale_after_secs: u64,
}

impl FetchSettings {
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MockSettings {
    #[serde(default)]
    pub seed: Option<u64>,
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    load_config_from(config::File::with_name("config/dashboard").required(false))
}

/// Defaults, then `source`, then `CITATION_DASHBOARD__SECTION__KEY` variables.
pub fn load_config_from<S>(source: S) -> anyhow::Result<DashboardConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("api.base_url", "http://localhost:3001")?
        .set_default("api.timeout_ms", 5000)?
        .set_default("fetch.max_retries", 3)?
        .set_default("fetch.base_backoff_ms", 250)?
        .set_default("fetch.max_backoff_ms", 2000)?
        .set_default("fetch.stale_after_secs", 300)?
        .add_source(source)
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
