// Source trait for authoritative dashboard data
use crate::domain::dashboard::DashboardPayload;
use crate::domain::date_range::DashboardQuery;
use crate::domain::error::FetchFailure;
use async_trait::async_trait;

#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Perform exactly one attempt against the backend. Retrying is the
    /// caller's decision, based on the returned failure.
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardPayload, FetchFailure>;
}
