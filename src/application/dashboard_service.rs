// Dashboard service - Fetch with retry, cache, coalesce, and fall back to generated data
use crate::application::dashboard_cache::{DashboardCache, FetchTicket};
use crate::application::dashboard_source::DashboardSource;
use crate::application::mock_generator::MockDashboardGenerator;
use crate::domain::dashboard::DashboardPayload;
use crate::domain::date_range::DashboardQuery;
use crate::domain::error::{DashboardError, FetchFailure};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type SharedFetch = Shared<BoxFuture<'static, Result<DashboardOutcome, DashboardError>>>;
type InFlightMap = HashMap<DashboardQuery, InFlight>;

struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

/// Held by a fetch task; removes the task's own in-flight entry however the
/// task ends, including by panic.
struct InFlightGuard {
    in_flight: Arc<Mutex<InFlightMap>>,
    query: DashboardQuery,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = lock_map(&self.in_flight);
        // The entry may already belong to a newer fetch after invalidation.
        if in_flight.get(&self.query).is_some_and(|entry| entry.id == self.id) {
            in_flight.remove(&self.query);
        }
    }
}

fn lock_map(in_flight: &Mutex<InFlightMap>) -> MutexGuard<'_, InFlightMap> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Retry and backoff settings for backend fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl FetchPolicy {
    /// Delay before retry number `attempt + 1`: doubles each time, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_backoff)
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Where a returned payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Backend,
    Cache,
    Fallback,
}

/// Advisory shown alongside fallback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackNotice {
    AuthIssue,
    BackendUnavailable,
}

impl FallbackNotice {
    pub fn for_failure(failure: &FetchFailure) -> Self {
        if failure.is_auth() {
            FallbackNotice::AuthIssue
        } else {
            FallbackNotice::BackendUnavailable
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FallbackNotice::AuthIssue => {
                "Connection issue: please sign in again to see live data. Showing sample data."
            }
            FallbackNotice::BackendUnavailable => {
                "Live data is temporarily unavailable. Showing sample data."
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardOutcome {
    pub payload: Arc<DashboardPayload>,
    pub provenance: Provenance,
    pub failure: Option<FetchFailure>,
}

impl DashboardOutcome {
    fn fresh(payload: Arc<DashboardPayload>) -> Self {
        Self {
            payload,
            provenance: Provenance::Backend,
            failure: None,
        }
    }

    fn cached(payload: Arc<DashboardPayload>) -> Self {
        Self {
            payload,
            provenance: Provenance::Cache,
            failure: None,
        }
    }

    fn fallback(payload: Arc<DashboardPayload>, failure: FetchFailure) -> Self {
        Self {
            payload,
            provenance: Provenance::Fallback,
            failure: Some(failure),
        }
    }

    pub fn error_occurred(&self) -> bool {
        self.failure.is_some()
    }

    pub fn notice(&self) -> Option<FallbackNotice> {
        self.failure.as_ref().map(FallbackNotice::for_failure)
    }
}

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn DashboardSource>,
    fallback: Arc<MockDashboardGenerator>,
    cache: Arc<DashboardCache>,
    policy: FetchPolicy,
    in_flight: Arc<Mutex<InFlightMap>>,
    next_fetch_id: Arc<AtomicU64>,
}

impl DashboardService {
    pub fn new(
        source: Arc<dyn DashboardSource>,
        fallback: Arc<MockDashboardGenerator>,
        cache: Arc<DashboardCache>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            source,
            fallback,
            cache,
            policy,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_fetch_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn cached(&self, query: &DashboardQuery) -> Option<Arc<DashboardPayload>> {
        self.cache.get_fresh(query)
    }

    /// Drop the cached payload for `query` and detach any fetch still running
    /// for it, so the next load starts over.
    pub fn invalidate(&self, query: &DashboardQuery) {
        let mut in_flight = self.lock_in_flight();
        in_flight.remove(query);
        self.cache.invalidate(query);
    }

    pub async fn request(
        &self,
        date_range: &str,
        project_id: Option<&str>,
    ) -> Result<DashboardOutcome, DashboardError> {
        let query = DashboardQuery::parse(date_range, project_id)?;
        self.load(query).await
    }

    /// Resolve a validated query. Only generator failures come back as errors;
    /// backend failures resolve to fallback data.
    pub async fn load(&self, query: DashboardQuery) -> Result<DashboardOutcome, DashboardError> {
        let fetch = {
            let mut in_flight = self.lock_in_flight();

            if let Some(payload) = self.cache.get_fresh(&query) {
                tracing::debug!("Cache hit for {}", query);
                return Ok(DashboardOutcome::cached(payload));
            }

            match in_flight.get(&query) {
                Some(entry) => {
                    tracing::debug!("Joining in-flight fetch for {}", query);
                    entry.fetch.clone()
                }
                None => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.spawn_fetch(query.clone(), id);
                    in_flight.insert(
                        query,
                        InFlight {
                            id,
                            fetch: fetch.clone(),
                        },
                    );
                    fetch
                }
            }
        };

        fetch.await
    }

    fn spawn_fetch(&self, query: DashboardQuery, id: u64) -> SharedFetch {
        let ticket = self.cache.begin(&query);
        let service = self.clone();
        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            query: query.clone(),
            id,
        };

        let handle = tokio::spawn(async move {
            let _guard = guard;
            service.resolve(&ticket).await
        });

        handle
            .map(move |joined| {
                joined.unwrap_or_else(|e| {
                    tracing::error!("Dashboard fetch task for {} failed: {}", query, e);
                    Err(DashboardError::Unexpected(format!(
                        "dashboard fetch task failed: {}",
                        e
                    )))
                })
            })
            .boxed()
            .shared()
    }

    async fn resolve(&self, ticket: &FetchTicket) -> Result<DashboardOutcome, DashboardError> {
        let query = ticket.query();

        match fetch_with_retry(self.source.as_ref(), query, &self.policy).await {
            Ok(payload) => {
                let payload = Arc::new(payload);
                if !self.cache.complete(ticket, payload.clone()) {
                    tracing::debug!("Discarding stale response for {}", query);
                }
                Ok(DashboardOutcome::fresh(payload))
            }
            Err(failure) => {
                tracing::warn!(
                    query = %query,
                    auth = failure.is_auth(),
                    error = %failure,
                    "Dashboard backend unavailable, serving fallback data"
                );

                let payload = self.fallback.generate(query.date_range).map_err(|e| {
                    tracing::error!("Fallback generation failed for {}: {}", query, e);
                    DashboardError::from(e)
                })?;

                Ok(DashboardOutcome::fallback(Arc::new(payload), failure))
            }
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, InFlightMap> {
        lock_map(&self.in_flight)
    }
}

/// One logical fetch: retries transient failures with backoff, and rejects
/// payloads that break the dashboard invariants.
pub async fn fetch_with_retry(
    source: &dyn DashboardSource,
    query: &DashboardQuery,
    policy: &FetchPolicy,
) -> Result<DashboardPayload, FetchFailure> {
    let mut attempt = 0;

    loop {
        let result = source.fetch(query).await.and_then(|mut payload| {
            payload.validate().map_err(FetchFailure::Invalid)?;
            payload.sort_activity();
            Ok(payload)
        });

        match result {
            Ok(payload) => return Ok(payload),
            Err(failure) if failure.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                tracing::debug!(
                    "Attempt {} for {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    query,
                    failure,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure),
        }
    }
}
