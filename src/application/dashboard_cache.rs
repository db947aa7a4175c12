// Staleness cache for dashboard payloads, keyed by query
use crate::domain::dashboard::DashboardPayload;
use crate::domain::date_range::DashboardQuery;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Default staleness window.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<DashboardPayload>,
    fetched_at: Instant,
}

// Present only while at least one ticket for the key is outstanding.
#[derive(Debug, Default)]
struct PendingFetches {
    epoch: u64,
    outstanding: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<DashboardQuery, CacheEntry>,
    // Epoch is bumped on invalidation; tickets issued under an older epoch are stale.
    pending: HashMap<DashboardQuery, PendingFetches>,
}

/// Issued when a fetch starts. Completing it stores the result only if the key
/// was not invalidated in the meantime. Dropping it releases the key's epoch
/// bookkeeping once no other fetch for the key is outstanding.
#[derive(Debug)]
pub struct FetchTicket {
    cache: Arc<DashboardCache>,
    query: DashboardQuery,
    epoch: u64,
    started_at: Instant,
}

impl FetchTicket {
    pub fn query(&self) -> &DashboardQuery {
        &self.query
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        self.cache.release(&self.query);
    }
}

/// Key → payload mapping with fetch timestamps.
#[derive(Debug)]
pub struct DashboardCache {
    state: Mutex<CacheState>,
    stale_after: Duration,
}

impl DashboardCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            stale_after,
        }
    }

    /// Cached payload for `query` if it is younger than the staleness window.
    /// A stale entry is evicted.
    pub fn get_fresh(&self, query: &DashboardQuery) -> Option<Arc<DashboardPayload>> {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get(query) {
            if self.is_fresh(entry) {
                return Some(entry.payload.clone());
            }
            state.entries.remove(query);
        }
        None
    }

    pub fn begin(self: &Arc<Self>, query: &DashboardQuery) -> FetchTicket {
        let mut state = self.lock();
        let pending = state.pending.entry(query.clone()).or_default();
        pending.outstanding += 1;

        FetchTicket {
            cache: self.clone(),
            query: query.clone(),
            epoch: pending.epoch,
            started_at: Instant::now(),
        }
    }

    /// Store a fetched payload. Returns `false` when the response is stale:
    /// its key was invalidated after the fetch began, or a newer fetch for the
    /// same key already landed. Expired entries for other keys are pruned.
    pub fn complete(&self, ticket: &FetchTicket, payload: Arc<DashboardPayload>) -> bool {
        let mut state = self.lock();

        let current_epoch = state.pending.get(&ticket.query).map(|p| p.epoch);
        if current_epoch != Some(ticket.epoch) {
            return false;
        }

        state.entries.retain(|_, entry| self.is_fresh(entry));
        if let Some(existing) = state.entries.get(&ticket.query) {
            if existing.fetched_at > ticket.started_at {
                return false;
            }
        }

        state.entries.insert(
            ticket.query.clone(),
            CacheEntry {
                payload,
                fetched_at: ticket.started_at,
            },
        );
        true
    }

    pub fn invalidate(&self, query: &DashboardQuery) {
        let mut state = self.lock();
        state.entries.remove(query);
        if let Some(pending) = state.pending.get_mut(query) {
            pending.epoch += 1;
        }
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        for pending in state.pending.values_mut() {
            pending.epoch += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, query: &DashboardQuery) {
        let mut state = self.lock();
        if let Entry::Occupied(mut pending) = state.pending.entry(query.clone()) {
            pending.get_mut().outstanding -= 1;
            if pending.get().outstanding == 0 {
                pending.remove();
            }
        }
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.fetched_at.elapsed() < self.stale_after
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DashboardCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mock_generator::MockDashboardGenerator;
    use crate::domain::date_range::{DateRange, ProjectId};

    fn payload() -> Arc<DashboardPayload> {
        Arc::new(
            MockDashboardGenerator::seeded(1)
                .generate(DateRange::Last30Days)
                .unwrap(),
        )
    }

    fn query(range: DateRange) -> DashboardQuery {
        DashboardQuery::new(range, None)
    }

    fn project(id: &str) -> DashboardQuery {
        DashboardQuery::new(DateRange::Last30Days, Some(ProjectId::parse(id).unwrap()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_until_stale_window_passes() {
        let cache = Arc::new(DashboardCache::default());
        let key = query(DateRange::Last30Days);
        let stored = payload();

        let ticket = cache.begin(&key);
        assert!(cache.complete(&ticket, stored.clone()));

        let hit = cache.get_fresh(&key).unwrap();
        assert!(Arc::ptr_eq(&hit, &stored));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get_fresh(&key).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get_fresh(&key).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_evicted() {
        let cache = Arc::new(DashboardCache::default());
        for id in ["proj-1", "proj-2", "proj-3"] {
            let ticket = cache.begin(&project(id));
            assert!(cache.complete(&ticket, payload()));
        }
        assert_eq!(cache.len(), 3);

        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;

        // A miss on a stale key evicts it.
        assert!(cache.get_fresh(&project("proj-1")).is_none());
        assert_eq!(cache.len(), 2);

        // Storing any payload prunes the rest.
        let ticket = cache.begin(&project("proj-4"));
        assert!(cache.complete(&ticket, payload()));
        assert_eq!(cache.len(), 1);
        assert!(cache.get_fresh(&project("proj-4")).is_some());
    }

    #[tokio::test]
    async fn test_epochs_are_released_with_last_ticket() {
        let cache = Arc::new(DashboardCache::default());
        let key = query(DateRange::Last7Days);

        let first = cache.begin(&key);
        let second = cache.begin(&key);
        cache.invalidate(&key);
        drop(first);
        assert_eq!(cache.lock().pending.len(), 1);
        drop(second);
        assert!(cache.lock().pending.is_empty());

        // Invalidating a key with nothing in flight leaves no bookkeeping behind.
        cache.invalidate(&query(DateRange::LastYear));
        assert!(cache.lock().pending.is_empty());

        let ticket = cache.begin(&key);
        assert!(cache.complete(&ticket, payload()));
        drop(ticket);
        assert!(cache.lock().pending.is_empty());
        assert!(cache.get_fresh(&key).is_some());
    }

    #[tokio::test]
    async fn test_invalidated_key_discards_in_flight_result() {
        let cache = Arc::new(DashboardCache::default());
        let key = query(DateRange::Last7Days);

        let ticket = cache.begin(&key);
        cache.invalidate(&key);

        assert!(!cache.complete(&ticket, payload()));
        assert!(cache.get_fresh(&key).is_none());

        let retry = cache.begin(&key);
        assert!(cache.complete(&retry, payload()));
        assert!(cache.get_fresh(&key).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_fetch_does_not_replace_newer() {
        let cache = Arc::new(DashboardCache::default());
        let key = query(DateRange::Last90Days);

        let older = cache.begin(&key);
        tokio::time::advance(Duration::from_secs(1)).await;
        let newer = cache.begin(&key);

        let newer_payload = payload();
        assert!(cache.complete(&newer, newer_payload.clone()));
        assert!(!cache.complete(&older, payload()));

        let hit = cache.get_fresh(&key).unwrap();
        assert!(Arc::ptr_eq(&hit, &newer_payload));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = Arc::new(DashboardCache::default());
        let a = query(DateRange::Last7Days);
        let b = query(DateRange::LastYear);

        let ticket = cache.begin(&b);
        assert!(cache.complete(&ticket, payload()));
        cache.invalidate(&a);

        assert!(cache.get_fresh(&b).is_some());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
