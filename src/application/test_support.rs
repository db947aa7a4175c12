// Scripted dashboard source for service and hook tests
use crate::application::dashboard_source::DashboardSource;
use crate::application::mock_generator::MockDashboardGenerator;
use crate::domain::dashboard::DashboardPayload;
use crate::domain::date_range::{DashboardQuery, DateRange};
use crate::domain::error::FetchFailure;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Scripted {
    delay: Duration,
    result: Result<DashboardPayload, FetchFailure>,
}

/// Replays queued responses per date range; answers with a generated payload
/// once a range's queue is empty.
pub struct ScriptedSource {
    scripts: Mutex<HashMap<DateRange, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<DateRange, usize>>,
    total: AtomicUsize,
    generator: MockDashboardGenerator,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
            generator: MockDashboardGenerator::seeded(11),
        }
    }

    pub fn push(
        &self,
        range: DateRange,
        delay: Duration,
        result: Result<DashboardPayload, FetchFailure>,
    ) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(range)
            .or_default()
            .push_back(Scripted { delay, result });
        self
    }

    pub fn push_failure(&self, range: DateRange, failure: FetchFailure) -> &Self {
        self.push(range, Duration::ZERO, Err(failure))
    }

    pub fn payload(&self, range: DateRange) -> DashboardPayload {
        self.generator.generate(range).unwrap()
    }

    pub fn calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, range: DateRange) -> usize {
        self.calls.lock().unwrap().get(&range).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DashboardSource for ScriptedSource {
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardPayload, FetchFailure> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap()
            .entry(query.date_range)
            .or_insert(0) += 1;

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&query.date_range)
            .and_then(VecDeque::pop_front);

        match next {
            Some(scripted) => {
                if !scripted.delay.is_zero() {
                    tokio::time::sleep(scripted.delay).await;
                }
                scripted.result
            }
            None => Ok(self.payload(query.date_range)),
        }
    }
}

pub fn transport_failure() -> FetchFailure {
    FetchFailure::Transport("connection refused".to_string())
}

pub fn unauthorized() -> FetchFailure {
    FetchFailure::Auth {
        status: 401,
        message: "Unauthorized: Please log in again".to_string(),
    }
}
