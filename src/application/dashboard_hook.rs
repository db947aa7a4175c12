// Dashboard hook - Per-session view state over the shared dashboard service
use crate::application::dashboard_service::{DashboardOutcome, DashboardService, FallbackNotice};
use crate::domain::dashboard::DashboardPayload;
use crate::domain::date_range::DashboardQuery;
use crate::domain::error::DashboardError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// What presentation renders: `payload` is absent while the first load for a
/// selection is still running.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub query: Option<DashboardQuery>,
    pub is_loading: bool,
    pub payload: Option<Arc<DashboardPayload>>,
    pub error_occurred: bool,
    pub notice: Option<FallbackNotice>,
}

impl DashboardState {
    fn loading(query: DashboardQuery) -> Self {
        Self {
            query: Some(query),
            is_loading: true,
            ..Self::default()
        }
    }

    fn ready(query: DashboardQuery, outcome: &DashboardOutcome) -> Self {
        Self {
            query: Some(query),
            is_loading: false,
            payload: Some(outcome.payload.clone()),
            error_occurred: outcome.error_occurred(),
            notice: outcome.notice(),
        }
    }

    fn failed(query: DashboardQuery) -> Self {
        Self {
            query: Some(query),
            is_loading: false,
            payload: None,
            error_occurred: true,
            notice: None,
        }
    }
}

#[derive(Debug, Default)]
struct Selection {
    query: Option<DashboardQuery>,
    generation: u64,
}

pub struct DashboardHook {
    service: DashboardService,
    state: watch::Sender<DashboardState>,
    selection: Mutex<Selection>,
}

impl DashboardHook {
    pub fn new(service: DashboardService) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            service,
            state,
            selection: Mutex::new(Selection::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub async fn request(
        &self,
        date_range: &str,
        project_id: Option<&str>,
    ) -> Result<DashboardState, DashboardError> {
        let query = DashboardQuery::parse(date_range, project_id)?;
        self.select(query).await
    }

    /// Make `query` the current selection and load it. The returned state is
    /// this query's result; it is only published if `query` is still selected
    /// when the load finishes.
    pub async fn select(&self, query: DashboardQuery) -> Result<DashboardState, DashboardError> {
        let generation = self.begin_selection(&query);
        let result = self.service.load(query.clone()).await;

        match result {
            Ok(outcome) => {
                let state = DashboardState::ready(query, &outcome);
                self.publish_if_current(generation, &state);
                Ok(state)
            }
            Err(err) => {
                tracing::error!("Dashboard load for {} failed: {}", query, err);
                self.publish_if_current(generation, &DashboardState::failed(query));
                Err(err)
            }
        }
    }

    fn begin_selection(&self, query: &DashboardQuery) -> u64 {
        let mut selection = self.lock_selection();
        selection.generation += 1;

        if let Some(previous) = selection.query.replace(query.clone()) {
            if previous != *query {
                tracing::debug!("Selection changed from {} to {}", previous, query);
                self.service.invalidate(&previous);
            }
        }

        let state = match self.service.cached(query) {
            Some(payload) => DashboardState {
                query: Some(query.clone()),
                is_loading: false,
                payload: Some(payload),
                error_occurred: false,
                notice: None,
            },
            None => DashboardState::loading(query.clone()),
        };
        self.state.send_replace(state);

        selection.generation
    }

    fn publish_if_current(&self, generation: u64, state: &DashboardState) {
        let selection = self.lock_selection();
        if selection.generation == generation {
            self.state.send_replace(state.clone());
        } else if let Some(query) = &state.query {
            tracing::debug!("Dropping result for deselected {}", query);
        }
    }

    fn lock_selection(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
