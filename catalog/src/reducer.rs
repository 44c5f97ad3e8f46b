//! Catalog reducer: load lifecycle, filter changes, change-notice refetch.
//!
//! Every load request bumps [`CatalogState::latest_request`] and tags its
//! effect with the new value. Overlapping loads are not cancelled; an answer
//! whose tag is not the latest is dropped, so the most recent request wins
//! regardless of arrival order.

use crate::backend::CatalogBackend;
use crate::config::CatalogSettings;
use crate::error::{FetchFailure, FetchSource};
use crate::mapper::{RecordPolicy, link_platforms, map_batch, map_platform_batch};
use crate::model::RawRecord;
use crate::types::{CatalogAction, CatalogState, Phase};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use std::time::Instant;
use techevents_core::effect::Effect;
use techevents_core::environment::Clock;
use techevents_core::reducer::Reducer;
use techevents_core::{SmallVec, smallvec};
use techevents_runtime::metrics::LoadMetrics;

/// Dependencies of the catalog reducer.
#[derive(Clone)]
pub struct CatalogEnvironment {
    /// Read side of the backend
    pub backend: Arc<dyn CatalogBackend>,
    /// Time source for date buckets
    pub clock: Arc<dyn Clock>,
    /// Tunables
    pub settings: CatalogSettings,
}

impl CatalogEnvironment {
    /// Creates a new catalog environment
    #[must_use]
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        clock: Arc<dyn Clock>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            backend,
            clock,
            settings,
        }
    }

    /// Current time in the configured offset.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.settings.utc_offset)
    }
}

/// Output of a successful fetch-and-map.
struct Loaded {
    events: Vec<crate::model::Event>,
    platforms: Vec<crate::model::Platform>,
    rejected: Vec<crate::mapper::RejectedRecord>,
}

/// Reducer for the catalog view state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogReducer;

impl CatalogReducer {
    /// Creates a new catalog reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn start_load(state: &mut CatalogState, env: &CatalogEnvironment) -> Effect<CatalogAction> {
        state.latest_request += 1;
        state.phase = Phase::Loading;
        Self::load_effect(env, state.latest_request)
    }

    /// Fetch events and platforms concurrently, then map them.
    ///
    /// Either fetch failing fails the whole load.
    fn load_effect(env: &CatalogEnvironment, request: u64) -> Effect<CatalogAction> {
        let backend = Arc::clone(&env.backend);
        let policy = env.settings.record_policy;

        Effect::future(async move {
            LoadMetrics::record_started();
            let started = Instant::now();

            let fetched = futures::future::try_join(
                async {
                    backend
                        .fetch_events()
                        .await
                        .map_err(|e| FetchFailure::backend(FetchSource::Events, &e))
                },
                async {
                    backend
                        .fetch_platforms()
                        .await
                        .map_err(|e| FetchFailure::backend(FetchSource::Platforms, &e))
                },
            )
            .await;
            LoadMetrics::record_fetch(started.elapsed());

            match fetched.and_then(|(events, platforms)| Self::map_rows(&events, &platforms, policy)) {
                Ok(loaded) => {
                    LoadMetrics::record_succeeded();
                    LoadMetrics::record_rejected(loaded.rejected.len());
                    tracing::debug!(
                        request,
                        events = loaded.events.len(),
                        platforms = loaded.platforms.len(),
                        rejected = loaded.rejected.len(),
                        "Catalog load finished"
                    );
                    Some(CatalogAction::LoadSucceeded {
                        request,
                        events: loaded.events,
                        platforms: loaded.platforms,
                        rejected: loaded.rejected,
                    })
                },
                Err(error) => {
                    LoadMetrics::record_failed();
                    tracing::warn!(request, %error, "Catalog load failed");
                    Some(CatalogAction::LoadFailed { request, error })
                },
            }
        })
    }

    /// Platforms first, so events can be checked against them.
    fn map_rows(
        event_rows: &[RawRecord],
        platform_rows: &[RawRecord],
        policy: RecordPolicy,
    ) -> Result<Loaded, FetchFailure> {
        let platforms =
            map_platform_batch(platform_rows, policy).map_err(|e| FetchFailure::mapping(&e))?;
        let events = map_batch(event_rows, policy).map_err(|e| FetchFailure::mapping(&e))?;
        let linked = link_platforms(events.records, &platforms.records, policy)
            .map_err(|e| FetchFailure::mapping(&e))?;

        let mut rejected = platforms.rejected;
        rejected.extend(events.rejected);
        rejected.extend(linked.rejected);

        Ok(Loaded {
            events: linked.records,
            platforms: platforms.records,
            rejected,
        })
    }

    fn is_stale(state: &CatalogState, request: u64) -> bool {
        if request == state.latest_request {
            return false;
        }
        LoadMetrics::record_stale();
        tracing::debug!(
            request,
            latest = state.latest_request,
            "Dropping stale catalog response"
        );
        true
    }
}

impl Reducer for CatalogReducer {
    type State = CatalogState;
    type Action = CatalogAction;
    type Environment = CatalogEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CatalogAction::RequestLoad => smallvec![Self::start_load(state, env)],

            CatalogAction::ChangesReceived(notice) => {
                tracing::info!(table = ?notice.table, "Backend changed, refetching catalog");
                smallvec![Self::start_load(state, env)]
            },

            CatalogAction::LoadSucceeded {
                request,
                events,
                platforms,
                rejected,
            } => {
                if Self::is_stale(state, request) {
                    return smallvec![Effect::None];
                }
                state.events = events;
                state.platforms = platforms;
                state.rejected = rejected;
                state.last_error = None;
                state.phase = Phase::Ready;
                state.refilter(env.now());
                smallvec![Effect::None]
            },

            CatalogAction::LoadFailed { request, error } => {
                if Self::is_stale(state, request) {
                    return smallvec![Effect::None];
                }
                // previous lists stay visible next to the error
                state.last_error = Some(error);
                state.phase = Phase::Ready;
                smallvec![Effect::None]
            },

            CatalogAction::SetFilter(spec) => {
                state.filter = spec;
                state.refilter(env.now());
                smallvec![Effect::None]
            },

            CatalogAction::ResetFilters => {
                state.filter = crate::filter::FilterSpec::default();
                state.refilter(env.now());
                smallvec![Effect::None]
            },
        }
    }
}
