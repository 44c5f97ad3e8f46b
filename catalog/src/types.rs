//! Catalog view state and actions.

use crate::backend::ChangeNotice;
use crate::error::FetchFailure;
use crate::filter::FilterSpec;
use crate::mapper::RejectedRecord;
use crate::model::{Event, Platform};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Load phase of the catalog.
///
/// A failed load returns to `Ready` with [`CatalogState::last_error`] set;
/// there is no separate error phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// A load is in flight
    #[default]
    Loading,
    /// The lists reflect the latest completed load
    Ready,
}

/// Everything the catalog view owns.
///
/// `visible` caches the filter result as indices into `events` and is
/// recomputed whenever `events` or `filter` changes. The cache is not
/// serialized, and the state is only ever built through the reducer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogState {
    /// Loaded events, newest first
    pub events: Vec<Event>,
    /// Loaded platforms, by name
    pub platforms: Vec<Platform>,
    /// Active filter
    pub filter: FilterSpec,
    /// Load phase
    pub phase: Phase,
    /// Sequence number of the most recent load request
    pub latest_request: u64,
    /// Failure of the most recent load, cleared by the next success
    pub last_error: Option<FetchFailure>,
    /// Rows dropped by the most recent successful load
    pub rejected: Vec<RejectedRecord>,
    #[serde(skip)]
    visible: Vec<usize>,
}

impl CatalogState {
    /// Fresh state, waiting for the first load.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the filtered view against `now`.
    pub fn refilter(&mut self, now: DateTime<FixedOffset>) {
        self.visible = if self.filter.is_unfiltered() {
            (0..self.events.len()).collect()
        } else {
            self.events
                .iter()
                .enumerate()
                .filter(|(_, event)| self.filter.matches(event, now))
                .map(|(i, _)| i)
                .collect()
        };
    }

    /// Events passing the active filter, in load order.
    pub fn visible_events(&self) -> impl Iterator<Item = &Event> {
        self.visible.iter().filter_map(|&i| self.events.get(i))
    }

    /// Whether a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Snapshot for presentation.
    #[must_use]
    pub fn view(&self) -> CatalogView {
        CatalogView {
            events: self.visible_events().cloned().collect(),
            is_loading: self.is_loading(),
            error: self.last_error.clone(),
        }
    }
}

/// What presentation renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogView {
    /// Filtered events
    pub events: Vec<Event>,
    /// Whether a load is in flight
    pub is_loading: bool,
    /// Failure to show next to the (possibly stale) list
    pub error: Option<FetchFailure>,
}

impl CatalogView {
    /// Loaded fine, nothing matches. Rendered as "no results", not as an error.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.events.is_empty()
    }
}

/// Inputs to the catalog reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogAction {
    /// Fetch events and platforms (explicit refetch)
    RequestLoad,

    /// Both fetches resolved and mapped
    LoadSucceeded {
        /// Sequence number of the request this answers
        request: u64,
        /// Mapped events with known platforms
        events: Vec<Event>,
        /// Mapped platforms
        platforms: Vec<Platform>,
        /// Rows dropped while mapping
        rejected: Vec<RejectedRecord>,
    },

    /// A fetch or, under the fail-batch policy, the mapping failed
    LoadFailed {
        /// Sequence number of the request this answers
        request: u64,
        /// What went wrong
        error: FetchFailure,
    },

    /// Replace the active filter
    SetFilter(FilterSpec),

    /// Back to all wildcards
    ResetFilters,

    /// The backend pushed a change notice
    ChangesReceived(ChangeNotice),
}
