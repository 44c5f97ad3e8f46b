//! Catalog view-state controller.
//!
//! Owns a [`Store`] running the [`CatalogReducer`] and is the single logical
//! owner of the catalog state. Presentation reads [`CatalogView`] snapshots;
//! every mutation goes through an action.

use crate::detail::load_event_detail;
use crate::error::{ControllerError, DetailError};
use crate::filter::FilterSpec;
use crate::model::{Event, Platform};
use crate::ranking::top_by_views;
use crate::reducer::{CatalogEnvironment, CatalogReducer};
use crate::stats::{CatalogStats, Category};
use crate::types::{CatalogAction, CatalogState, CatalogView};
use futures::StreamExt;
use std::time::Duration;
use techevents_runtime::{EffectHandle, Store};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Store type driving the catalog.
pub type CatalogStore = Store<CatalogState, CatalogAction, CatalogEnvironment, CatalogReducer>;

/// Front door for presentation code.
#[derive(Clone)]
pub struct CatalogController {
    store: CatalogStore,
    env: CatalogEnvironment,
}

impl CatalogController {
    /// Create a controller in the `Loading` phase. Nothing is fetched until
    /// [`CatalogController::load`] is called.
    #[must_use]
    pub fn new(env: CatalogEnvironment) -> Self {
        let store = Store::new(CatalogState::new(), CatalogReducer::new(), env.clone());
        Self { store, env }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Fetch events and platforms and wait for the result to land.
    ///
    /// A failed fetch is not an error here; it shows up as
    /// [`CatalogView::error`] with the previous list kept.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store is shutting down or the
    /// load does not finish within the configured timeout.
    pub async fn load(&self) -> Result<CatalogView, ControllerError> {
        self.dispatch(CatalogAction::RequestLoad).await
    }

    /// Explicit refetch. Same as [`CatalogController::load`].
    ///
    /// # Errors
    ///
    /// Same as [`CatalogController::load`].
    pub async fn refetch(&self) -> Result<CatalogView, ControllerError> {
        self.load().await
    }

    /// Start a load without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store is shutting down.
    pub async fn request_load(&self) -> Result<EffectHandle, ControllerError> {
        Ok(self.store.send(CatalogAction::RequestLoad).await?)
    }

    /// Replace the active filter and return the recomputed view.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store is shutting down.
    pub async fn set_filter(&self, spec: FilterSpec) -> Result<CatalogView, ControllerError> {
        self.dispatch(CatalogAction::SetFilter(spec)).await
    }

    /// Clear every filter and return the recomputed view.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store is shutting down.
    pub async fn reset_filters(&self) -> Result<CatalogView, ControllerError> {
        self.dispatch(CatalogAction::ResetFilters).await
    }

    /// Current filtered events and loading flag.
    pub async fn current_view(&self) -> CatalogView {
        self.store.state(CatalogState::view).await
    }

    /// Active filter.
    pub async fn filter(&self) -> FilterSpec {
        self.store.state(|s| s.filter.clone()).await
    }

    /// Loaded platforms, by name.
    pub async fn platforms(&self) -> Vec<Platform> {
        self.store.state(|s| s.platforms.clone()).await
    }

    /// Most viewed loaded events, ignoring the filter.
    pub async fn top_viewed(&self) -> Vec<Event> {
        let n = self.env.settings.top_viewed;
        self.store
            .state(|s| top_by_views(&s.events, n).into_iter().cloned().collect())
            .await
    }

    /// Counters over the loaded lists.
    pub async fn stats(&self) -> CatalogStats {
        self.store
            .state(|s| CatalogStats::collect(&s.events, &s.platforms))
            .await
    }

    /// Events a category page shows, using the category's own preset.
    pub async fn browse(&self, category: Category) -> Vec<Event> {
        let now = self.env.now();
        self.store
            .state(|s| {
                category
                    .select(&s.events, &category.preset(), now)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Load one event for the detail view and count the view.
    ///
    /// # Errors
    ///
    /// See [`load_event_detail`].
    pub async fn event_detail(&self, id: &str) -> Result<Event, DetailError> {
        load_event_detail(self.env.backend.as_ref(), id).await
    }

    /// Actions fed back by load effects (`LoadSucceeded`, `LoadFailed`).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogAction> {
        self.store.subscribe_actions()
    }

    /// Refetch everything whenever the backend reports a change.
    ///
    /// The subscription lives until the returned guard is dropped or
    /// [`ChangeSubscription::unsubscribe`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Backend`] if the backend cannot push changes.
    pub async fn watch_changes(&self) -> Result<ChangeSubscription, ControllerError> {
        let mut changes = self.env.backend.subscribe_changes().await?;
        let store = self.store.clone();

        let task = tokio::spawn(async move {
            while let Some(notice) = changes.next().await {
                if let Err(error) = store.send(CatalogAction::ChangesReceived(notice)).await {
                    tracing::debug!(%error, "Stopping change watch");
                    break;
                }
            }
        });

        tracing::info!("Watching backend changes");
        Ok(ChangeSubscription { task: Some(task) })
    }

    /// Stop accepting actions and wait for in-flight loads.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if loads are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ControllerError> {
        Ok(self.store.shutdown(timeout).await?)
    }

    async fn dispatch(&self, action: CatalogAction) -> Result<CatalogView, ControllerError> {
        let mut handle = self.store.send(action).await?;
        handle
            .wait_with_timeout(self.env.settings.load_timeout())
            .await?;
        Ok(self.current_view().await)
    }
}

/// Live change subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeSubscription {
    task: Option<JoinHandle<()>>,
}

impl ChangeSubscription {
    /// Unsubscribe and wait until the backend channel is released.
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    /// Whether the forwarding task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
