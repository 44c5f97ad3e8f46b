//! # techevents catalog
//!
//! Query layer for the tech-events directory: turns backend rows into
//! normalized events, filters and ranks them, and keeps the catalog view state.
//!
//! ## Data flow
//!
//! ```text
//! backend rows ─▶ mapper ─▶ Vec<Event> ─▶ filter / ranking ─▶ CatalogView
//!                                  ▲
//!            CatalogReducer ───────┘   (load lifecycle, last-request-wins)
//! ```
//!
//! - [`mapper`]: raw rows to [`Event`] / [`Platform`], with a per-batch [`RecordPolicy`]
//! - [`filter`]: theme / platform / date bucket / mode predicates, AND-combined
//! - [`ranking`]: top-by-views, trending and popular partitions
//! - [`stats`]: dashboard counters and browse categories
//! - [`reducer`] / [`controller`]: the `Loading` / `Ready` state machine on a
//!   [`Store`](techevents_runtime::Store)
//! - [`backend`]: the collaborator traits; [`mocks`] has an in-memory implementation
//! - [`drafts`]: admin form drafts and submit workflows
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use techevents_catalog::{
//!     CatalogController, CatalogEnvironment, CatalogSettings, EventMode, FilterSpec,
//!     mocks::InMemoryBackend,
//! };
//! use techevents_core::environment::SystemClock;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let env = CatalogEnvironment::new(
//!     Arc::new(InMemoryBackend::new()),
//!     Arc::new(SystemClock),
//!     CatalogSettings::from_env()?,
//! );
//! let catalog = CatalogController::new(env);
//!
//! catalog.load().await?;
//! let view = catalog
//!     .set_filter(FilterSpec::default().with_mode(EventMode::Online))
//!     .await?;
//! println!("{} online events", view.events.len());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod controller;
pub mod detail;
pub mod drafts;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod mocks;
pub mod model;
pub mod ranking;
pub mod reducer;
pub mod stats;
pub mod types;

pub use backend::{AdminBackend, CatalogBackend, ChangeNotice, ChangeTable, UploadFile};
pub use config::CatalogSettings;
pub use controller::{CatalogController, ChangeSubscription};
pub use detail::load_event_detail;
pub use drafts::{AdminError, EventDraft, PlatformDraft, submit_event, submit_platform};
pub use error::{
    BackendError, ControllerError, DetailError, FetchFailure, FetchSource, MalformedRecordError,
};
pub use filter::{DateBucket, FilterSpec, Selection, filter};
pub use mapper::{RecordPolicy, map_batch, map_event, map_platform};
pub use model::{Event, EventMode, Platform, RawRecord, Theme};
pub use ranking::{popular, top_by_views, trending};
pub use reducer::{CatalogEnvironment, CatalogReducer};
pub use stats::{CatalogStats, Category};
pub use types::{CatalogAction, CatalogState, CatalogView, Phase};
