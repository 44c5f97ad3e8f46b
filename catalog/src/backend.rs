//! Backend collaborator boundary.
//!
//! The catalog never talks to storage directly. It consumes these traits,
//! implemented by the REST adapter in production and by
//! [`InMemoryBackend`](crate::mocks::InMemoryBackend) in tests and demos.
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! backend can be held as `Arc<dyn CatalogBackend>` and captured by effects.

use crate::error::BackendError;
use crate::model::RawRecord;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by backend methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Stream of change notifications. Dropping it unsubscribes.
pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeNotice> + Send>>;

/// Table a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTable {
    /// The `events` table
    Events,
    /// The `platforms` table
    Platforms,
}

/// Something changed in the backend.
///
/// The catalog does not patch incrementally; any notice triggers a full refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Which table changed
    pub table: ChangeTable,
}

/// Read side of the backend, consumed by the catalog.
pub trait CatalogBackend: Send + Sync {
    /// Events left-joined with their platform, newest `created_at` first.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the query fails.
    fn fetch_events(&self) -> BackendFuture<'_, Vec<RawRecord>>;

    /// Platform rows ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the query fails.
    fn fetch_platforms(&self) -> BackendFuture<'_, Vec<RawRecord>>;

    /// One joined event row, or `None` if no event has this id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the query fails.
    fn fetch_event<'a>(&'a self, id: &'a str) -> BackendFuture<'a, Option<RawRecord>>;

    /// Increment an event's view count.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the update fails.
    fn record_view<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()>;

    /// Subscribe to change notifications for events and platforms.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unsupported`] if the backend has no push channel.
    fn subscribe_changes(&self) -> BackendFuture<'_, ChangeStream>;
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name
    pub name: String,
    /// MIME type
    pub content_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

/// Write side of the backend, used by the admin workflows only.
///
/// Authorization is enforced by the backend (row-level security, storage
/// policies), never by the caller.
pub trait AdminBackend: Send + Sync {
    /// Insert (`id == None`) or update an event row. Returns the row id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the write fails.
    fn save_event<'a>(&'a self, id: Option<&'a str>, row: RawRecord) -> BackendFuture<'a, String>;

    /// Replace an event's image list.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the update fails.
    fn set_event_images<'a>(&'a self, id: &'a str, images: Vec<String>) -> BackendFuture<'a, ()>;

    /// Delete an event.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the delete fails.
    fn delete_event<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()>;

    /// Insert (`update == false`) or update a platform row keyed by its `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the write fails.
    fn save_platform(&self, row: RawRecord, update: bool) -> BackendFuture<'_, ()>;

    /// Delete a platform.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the delete fails.
    fn delete_platform<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()>;

    /// Upload event images under `owner`, returning public URLs in input order.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on the first failed upload.
    fn upload_images<'a>(
        &'a self,
        owner: &'a str,
        files: Vec<UploadFile>,
    ) -> BackendFuture<'a, Vec<String>>;

    /// Upload a platform logo under `owner`, returning its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the upload fails.
    fn upload_logo<'a>(&'a self, owner: &'a str, file: UploadFile) -> BackendFuture<'a, String>;
}

/// Storage object path for an upload: `{owner}/{millis}-{file_name}`.
///
/// ```
/// use techevents_catalog::backend::upload_object_path;
///
/// assert_eq!(upload_object_path("evt-1", 1_700_000_000_000, "cover.png"), "evt-1/1700000000000-cover.png");
/// ```
#[must_use]
pub fn upload_object_path(owner: &str, millis: i64, file_name: &str) -> String {
    format!("{owner}/{millis}-{file_name}")
}
