//! In-memory backend for tests and demos.
//!
//! Stores table rows the way the hosted backend does (`events.platform_id`
//! referencing `platforms.id`) and performs the platform join on read.
//! Fetches can be scripted with delays and failures to exercise overlapping
//! loads.

use crate::backend::{
    AdminBackend, BackendFuture, CatalogBackend, ChangeNotice, ChangeStream, ChangeTable,
    UploadFile, upload_object_path,
};
use crate::error::BackendError;
use crate::model::RawRecord;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use techevents_core::environment::{Clock, SystemClock};
use tokio::sync::broadcast;

/// One scripted answer to a fetch.
#[derive(Debug, Clone)]
pub struct ScriptedFetch {
    /// How long the call takes
    pub delay: Duration,
    /// Rows to return, or the failure
    pub result: Result<Vec<RawRecord>, BackendError>,
}

impl ScriptedFetch {
    /// Succeed with `rows` after `delay`.
    #[must_use]
    pub fn rows(delay: Duration, rows: Vec<RawRecord>) -> Self {
        Self {
            delay,
            result: Ok(rows),
        }
    }

    /// Fail with `error` after `delay`.
    #[must_use]
    pub fn fail(delay: Duration, error: BackendError) -> Self {
        Self {
            delay,
            result: Err(error),
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    events: Vec<RawRecord>,
    platforms: Vec<RawRecord>,
    objects: HashMap<String, Vec<u8>>,
    event_script: VecDeque<ScriptedFetch>,
    platform_script: VecDeque<ScriptedFetch>,
    next_id: u64,
}

/// In-memory implementation of [`CatalogBackend`] and [`AdminBackend`].
///
/// Clones share the same tables.
#[derive(Clone)]
pub struct InMemoryBackend {
    tables: Arc<Mutex<Tables>>,
    changes: broadcast::Sender<ChangeNotice>,
    event_fetches: Arc<AtomicUsize>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            changes,
            event_fetches: Arc::new(AtomicUsize::new(0)),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for upload timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed a platform row.
    #[must_use]
    pub fn with_platform(self, row: RawRecord) -> Self {
        self.tables().platforms.push(row);
        self
    }

    /// Seed an event row (with `platform_id`, not the joined sub-object).
    #[must_use]
    pub fn with_event(self, row: RawRecord) -> Self {
        self.tables().events.push(row);
        self
    }

    /// Queue scripted answers for the next `fetch_events` calls.
    pub fn script_events(&self, script: impl IntoIterator<Item = ScriptedFetch>) {
        self.tables().event_script.extend(script);
    }

    /// Queue scripted answers for the next `fetch_platforms` calls.
    pub fn script_platforms(&self, script: impl IntoIterator<Item = ScriptedFetch>) {
        self.tables().platform_script.extend(script);
    }

    /// Number of `fetch_events` calls so far.
    #[must_use]
    pub fn event_fetches(&self) -> usize {
        self.event_fetches.load(Ordering::SeqCst)
    }

    /// Number of open change subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Push a change notification to subscribers.
    pub fn notify(&self, table: ChangeTable) {
        let _ = self.changes.send(ChangeNotice { table });
    }

    /// Stored event row by id (table form, without the join).
    #[must_use]
    pub fn event_row(&self, id: &str) -> Option<RawRecord> {
        self.tables()
            .events
            .iter()
            .find(|row| row_id(row) == Some(id))
            .cloned()
    }

    /// Stored platform row by id.
    #[must_use]
    pub fn platform_row(&self, id: &str) -> Option<RawRecord> {
        self.tables()
            .platforms
            .iter()
            .find(|row| row_id(row) == Some(id))
            .cloned()
    }

    /// Whether an uploaded object exists at `path`.
    #[must_use]
    pub fn has_object(&self, path: &str) -> bool {
        self.tables().objects.contains_key(path)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, BackendError> {
        self.tables
            .lock()
            .map_err(|_| BackendError::Request("in-memory tables poisoned".to_string()))
    }

    // Seeding and inspection helpers ignore poisoning.
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn joined_events(tables: &Tables) -> Vec<RawRecord> {
        let mut rows: Vec<RawRecord> = tables
            .events
            .iter()
            .map(|row| join_platform(row, &tables.platforms))
            .collect();
        // newest first, like `order=created_at.desc`
        rows.sort_by(|a, b| text_field(b, "created_at").cmp(text_field(a, "created_at")));
        rows
    }

    fn sorted_platforms(tables: &Tables) -> Vec<RawRecord> {
        let mut rows = tables.platforms.clone();
        rows.sort_by(|a, b| text_field(a, "name").cmp(text_field(b, "name")));
        rows
    }

    fn public_url(bucket: &str, path: &str) -> String {
        format!("memory://{bucket}/{path}")
    }

    fn store_object(&self, file: UploadFile, owner: &str) -> Result<String, BackendError> {
        let path = upload_object_path(owner, self.clock.now().timestamp_millis(), &file.name);
        self.lock()?.objects.insert(path.clone(), file.bytes);
        Ok(path)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("event_fetches", &self.event_fetches())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

fn row_id(row: &RawRecord) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn text_field<'a>(row: &'a RawRecord, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn join_platform(row: &RawRecord, platforms: &[RawRecord]) -> RawRecord {
    let mut joined = row.clone();
    let platform = row
        .get("platform_id")
        .and_then(Value::as_str)
        .and_then(|id| platforms.iter().find(|p| row_id(p) == Some(id)))
        .cloned()
        .unwrap_or(Value::Null);
    if let Some(map) = joined.as_object_mut() {
        map.insert("platform".to_string(), platform);
    }
    joined
}

fn merge_into(target: &mut RawRecord, patch: RawRecord) {
    if let (Some(target), Value::Object(patch)) = (target.as_object_mut(), patch) {
        target.extend(patch);
    }
}

impl CatalogBackend for InMemoryBackend {
    fn fetch_events(&self) -> BackendFuture<'_, Vec<RawRecord>> {
        Box::pin(async move {
            self.event_fetches.fetch_add(1, Ordering::SeqCst);
            let (scripted, rows) = {
                let mut tables = self.lock()?;
                let scripted = tables.event_script.pop_front();
                let rows = Self::joined_events(&tables);
                (scripted, rows)
            };

            match scripted {
                Some(script) => {
                    tokio::time::sleep(script.delay).await;
                    script.result
                },
                None => Ok(rows),
            }
        })
    }

    fn fetch_platforms(&self) -> BackendFuture<'_, Vec<RawRecord>> {
        Box::pin(async move {
            let (scripted, rows) = {
                let mut tables = self.lock()?;
                let scripted = tables.platform_script.pop_front();
                let rows = Self::sorted_platforms(&tables);
                (scripted, rows)
            };

            match scripted {
                Some(script) => {
                    tokio::time::sleep(script.delay).await;
                    script.result
                },
                None => Ok(rows),
            }
        })
    }

    fn fetch_event<'a>(&'a self, id: &'a str) -> BackendFuture<'a, Option<RawRecord>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables
                .events
                .iter()
                .find(|row| row_id(row) == Some(id))
                .map(|row| join_platform(row, &tables.platforms)))
        })
    }

    fn record_view<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let row = tables
                .events
                .iter_mut()
                .find(|row| row_id(row) == Some(id))
                .ok_or_else(|| BackendError::NotFound(format!("event {id}")))?;

            let views = row.get("view_count").and_then(Value::as_u64).unwrap_or(0);
            merge_into(row, serde_json::json!({ "view_count": views + 1 }));
            Ok(())
        })
    }

    fn subscribe_changes(&self) -> BackendFuture<'_, ChangeStream> {
        Box::pin(async move {
            let mut rx = self.changes.subscribe();
            let stream = async_stream::stream! {
                loop {
                    match rx.recv().await {
                        Ok(notice) => yield notice,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Change subscriber lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };
            Ok(Box::pin(stream) as ChangeStream)
        })
    }
}

impl AdminBackend for InMemoryBackend {
    fn save_event<'a>(&'a self, id: Option<&'a str>, row: RawRecord) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let saved = {
                let mut tables = self.lock()?;
                match id {
                    Some(id) => {
                        let existing = tables
                            .events
                            .iter_mut()
                            .find(|r| row_id(r) == Some(id))
                            .ok_or_else(|| BackendError::NotFound(format!("event {id}")))?;
                        merge_into(existing, row);
                        id.to_string()
                    },
                    None => {
                        tables.next_id += 1;
                        let new_id = format!("mem-{}", tables.next_id);
                        let mut inserted = row;
                        merge_into(
                            &mut inserted,
                            serde_json::json!({
                                "id": new_id,
                                "view_count": 0,
                                "created_at": self.clock.now().to_rfc3339(),
                            }),
                        );
                        tables.events.push(inserted);
                        new_id
                    },
                }
            };
            self.notify(ChangeTable::Events);
            Ok(saved)
        })
    }

    fn set_event_images<'a>(&'a self, id: &'a str, images: Vec<String>) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            {
                let mut tables = self.lock()?;
                let row = tables
                    .events
                    .iter_mut()
                    .find(|r| row_id(r) == Some(id))
                    .ok_or_else(|| BackendError::NotFound(format!("event {id}")))?;
                merge_into(row, serde_json::json!({ "images": images }));
            }
            self.notify(ChangeTable::Events);
            Ok(())
        })
    }

    fn delete_event<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.lock()?.events.retain(|r| row_id(r) != Some(id));
            self.notify(ChangeTable::Events);
            Ok(())
        })
    }

    fn save_platform(&self, row: RawRecord, update: bool) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            {
                let mut tables = self.lock()?;
                let id = row_id(&row)
                    .ok_or_else(|| BackendError::Request("platform row without id".to_string()))?
                    .to_string();
                let existing = tables.platforms.iter().position(|r| row_id(r) == Some(&id));
                match (existing, update) {
                    (Some(index), true) => merge_into(&mut tables.platforms[index], row),
                    (None, false) => tables.platforms.push(row),
                    (Some(_), false) => {
                        return Err(BackendError::Status {
                            status: 409,
                            message: format!("platform {id} already exists"),
                        });
                    },
                    (None, true) => return Err(BackendError::NotFound(format!("platform {id}"))),
                }
            }
            self.notify(ChangeTable::Platforms);
            Ok(())
        })
    }

    fn delete_platform<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.lock()?.platforms.retain(|r| row_id(r) != Some(id));
            self.notify(ChangeTable::Platforms);
            Ok(())
        })
    }

    fn upload_images<'a>(
        &'a self,
        owner: &'a str,
        files: Vec<UploadFile>,
    ) -> BackendFuture<'a, Vec<String>> {
        Box::pin(async move {
            files
                .into_iter()
                .map(|file| {
                    self.store_object(file, owner)
                        .map(|path| Self::public_url("event-images", &path))
                })
                .collect()
        })
    }

    fn upload_logo<'a>(&'a self, owner: &'a str, file: UploadFile) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let path = self.store_object(file, owner)?;
            Ok(Self::public_url("platform-logos", &path))
        })
    }
}
