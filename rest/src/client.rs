//! REST and storage client for the hosted backend.
//!
//! Tables are read and written through the PostgREST interface under
//! `/rest/v1`, files through the storage API under `/storage/v1`. Row-level
//! security on the service decides what a caller may write; this client only
//! forwards the configured credentials.

use crate::config::RestConfig;
use crate::error::{RestError, decode_failed, request_failed};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use techevents_catalog::backend::{
    AdminBackend, BackendFuture, CatalogBackend, ChangeStream, UploadFile, upload_object_path,
};
use techevents_catalog::{BackendError, RawRecord};
use techevents_core::environment::{Clock, SystemClock};

/// Event rows with the owning platform embedded as `platform`.
const EVENT_SELECT: &str = "*,platform:platforms(*)";

/// Hosted backend adapter implementing both catalog traits.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    config: RestConfig,
    base: Url,
    clock: Arc<dyn Clock>,
}

impl RestBackend {
    /// Create a backend for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidUrl`] if the base URL does not parse and
    /// [`RestError::Client`] if the HTTP client cannot be built.
    pub fn new(config: RestConfig) -> Result<Self, RestError> {
        let base = Url::parse(&config.base_url).map_err(|e| RestError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RestError::InvalidUrl(config.base_url));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RestError::Client(e.to_string()))?;

        Ok(Self {
            client,
            config,
            base,
            clock: Arc::new(SystemClock),
        })
    }

    /// Create a backend from environment variables.
    ///
    /// # Errors
    ///
    /// See [`RestConfig::from_env`] and [`RestBackend::new`].
    pub fn from_env() -> Result<Self, RestError> {
        Self::new(RestConfig::from_env()?)
    }

    /// Use `clock` for upload timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RestConfig {
        &self.config
    }

    /// Base URL extended by `segments`, each percent-encoded.
    fn url<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn table_url(&self, table: &str) -> Url {
        self.url(["rest", "v1", table])
    }

    /// Public URL of a stored object.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.url(
            ["storage", "v1", "object", "public", bucket]
                .into_iter()
                .chain(path.split('/')),
        )
        .to_string()
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.config.bearer())
    }

    async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await.map_err(|e| request_failed(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), %message, "Backend rejected request");
        match status {
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(message)),
            status => Err(BackendError::Status {
                status: status.as_u16(),
                message,
            }),
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BackendError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| decode_failed(&e))
    }

    async fn upload(&self, bucket: &str, owner: &str, file: UploadFile) -> Result<String, BackendError> {
        let path = upload_object_path(owner, self.clock.now().timestamp_millis(), &file.name);
        let url = self.url(
            ["storage", "v1", "object", bucket]
                .into_iter()
                .chain(path.split('/')),
        );

        Self::send(
            self.request(Method::POST, url)
                .header("content-type", file.content_type)
                .header("cache-control", "3600")
                .header("x-upsert", "false")
                .body(file.bytes),
        )
        .await?;

        tracing::debug!(bucket, %path, "Uploaded object");
        Ok(self.public_url(bucket, &path))
    }
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.config.access_token.is_some())
            .finish_non_exhaustive()
    }
}

fn eq_filter(id: &str) -> String {
    format!("eq.{id}")
}

/// Id of the first returned row; the service may hand back strings or numbers.
fn returned_id(rows: &[RawRecord]) -> Result<String, BackendError> {
    match rows.first().and_then(|row| row.get("id")) {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(BackendError::Decode("write returned no row id".to_string())),
    }
}

impl CatalogBackend for RestBackend {
    fn fetch_events(&self) -> BackendFuture<'_, Vec<RawRecord>> {
        Box::pin(async move {
            let builder = self
                .request(Method::GET, self.table_url(&self.config.events_table))
                .query(&[("select", EVENT_SELECT), ("order", "created_at.desc")]);
            Self::send_json::<Vec<RawRecord>>(builder).await
        })
    }

    fn fetch_platforms(&self) -> BackendFuture<'_, Vec<RawRecord>> {
        Box::pin(async move {
            let builder = self
                .request(Method::GET, self.table_url(&self.config.platforms_table))
                .query(&[("select", "*"), ("order", "name.asc")]);
            Self::send_json::<Vec<RawRecord>>(builder).await
        })
    }

    fn fetch_event<'a>(&'a self, id: &'a str) -> BackendFuture<'a, Option<RawRecord>> {
        Box::pin(async move {
            let builder = self
                .request(Method::GET, self.table_url(&self.config.events_table))
                .query(&[("select", EVENT_SELECT), ("id", eq_filter(id).as_str()), ("limit", "1")]);
            let rows: Vec<RawRecord> = Self::send_json(builder).await?;
            Ok(rows.into_iter().next())
        })
    }

    fn record_view<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let url = self.url(["rest", "v1", "rpc", self.config.view_rpc.as_str()]);
            Self::send(self.request(Method::POST, url).json(&json!({ "event_id": id }))).await?;
            Ok(())
        })
    }

    fn subscribe_changes(&self) -> BackendFuture<'_, ChangeStream> {
        Box::pin(async {
            Err::<ChangeStream, _>(BackendError::Unsupported(
                "realtime change feed is not available over REST".to_string(),
            ))
        })
    }
}

impl AdminBackend for RestBackend {
    fn save_event<'a>(&'a self, id: Option<&'a str>, row: RawRecord) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let url = self.table_url(&self.config.events_table);
            let builder = match id {
                Some(id) => self.request(Method::PATCH, url).query(&[("id", eq_filter(id))]),
                None => self.request(Method::POST, url),
            };
            let rows: Vec<RawRecord> = Self::send_json(
                builder
                    .header("prefer", "return=representation")
                    .json(&row),
            )
            .await?;

            if let Some(id) = id.filter(|_| rows.is_empty()) {
                return Err(BackendError::NotFound(format!("event {id}")));
            }
            returned_id(&rows)
        })
    }

    fn set_event_images<'a>(&'a self, id: &'a str, images: Vec<String>) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::PATCH, self.table_url(&self.config.events_table))
                .query(&[("id", eq_filter(id))])
                .json(&json!({ "images": images }));
            Self::send(builder).await?;
            Ok(())
        })
    }

    fn delete_event<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::DELETE, self.table_url(&self.config.events_table))
                .query(&[("id", eq_filter(id))]);
            Self::send(builder).await?;
            Ok(())
        })
    }

    fn save_platform(&self, row: RawRecord, update: bool) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let url = self.table_url(&self.config.platforms_table);
            let builder = if update {
                let id = row
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| BackendError::Request("platform row without id".to_string()))?;
                self.request(Method::PATCH, url).query(&[("id", eq_filter(id))])
            } else {
                self.request(Method::POST, url)
            };
            Self::send(builder.json(&row)).await?;
            Ok(())
        })
    }

    fn delete_platform<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::DELETE, self.table_url(&self.config.platforms_table))
                .query(&[("id", eq_filter(id))]);
            Self::send(builder).await?;
            Ok(())
        })
    }

    fn upload_images<'a>(
        &'a self,
        owner: &'a str,
        files: Vec<UploadFile>,
    ) -> BackendFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut urls = Vec::with_capacity(files.len());
            for file in files {
                urls.push(
                    self.upload(&self.config.event_images_bucket, owner, file)
                        .await?,
                );
            }
            Ok(urls)
        })
    }

    fn upload_logo<'a>(&'a self, owner: &'a str, file: UploadFile) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.upload(&self.config.platform_logos_bucket, owner, file)
                .await
        })
    }
}
