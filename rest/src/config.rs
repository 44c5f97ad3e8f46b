//! Connection settings for the hosted backend.

use crate::error::RestError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Where the backend lives and which tables and buckets to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co` (`SUPABASE_URL`)
    pub base_url: String,
    /// Public anon key sent as `apikey` (`SUPABASE_ANON_KEY`)
    pub anon_key: String,
    /// Signed-in user's access token; writes are authorized with it when set
    /// (`SUPABASE_ACCESS_TOKEN`)
    pub access_token: Option<String>,
    /// Events table (`EVENTS_TABLE`)
    pub events_table: String,
    /// Platforms table (`PLATFORMS_TABLE`)
    pub platforms_table: String,
    /// Bucket for event images (`EVENT_IMAGES_BUCKET`)
    pub event_images_bucket: String,
    /// Bucket for platform logos (`PLATFORM_LOGOS_BUCKET`)
    pub platform_logos_bucket: String,
    /// RPC that increments an event's view count (`VIEW_COUNT_RPC`)
    pub view_rpc: String,
    /// Request timeout in seconds (`REST_TIMEOUT`)
    pub timeout_secs: u64,
}

impl RestConfig {
    /// Settings for `base_url` with default table and bucket names.
    #[must_use]
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: None,
            events_table: "events".to_string(),
            platforms_table: "platforms".to_string(),
            event_images_bucket: "event-images".to_string(),
            platform_logos_bucket: "platform-logos".to_string(),
            view_rpc: "increment_view_count".to_string(),
            timeout_secs: 30,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::MissingConfig`] if `SUPABASE_URL` or
    /// `SUPABASE_ANON_KEY` is not set.
    pub fn from_env() -> Result<Self, RestError> {
        let base_url = env::var("SUPABASE_URL").map_err(|_| RestError::MissingConfig("SUPABASE_URL"))?;
        let anon_key =
            env::var("SUPABASE_ANON_KEY").map_err(|_| RestError::MissingConfig("SUPABASE_ANON_KEY"))?;
        let mut config = Self::new(base_url, anon_key);

        config.access_token = env::var("SUPABASE_ACCESS_TOKEN").ok();
        for (key, field) in [
            ("EVENTS_TABLE", &mut config.events_table),
            ("PLATFORMS_TABLE", &mut config.platforms_table),
            ("EVENT_IMAGES_BUCKET", &mut config.event_images_bucket),
            ("PLATFORM_LOGOS_BUCKET", &mut config.platform_logos_bucket),
            ("VIEW_COUNT_RPC", &mut config.view_rpc),
        ] {
            if let Ok(value) = env::var(key) {
                *field = value;
            }
        }
        config.timeout_secs = env::var("REST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(config.timeout_secs);

        Ok(config)
    }

    /// Attach a user access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Bearer token for the `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}
