//! Catalog settings loaded from the environment.

use crate::error::ConfigError;
use crate::mapper::RecordPolicy;
use crate::ranking::DEFAULT_TOP_VIEWED;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Tunables for the catalog query layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// What a load does with a row that fails to map (`CATALOG_RECORD_POLICY`)
    pub record_policy: RecordPolicy,
    /// Size of the "top viewed" section (`CATALOG_TOP_VIEWED`)
    pub top_viewed: usize,
    /// Offset whose calendar day "today" refers to (`CATALOG_UTC_OFFSET`)
    ///
    /// Accepts `+05:30`, `Z` or a number of seconds east of UTC.
    #[serde(with = "offset_seconds")]
    pub utc_offset: FixedOffset,
    /// How long a controller call waits for a load to land, in seconds (`CATALOG_LOAD_TIMEOUT`)
    pub load_timeout_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            record_policy: RecordPolicy::default(),
            top_viewed: DEFAULT_TOP_VIEWED,
            utc_offset: utc(),
            load_timeout_secs: 30,
        }
    }
}

impl CatalogSettings {
    /// Load timeout as a duration.
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    /// Load settings from environment variables, falling back to defaults
    /// for unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogSettings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let record_policy = match lookup("CATALOG_RECORD_POLICY") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "CATALOG_RECORD_POLICY",
                value,
                reason: "expected skip_invalid or fail_batch",
            })?,
            None => defaults.record_policy,
        };

        let top_viewed = match lookup("CATALOG_TOP_VIEWED") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CATALOG_TOP_VIEWED",
                value,
                reason: "expected a non-negative integer",
            })?,
            None => defaults.top_viewed,
        };

        let utc_offset = match lookup("CATALOG_UTC_OFFSET") {
            Some(value) => parse_offset(&value).ok_or(ConfigError::Invalid {
                key: "CATALOG_UTC_OFFSET",
                value,
                reason: "expected +HH:MM, Z or seconds east of UTC",
            })?,
            None => defaults.utc_offset,
        };

        let load_timeout_secs = lookup("CATALOG_LOAD_TIMEOUT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.load_timeout_secs);

        Ok(Self {
            record_policy,
            top_viewed,
            utc_offset,
            load_timeout_secs,
        })
    }
}

/// Parse `+05:30`, `Z` or a whole number of seconds east of UTC.
#[must_use]
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Some(utc());
    }

    let Some((hours, minutes)) = value.split_once(':') else {
        return FixedOffset::east_opt(value.parse().ok()?);
    };
    let (sign, hours) = match hours.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn utc() -> FixedOffset {
    Utc.fix()
}

mod offset_seconds {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(offset.local_minus_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixedOffset, D::Error> {
        let seconds = i32::deserialize(deserializer)?;
        FixedOffset::east_opt(seconds)
            .ok_or_else(|| D::Error::custom(format!("offset {seconds}s out of range")))
    }
}
