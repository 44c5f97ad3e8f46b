//! Error types for the catalog.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A backend row could not be normalized.
///
/// The mapper never returns a partially populated value: any of these aborts
/// the row.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedRecordError {
    /// The row is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,

    /// A required field is absent or null.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Dotted field path (e.g. `platform.id`)
        field: String,
    },

    /// A field has the wrong JSON type.
    #[error("field `{field}` must be {expected}")]
    WrongType {
        /// Dotted field path
        field: String,
        /// Expected shape, for the message
        expected: String,
    },

    /// A date field does not parse.
    #[error("field `{field}` has unparseable date `{value}`")]
    InvalidDate {
        /// Dotted field path
        field: String,
        /// The raw value
        value: String,
    },

    /// `mode` is not Online, Offline or Hybrid.
    #[error("unknown event mode `{0}`")]
    UnknownMode(String),

    /// `view_count` is negative or fractional.
    #[error("invalid view count `{0}`")]
    InvalidViewCount(String),

    /// The event references a platform that is not loaded.
    #[error("event `{event_id}` references unknown platform `{platform_id}`")]
    UnknownPlatform {
        /// The event row id
        event_id: String,
        /// The dangling platform id
        platform_id: String,
    },
}

impl MalformedRecordError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn wrong_type(field: impl Into<String>, expected: &str) -> Self {
        Self::WrongType {
            field: field.into(),
            expected: expected.to_string(),
        }
    }
}

/// Errors reported by a backend collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with an error status.
    #[error("backend returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Body or reason phrase
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The requested row or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend does not offer this capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Which half of the combined catalog fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchSource {
    /// The events query
    Events,
    /// The platforms query
    Platforms,
    /// Record mapping under [`RecordPolicy::FailBatch`](crate::mapper::RecordPolicy)
    Mapping,
}

impl std::fmt::Display for FetchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Events => "events",
            Self::Platforms => "platforms",
            Self::Mapping => "mapping",
        })
    }
}

/// A catalog load failed as a whole.
///
/// Either fetch failing fails the load. The previously loaded list is kept.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("failed to load {source_kind}: {message}")]
pub struct FetchFailure {
    /// Which part failed
    pub source_kind: FetchSource,
    /// Human-readable cause
    pub message: String,
}

impl FetchFailure {
    /// Failure of one of the backend queries.
    #[must_use]
    pub fn backend(source_kind: FetchSource, error: &BackendError) -> Self {
        Self {
            source_kind,
            message: error.to_string(),
        }
    }

    /// Failure to map a batch.
    #[must_use]
    pub fn mapping(error: &MalformedRecordError) -> Self {
        Self {
            source_kind: FetchSource::Mapping,
            message: error.to_string(),
        }
    }
}

/// Admin draft validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// A required text field is empty.
    #[error("field `{0}` is required")]
    Required(&'static str),

    /// The event has no theme tags.
    #[error("at least one theme is required")]
    NoThemes,

    /// The same theme tag appears twice.
    #[error("duplicate theme `{0}`")]
    DuplicateTheme(String),

    /// End date precedes start date.
    #[error("end date is before start date")]
    EndBeforeStart,

    /// Name produces an empty platform id.
    #[error("platform name `{0}` does not produce a usable id")]
    InvalidSlug(String),
}

/// Single-event detail load failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetailError {
    /// No event has this id.
    #[error("event `{0}` not found")]
    NotFound(String),

    /// The backend query failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The row could not be mapped.
    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),
}

/// Invalid configuration value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse.
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// The raw value
        value: String,
        /// What was expected
        reason: &'static str,
    },
}

/// Controller operation failures.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The store rejected the action or timed out waiting for effects.
    #[error(transparent)]
    Store(#[from] techevents_runtime::StoreError),

    /// The backend could not open a change subscription.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
