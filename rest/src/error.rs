//! Error types for the REST adapter

use techevents_catalog::BackendError;
use thiserror::Error;

/// Errors that can occur while setting up the REST adapter
///
/// Per-request failures are reported as [`BackendError`], the type the
/// catalog traits use.
#[derive(Debug, Error)]
pub enum RestError {
    /// A required environment variable is not set
    #[error("Missing {0} environment variable")]
    MissingConfig(&'static str),

    /// The base URL does not parse
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

pub(crate) fn request_failed(error: &reqwest::Error) -> BackendError {
    if error.is_timeout() {
        return BackendError::Request(format!("timed out: {error}"));
    }
    BackendError::Request(error.to_string())
}

pub(crate) fn decode_failed(error: &reqwest::Error) -> BackendError {
    BackendError::Decode(error.to_string())
}
