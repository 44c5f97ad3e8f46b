//! # techevents REST backend
//!
//! [`RestBackend`] implements the catalog's
//! [`CatalogBackend`](techevents_catalog::CatalogBackend) and
//! [`AdminBackend`](techevents_catalog::AdminBackend) traits against a hosted
//! Postgres-over-REST service with object storage.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use techevents_catalog::{CatalogController, CatalogEnvironment, CatalogSettings};
//! use techevents_core::environment::SystemClock;
//! use techevents_rest::RestBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // SUPABASE_URL and SUPABASE_ANON_KEY
//!     let backend = RestBackend::from_env()?;
//!
//!     let catalog = CatalogController::new(CatalogEnvironment::new(
//!         Arc::new(backend),
//!         Arc::new(SystemClock),
//!         CatalogSettings::from_env()?,
//!     ));
//!     let view = catalog.load().await?;
//!     println!("{} events", view.events.len());
//!     Ok(())
//! }
//! ```
//!
//! Realtime change notifications are not carried over REST;
//! `subscribe_changes` reports [`BackendError::Unsupported`](techevents_catalog::BackendError::Unsupported).

pub mod client;
pub mod config;
pub mod error;

pub use client::RestBackend;
pub use config::RestConfig;
pub use error::RestError;
