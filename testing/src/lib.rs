//! # techevents testing
//!
//! Testing utilities and helpers for the techevents catalog.
//!
//! This crate provides:
//! - A fixed [`Clock`] for deterministic date buckets
//! - A Given-When-Then [`ReducerTest`] harness
//! - Assertion helpers for effects
//! - Store helpers for waiting on effect feedback
//!
//! ## Example
//!
//! ```ignore
//! use techevents_testing::{helpers, test_clock};
//! use techevents_runtime::Store;
//!
//! #[tokio::test]
//! async fn loads_catalog() {
//!     let store = Store::new(CatalogState::default(), CatalogReducer::new(), env);
//!
//!     helpers::send_and_settle(&store, CatalogAction::RequestLoad).await?;
//!
//!     let view = store.state(CatalogState::view).await;
//!     assert_eq!(view.events.len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use techevents_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time until moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`]. Clones share the same instant.
    ///
    /// # Example
    ///
    /// ```
    /// use techevents_testing::mocks::FixedClock;
    /// use techevents_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock to a new instant
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        clock_at("2025-01-01T00:00:00Z")
    }

    /// Create a fixed clock from an RFC 3339 timestamp
    ///
    /// # Panics
    ///
    /// Panics if `timestamp` is not valid RFC 3339. Intended for literals in tests.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn clock_at(timestamp: &str) -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339(timestamp)
                .expect("test timestamp should be RFC 3339")
                .with_timezone(&Utc),
        )
    }
}

/// Store helpers for async tests.
pub mod helpers {
    use std::time::Duration;
    use techevents_core::reducer::Reducer;
    use techevents_runtime::{Store, StoreError};

    /// Upper bound for effects to settle in tests
    pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Send an action and wait until every effect it started, including the
    /// actions those effects fed back, has finished.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down
    /// and [`StoreError::Timeout`] if effects do not settle within
    /// [`SETTLE_TIMEOUT`].
    pub async fn send_and_settle<S, A, E, R>(
        store: &Store<S, A, E, R>,
        action: A,
    ) -> Result<(), StoreError>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let mut handle = store.send(action).await?;
        handle.wait_with_timeout(SETTLE_TIMEOUT).await
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, clock_at, test_clock};
