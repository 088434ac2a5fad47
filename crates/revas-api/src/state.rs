//! # Application State
//!
//! Shared state handed to every handler: the review coordinator over the
//! configured backend and, when Postgres is configured, the pool used by
//! the readiness probe.

use std::sync::Arc;

use sqlx::PgPool;

use revas_engine::{InMemoryStore, ReviewCoordinator, ReviewStore, ReviewerSelector};

/// Backend type shared by handlers.
pub type SharedStore = Arc<dyn ReviewStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: ReviewCoordinator<dyn ReviewStore>,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// In-memory backend with an entropy-seeded selector.
    pub fn new() -> Self {
        Self::in_memory(ReviewerSelector::from_entropy())
    }

    /// In-memory backend with the given selector.
    pub fn in_memory(selector: ReviewerSelector) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), selector, None)
    }

    /// Any backend; `db_pool` is only consulted by the readiness probe.
    pub fn with_store(store: SharedStore, selector: ReviewerSelector, db_pool: Option<PgPool>) -> Self {
        Self {
            coordinator: ReviewCoordinator::new(store, selector),
            db_pool,
        }
    }

    /// The configured backend.
    pub fn store(&self) -> &SharedStore {
        self.coordinator.store()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db_pool", &self.db_pool.is_some())
            .finish_non_exhaustive()
    }
}
