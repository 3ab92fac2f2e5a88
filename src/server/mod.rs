//! HTTP server for the ingest receiver.
//!
//! This module implements the HTTP surface that:
//! - Accepts signed import callbacks from the remote producer
//! - Answers signed pings with receiver identity and clock
//! - Exposes a signed trigger for the duplicate reconciler
//! - Provides an unsigned health check for liveness probes
//!
//! # Endpoints
//!
//! - `POST /callback` - Imports one generated item (idempotent per canonical key)
//! - `POST /ping` - Signed reachability and credential check
//! - `POST /reconcile` - Runs a duplicate-reconciliation sweep
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

pub mod callback;
pub mod health;
pub mod ping;
pub mod reconcile;

pub use callback::callback_handler;
pub use health::health_handler;
pub use ping::ping_handler;
pub use reconcile::reconcile_handler;

use crate::config::ConfigProvider;
use crate::import::ImportCoordinator;
use crate::lock::ImportLockManager;
use crate::store::ContentStore;

/// Shared application state.
///
/// Passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn ContentStore>,
    config: Arc<dyn ConfigProvider>,
    locks: ImportLockManager,
    coordinator: ImportCoordinator,
    /// Public base URL of this receiver, reported by the ping endpoint.
    public_url: String,
}

impl AppState {
    /// Creates a new `AppState` wiring the coordinator to the given store,
    /// configuration, and a fresh lock table.
    pub fn new(
        store: Arc<dyn ContentStore>,
        config: Arc<dyn ConfigProvider>,
        public_url: impl Into<String>,
    ) -> Self {
        let locks = ImportLockManager::new();
        let coordinator =
            ImportCoordinator::new(Arc::clone(&store), Arc::clone(&config), locks.clone());
        AppState {
            inner: Arc::new(AppStateInner {
                store,
                config,
                locks,
                coordinator,
                public_url: public_url.into(),
            }),
        }
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.inner.store.as_ref()
    }

    pub fn config(&self) -> &dyn ConfigProvider {
        self.inner.config.as_ref()
    }

    /// The lock table shared with the coordinator.
    pub fn locks(&self) -> &ImportLockManager {
        &self.inner.locks
    }

    pub fn coordinator(&self) -> &ImportCoordinator {
        &self.inner.coordinator
    }

    pub fn public_url(&self) -> &str {
        &self.inner.public_url
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/callback", post(callback_handler))
        .route("/ping", post(ping_handler))
        .route("/reconcile", post(reconcile_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
