//! Route definitions.

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use tesouro_engine::SnapshotStore;

use crate::handlers::{self, AppState};
use crate::rate_limit::{self, RateLimiter};

/// Create the API router.
///
/// # Arguments
/// * `store` - The published bond snapshot
/// * `limiter` - Per-client request budget applied to every route
pub fn create_router(store: Arc<SnapshotStore>, limiter: Arc<RateLimiter>) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/health", get(handlers::health))
        .route("/bonds", get(handlers::list_bonds))
        .route("/bonds/{name}", get(handlers::get_bond))
        .layer(middleware::from_fn_with_state(limiter, rate_limit::limit_by_ip))
        .with_state(state)
}
