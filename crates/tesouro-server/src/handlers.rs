//! Request handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use tesouro_engine::{BondListing, BondLookup, SnapshotStore};

use crate::error::{ApiError, ApiResult};

/// Application state.
pub struct AppState {
    /// The published bond snapshot
    pub store: Arc<SnapshotStore>,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    bonds_count: usize,
    updated_at: Option<String>,
    generation: u64,
}

/// Health check handler.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.store.current();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        bonds_count: snapshot.len(),
        updated_at: snapshot.updated_at().map(str::to_string),
        generation: snapshot.generation(),
    })
}

/// List every bond of the current snapshot.
pub async fn list_bonds(State(state): State<Arc<AppState>>) -> Json<BondListing> {
    Json(state.store.get_all())
}

/// Get one bond by name.
///
/// Matching is case-insensitive; `_` and `-` in the path stand for spaces.
pub async fn get_bond(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<BondLookup>> {
    state
        .store
        .get_by_name(&name)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Bond '{name}'")))
}
