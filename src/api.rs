//! HTTP surface: health, delivery lookup, and engine status.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::Error;
use geo_engine::{AvailabilityService, CacheStats, RefreshController, RefreshState, RefreshStats};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AvailabilityService>,
    pub refresh: Arc<RefreshController>,
}

/// Query string for `GET /restaurants`.
#[derive(Debug, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ready: bool,
    pub generation: Option<u64>,
    pub restaurants: usize,
    pub skipped_rows: usize,
    pub loaded_at: Option<String>,
    pub refresh_state: RefreshState,
    pub refresh: RefreshStats,
    pub cache: CacheStats,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/restaurants", get(restaurants))
        .route("/status", get(status))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "service up!" }))
}

/// GET /restaurants?latitude=..&longitude=..
async fn restaurants(
    State(state): State<AppState>,
    Query(coords): Query<Coordinates>,
) -> Response {
    match state
        .service
        .restaurants_near(coords.latitude, coords.longitude)
    {
        Ok(result) => Json(result).into_response(),
        Err(Error::NotReady) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": Error::NotReady.to_string() })),
        )
            .into_response(),
        Err(e) => {
            error!("Restaurant lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.service.engine().handle().load();
    Json(StatusResponse {
        ready: store.is_some(),
        generation: store.as_ref().map(|s| s.generation()),
        restaurants: store.as_ref().map(|s| s.len()).unwrap_or(0),
        skipped_rows: store.as_ref().map(|s| s.skipped_rows()).unwrap_or(0),
        loaded_at: store.as_ref().map(|s| s.built_at().to_rfc3339()),
        refresh_state: state.refresh.state(),
        refresh: state.refresh.stats(),
        cache: state.service.cache_stats(),
    })
}
