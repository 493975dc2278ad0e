use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use serde_json::json;

use crate::error::InputError;
use crate::pipeline::IngestionPipeline;
use crate::ports::{ActionLog, TelemetryStore};

mod actions;
mod health;
mod ingest;
mod readings;

// ---

/// Largest page any history endpoint returns.
const MAX_LIMIT: u32 = 1000;

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub telemetry: Arc<dyn TelemetryStore>,
    pub actions: Arc<dyn ActionLog>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(ingest::router())
        .merge(readings::router())
        .merge(actions::router())
        .merge(health::router())
        .with_state(state)
}

/// Client-visible rejection of a malformed request.
fn bad_request(err: &InputError) -> Response {
    // ---
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "accepted": false,
            "error": err.to_string(),
            "field": err.field(),
        })),
    )
        .into_response()
}

fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}
