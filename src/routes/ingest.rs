use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde_json::Value;
use tracing::info;

use super::{bad_request, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/ingest", post(handler))
}

/// Handle `POST /ingest`.
///
/// The body is taken as raw JSON so that a missing or mistyped field is
/// reported by name instead of as a generic deserialization failure.
async fn handler(State(state): State<AppState>, Json(event): Json<Value>) -> impl IntoResponse {
    // ---
    info!("POST /ingest - Starting pipeline");

    match state.pipeline.ingest(&event).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => bad_request(&e),
    }
}
