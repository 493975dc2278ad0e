use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use tracing::{error, info};

use super::{bad_request, clamp_limit, AppState};
use crate::error::InputError;
use crate::models::{PageToken, TimeRange};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/readings", get(handler))
}

/// Query parameters for the reading history.
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    device_id: Option<String>,
    /// Timestamp range filter (e.g., "2025-03-21T00:00:00Z,2025-03-22T00:00:00Z")
    timestamp_range: Option<String>,
    limit: Option<u32>,
    page_token: Option<String>,
}

async fn handler(
    Query(params): Query<ReadingsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    info!("GET /readings - {:?}", params);

    let Some(device_id) = params.device_id.as_deref().filter(|d| !d.is_empty()) else {
        return bad_request(&InputError::MissingField("device_id"));
    };

    let range = match params.timestamp_range.as_deref().map(TimeRange::parse).transpose() {
        Ok(range) => range,
        Err(e) => return bad_request(&e),
    };
    let page_token = match params.page_token.as_deref().map(PageToken::decode).transpose() {
        Ok(token) => token,
        Err(e) => return bad_request(&e),
    };
    let limit = clamp_limit(params.limit, 100);

    match state
        .telemetry
        .query(device_id, range, limit, page_token)
        .await
    {
        Ok(page) => {
            info!("Returning {} readings", page.readings.len());
            (StatusCode::OK, Json(page)).into_response()
        }
        Err(e) => {
            error!("Failed to query readings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to fetch readings"),
            )
                .into_response()
        }
    }
}
