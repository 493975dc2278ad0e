use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use tracing::{error, info};

use super::{bad_request, clamp_limit, AppState};
use crate::error::InputError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/actions", get(handler))
}

#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
    device_id: Option<String>,
    limit: Option<u32>,
}

async fn handler(
    Query(params): Query<ActionsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    info!("GET /actions - {:?}", params);

    let Some(device_id) = params.device_id.as_deref().filter(|d| !d.is_empty()) else {
        return bad_request(&InputError::MissingField("device_id"));
    };
    let limit = clamp_limit(params.limit, 100);
    match state.actions.query(device_id, limit).await {
        Ok(actions) => (StatusCode::OK, Json(actions)).into_response(),
        Err(e) => {
            error!("Failed to query actions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to fetch actions"),
            )
                .into_response()
        }
    }
}
