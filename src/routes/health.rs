// src/routes/health.rs
//! Liveness endpoint for the irrigation service.
//!
//! `GET /health` lets container orchestrators and CI check that the process
//! is up and serving HTTP. It deliberately does not touch the database, the
//! weather oracle or the command broker, so a degraded collaborator never
//! makes the service look dead.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Subrouter with the `/health` route, generic over the application state
/// so it merges into the gateway router.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
