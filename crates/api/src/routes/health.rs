use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use moodbase_db::SchemaCapabilities;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Ratings relations found by the startup probe.
    pub schema: SchemaCapabilities,
}

/// GET /health -- returns service and database health.
///
/// Reports `degraded` when the database is unreachable or a ratings
/// relation is missing.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = moodbase_db::health_check(&state.pool).await.is_ok();
    let schema = state.ratings.schema();

    let status = if db_healthy && schema.is_complete() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        schema,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
