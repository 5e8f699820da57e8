//! Liveness and readiness probes

use crate::{state::AppState, Error, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

/// Ready once the database answers.
pub async fn ready(State(state): State<AppState>) -> Result<Response> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Readiness check failed");
            Error::Database(e)
        })?;

    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))).into_response())
}
