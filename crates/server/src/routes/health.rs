use axum::{Json, Router, extract::State, routing::get};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// Liveness plus a database round-trip.
pub async fn health(State(state): State<AppState>) -> Result<Json<ApiResponse<String>>, ApiError> {
    sqlx::query("SELECT 1").execute(&state.db.pool).await?;
    Ok(Json(ApiResponse::success("ok".to_string())))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
