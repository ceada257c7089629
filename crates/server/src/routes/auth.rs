//! Registration, login and the current-user endpoint.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::User;
use serde::Deserialize;
use services::services::auth::{AuthToken, RegisterUser};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::AuthContext, error::ApiError};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    ResponseJson(payload): ResponseJson<RegisterUser>,
) -> Result<ResponseJson<ApiResponse<AuthToken>>, ApiError> {
    let token = state.auth.register(&payload).await?;
    Ok(ResponseJson(ApiResponse::success(token)))
}

pub async fn login(
    State(state): State<AppState>,
    ResponseJson(payload): ResponseJson<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AuthToken>>, ApiError> {
    let token = state.auth.login(&payload.email, &payload.password).await?;
    Ok(ResponseJson(ApiResponse::success(token)))
}

pub async fn me(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::find_by_id(&state.db.pool, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/me", get(me)),
    )
}
