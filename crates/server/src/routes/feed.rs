//! Social feed routes.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use db::models::{
    post::{CreatePost, Post},
    user::UserRole,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthContext, error::ApiError};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_POST_LEN: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    /// Return posts created strictly before this timestamp.
    pub before: Option<DateTime<Utc>>,
}

pub async fn list_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Post>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let posts = Post::list_recent(&state.db.pool, limit, query.before).await?;
    Ok(ResponseJson(ApiResponse::success(posts)))
}

pub async fn create_post(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<CreatePost>,
) -> Result<ResponseJson<ApiResponse<Post>>, ApiError> {
    if payload.body.trim().is_empty() {
        return Err(ApiError::Validation("post body is required".to_string()));
    }
    if payload.body.chars().count() > MAX_POST_LEN {
        return Err(ApiError::Validation(format!(
            "post body is limited to {MAX_POST_LEN} characters"
        )));
    }
    let post = Post::create(&state.db.pool, Uuid::new_v4(), ctx.user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(post)))
}

/// Authors delete their own posts; admins may remove any post.
pub async fn delete_post(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let post = Post::find_by_id(&state.db.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".to_string()))?;
    if post.author_id != ctx.user_id && ctx.role != UserRole::Admin {
        return Err(ApiError::Forbidden(
            "only the author or an admin may delete a post".to_string(),
        ));
    }
    Post::delete(&state.db.pool, post_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/feed",
        Router::new()
            .route("/", get(list_feed).post(create_post))
            .route("/{post_id}", delete(delete_post)),
    )
}
