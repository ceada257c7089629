//! Notification inbox plus a live SSE stream.

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::{
        Json as ResponseJson,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use db::models::notification::Notification;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthContext, error::ApiError};

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct InboxQuery {
    pub limit: Option<i64>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<InboxQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Notification>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 200);
    let notifications = Notification::find_by_user(&state.db.pool, ctx.user_id, limit).await?;
    Ok(ResponseJson(ApiResponse::success(notifications)))
}

pub async fn unread_count(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<i64>>, ApiError> {
    let count = Notification::unread_count(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(count)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(notification_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let updated = Notification::mark_read(&state.db.pool, notification_id, ctx.user_id).await?;
    if updated == 0 {
        return Err(ApiError::NotFound("notification not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let updated = Notification::mark_all_read(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// Live notifications for the authenticated user. Slow consumers that
/// overflow the broadcast buffer simply miss messages; the inbox remains
/// the source of truth.
pub async fn stream(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = ctx.user_id;
    let receiver = state.notifications.subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(move |message| {
        let event = match message {
            Ok(notification) if notification.user_id == user_id => Event::default()
                .json_data(&notification)
                .ok()
                .map(Ok),
            _ => None,
        };
        futures::future::ready(event)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/notifications",
        Router::new()
            .route("/", get(list_notifications))
            .route("/unread-count", get(unread_count))
            .route("/read-all", post(mark_all_read))
            .route("/stream", get(stream))
            .route("/{notification_id}/read", post(mark_read)),
    )
}
