//! Customer requests: posting, browsing and lifecycle transitions.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use db::models::{
    category::Category,
    offer::Offer,
    request::{CreateServiceRequest, RequestStatus, ServiceRequest},
    settings::AppSettings,
    user::UserRole,
};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthContext, error::ApiError};

/// Request plus parsed images and the offers the caller may see.
#[derive(Debug, Clone, Serialize, TS)]
pub struct RequestDetail {
    pub request: ServiceRequest,
    pub image_urls: Vec<String>,
    pub offers: Vec<Offer>,
}

/// Post a new request. Expiry is assigned server-side from the current
/// settings; clients never choose it.
pub async fn create_request(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<CreateServiceRequest>,
) -> Result<ResponseJson<ApiResponse<ServiceRequest>>, ApiError> {
    ctx.require_customer()?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    if payload.description.trim().is_empty() {
        return Err(ApiError::Validation("description is required".to_string()));
    }
    let settings = AppSettings::get(&state.db.pool).await?;
    let image_count = payload.images.as_ref().map_or(0, Vec::len);
    if image_count as i64 > settings.max_images_per_request {
        return Err(ApiError::Validation(format!(
            "at most {} images per request",
            settings.max_images_per_request
        )));
    }
    Category::find_by_id(&state.db.pool, payload.category_id)
        .await?
        .ok_or_else(|| ApiError::Validation("unknown category".to_string()))?;

    let expires_at = Utc::now() + Duration::days(settings.request_expiry_days);
    let request = ServiceRequest::create(
        &state.db.pool,
        Uuid::new_v4(),
        ctx.user_id,
        &payload,
        expires_at,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(request)))
}

/// Open requests, for providers browsing work.
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ServiceRequest>>>, ApiError> {
    let requests = ServiceRequest::list_active(&state.db.pool, Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(requests)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<Vec<ServiceRequest>>>, ApiError> {
    let requests = ServiceRequest::list_by_customer(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(requests)))
}

/// Request detail, publicly viewable. The owner sees every offer; a
/// provider sees only their own; everyone else, anonymous callers
/// included, sees none.
pub async fn get_request(
    State(state): State<AppState>,
    ctx: Option<AuthContext>,
    Path(request_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<RequestDetail>>, ApiError> {
    let request = ServiceRequest::find_by_id(&state.db.pool, request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("request not found".to_string()))?;
    let offers = match &ctx {
        Some(ctx) if request.customer_id == ctx.user_id => {
            Offer::find_by_request(&state.db.pool, request_id).await?
        }
        Some(ctx) if ctx.role == UserRole::Provider => {
            Offer::find_by_request(&state.db.pool, request_id)
                .await?
                .into_iter()
                .filter(|offer| offer.provider_id == ctx.user_id)
                .collect()
        }
        _ => Vec::new(),
    };
    let image_urls = request.image_urls();
    Ok(ResponseJson(ApiResponse::success(RequestDetail {
        request,
        image_urls,
        offers,
    })))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(request_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ServiceRequest>>, ApiError> {
    transition(&state, &ctx, request_id, RequestStatus::Cancelled).await
}

pub async fn complete_request(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(request_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ServiceRequest>>, ApiError> {
    transition(&state, &ctx, request_id, RequestStatus::Completed).await
}

/// Owner-only status transitions. Cancelling is allowed while the request
/// is open or assigned; completing only once assigned.
async fn transition(
    state: &AppState,
    ctx: &AuthContext,
    request_id: Uuid,
    target: RequestStatus,
) -> Result<ResponseJson<ApiResponse<ServiceRequest>>, ApiError> {
    let request = ServiceRequest::find_by_id(&state.db.pool, request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("request not found".to_string()))?;
    if request.customer_id != ctx.user_id {
        return Err(ApiError::Forbidden(
            "only the request owner may do this".to_string(),
        ));
    }
    let allowed = match target {
        RequestStatus::Cancelled => {
            matches!(request.status, RequestStatus::Active | RequestStatus::Assigned)
        }
        RequestStatus::Completed => request.status == RequestStatus::Assigned,
        _ => false,
    };
    if !allowed {
        return Err(ApiError::Conflict(format!(
            "cannot move a {} request to {target}",
            request.status
        )));
    }
    ServiceRequest::update_status(&state.db.pool, request_id, target).await?;
    let request = ServiceRequest::find_by_id(&state.db.pool, request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("request not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(request)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/requests",
        Router::new()
            .route("/", get(list_active).post(create_request))
            .route("/mine", get(list_mine))
            .route("/{request_id}", get(get_request))
            .route("/{request_id}/cancel", post(cancel_request))
            .route("/{request_id}/complete", post(complete_request)),
    )
}
