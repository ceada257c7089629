//! Offer submission and the accept/withdraw lifecycle.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::offer::{CreateOffer, Offer};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthContext, error::ApiError};

/// Submit an offer against a request. Quota enforcement happens inside
/// the service transaction.
pub async fn submit_offer(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(request_id): Path<Uuid>,
    ResponseJson(payload): ResponseJson<CreateOffer>,
) -> Result<ResponseJson<ApiResponse<Offer>>, ApiError> {
    ctx.require_provider()?;
    if payload.price_czk <= 0 {
        return Err(ApiError::Validation("price must be positive".to_string()));
    }
    if payload.message.trim().is_empty() {
        return Err(ApiError::Validation("message is required".to_string()));
    }
    let offer = state.offers.submit(ctx.user_id, request_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(offer)))
}

pub async fn list_my_offers(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<Vec<Offer>>>, ApiError> {
    ctx.require_provider()?;
    let offers = Offer::find_by_provider(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(offers)))
}

pub async fn accept_offer(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(offer_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Offer>>, ApiError> {
    let offer = state.offers.accept(ctx.user_id, offer_id).await?;
    Ok(ResponseJson(ApiResponse::success(offer)))
}

pub async fn withdraw_offer(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(offer_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Offer>>, ApiError> {
    let offer = state.offers.withdraw(ctx.user_id, offer_id).await?;
    Ok(ResponseJson(ApiResponse::success(offer)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests/{request_id}/offers", post(submit_offer))
        .nest(
            "/offers",
            Router::new()
                .route("/mine", get(list_my_offers))
                .route("/{offer_id}/accept", post(accept_offer))
                .route("/{offer_id}/withdraw", post(withdraw_offer)),
        )
}
