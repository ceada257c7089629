//! Paid promotions, subscription changes and the caller's invoices.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    invoice::Invoice,
    promotion::{Promotion, PromotionKind},
    user::{SubscriptionTier, User},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::AuthContext, error::ApiError};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct PurchasePromotion {
    pub kind: PromotionKind,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct PromotionPurchased {
    pub promotion: Promotion,
    pub invoice: Invoice,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ChangeSubscription {
    pub tier: SubscriptionTier,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SubscriptionChanged {
    pub user: User,
    pub invoice: Option<Invoice>,
}

pub async fn purchase_promotion(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<PurchasePromotion>,
) -> Result<ResponseJson<ApiResponse<PromotionPurchased>>, ApiError> {
    ctx.require_provider()?;
    let (promotion, invoice) = state
        .billing
        .purchase_promotion(ctx.user_id, payload.kind, payload.days)
        .await?;
    Ok(ResponseJson(ApiResponse::success(PromotionPurchased {
        promotion,
        invoice,
    })))
}

pub async fn change_subscription(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<ChangeSubscription>,
) -> Result<ResponseJson<ApiResponse<SubscriptionChanged>>, ApiError> {
    ctx.require_provider()?;
    let (user, invoice) = state
        .billing
        .change_subscription(ctx.user_id, payload.tier)
        .await?;
    Ok(ResponseJson(ApiResponse::success(SubscriptionChanged {
        user,
        invoice,
    })))
}

pub async fn list_my_promotions(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<Vec<Promotion>>>, ApiError> {
    ctx.require_provider()?;
    let promotions = Promotion::find_by_provider(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(promotions)))
}

pub async fn list_my_invoices(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<Vec<Invoice>>>, ApiError> {
    let invoices = Invoice::find_by_user(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(invoices)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/billing",
        Router::new()
            .route("/promotions", get(list_my_promotions).post(purchase_promotion))
            .route("/subscription", post(change_subscription))
            .route("/invoices", get(list_my_invoices)),
    )
}
