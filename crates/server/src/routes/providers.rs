//! Provider listings, public profiles and profile self-service.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::Utc;
use db::models::{
    category::Category,
    promotion::Promotion,
    provider::{ProviderListingFilter, ProviderListingRow, ProviderProfile, UpsertProviderProfile},
    review::Review,
    user::{User, UserRole},
};
use serde::{Deserialize, Serialize};
use services::services::ranking::{self, ProviderListing};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthContext, error::ApiError};

#[derive(Debug, Clone, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub city: Option<String>,
}

/// Everything the public profile page shows.
#[derive(Debug, Clone, Serialize, TS)]
pub struct ProviderDetail {
    pub user: User,
    pub profile: Option<ProviderProfile>,
    pub categories: Vec<Category>,
    pub rating: f64,
    pub review_count: i64,
    pub reviews: Vec<Review>,
    pub promotion: Option<Promotion>,
}

/// Ranked provider listing, optionally filtered by category slug and city.
pub async fn list_providers(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ProviderListing>>>, ApiError> {
    let now = Utc::now();
    let filter = ProviderListingFilter {
        category_slug: query.category,
        city: query.city,
    };
    let rows = ProviderListingRow::fetch(&state.db.pool, &filter).await?;
    let mut listings: Vec<ProviderListing> = rows
        .into_iter()
        .map(|row| ProviderListing::assemble(row, now))
        .collect();
    ranking::rank_providers(&mut listings);
    Ok(ResponseJson(ApiResponse::success(listings)))
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProviderDetail>>, ApiError> {
    let user = User::find_by_id(&state.db.pool, provider_id)
        .await?
        .filter(|u| u.role == UserRole::Provider)
        .ok_or_else(|| ApiError::NotFound("provider not found".to_string()))?;
    let profile = ProviderProfile::find_by_user_id(&state.db.pool, provider_id).await?;
    let categories = ProviderProfile::categories_for(&state.db.pool, provider_id).await?;
    let (rating, review_count) = Review::aggregate_for(&state.db.pool, provider_id).await?;
    let reviews = Review::find_by_provider(&state.db.pool, provider_id).await?;
    let promotion = Promotion::find_active_for(&state.db.pool, provider_id, Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(ProviderDetail {
        user,
        profile,
        categories,
        rating,
        review_count,
        reviews,
        promotion,
    })))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<UpsertProviderProfile>,
) -> Result<ResponseJson<ApiResponse<ProviderProfile>>, ApiError> {
    ctx.require_provider()?;
    let profile = ProviderProfile::upsert(&state.db.pool, ctx.user_id, &payload, false).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct SetCategories {
    pub category_ids: Vec<Uuid>,
}

pub async fn set_my_categories(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<SetCategories>,
) -> Result<ResponseJson<ApiResponse<Vec<Category>>>, ApiError> {
    ctx.require_provider()?;
    for category_id in &payload.category_ids {
        if Category::find_by_id(&state.db.pool, *category_id)
            .await?
            .is_none()
        {
            return Err(ApiError::Validation(format!(
                "unknown category {category_id}"
            )));
        }
    }
    ProviderProfile::replace_categories(&state.db.pool, ctx.user_id, &payload.category_ids).await?;
    let categories = ProviderProfile::categories_for(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Category>>>, ApiError> {
    let categories = Category::find_all(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .nest(
            "/providers",
            Router::new()
                .route("/", get(list_providers))
                .route("/me/profile", put(update_my_profile))
                .route("/me/categories", put(set_my_categories))
                .route("/{provider_id}", get(get_provider))
                .route("/{provider_id}/reviews", get(list_reviews).post(create_review)),
        )
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateReviewRequest {
    pub rating: i64,
    pub comment: Option<String>,
    pub request_id: Option<Uuid>,
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Review>>>, ApiError> {
    let reviews = Review::find_by_provider(&state.db.pool, provider_id).await?;
    Ok(ResponseJson(ApiResponse::success(reviews)))
}

/// Customers rate a provider 1 to 5 stars.
pub async fn create_review(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(provider_id): Path<Uuid>,
    ResponseJson(payload): ResponseJson<CreateReviewRequest>,
) -> Result<ResponseJson<ApiResponse<Review>>, ApiError> {
    ctx.require_customer()?;
    if !(1..=5).contains(&payload.rating) {
        return Err(ApiError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    User::find_by_id(&state.db.pool, provider_id)
        .await?
        .filter(|u| u.role == UserRole::Provider)
        .ok_or_else(|| ApiError::NotFound("provider not found".to_string()))?;
    let review = Review::create(
        &state.db.pool,
        Uuid::new_v4(),
        provider_id,
        ctx.user_id,
        &db::models::review::CreateReview {
            rating: payload.rating,
            comment: payload.comment,
            request_id: payload.request_id,
        },
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(review)))
}
