//! Back-office routes. Every handler passes through an admin gate; the
//! minimum capability varies per operation.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    invoice::Invoice,
    notification::NotificationKind,
    provider::{ProviderProfile, UpsertProviderProfile},
    settings::{AppSettings, UpdateAppSettings},
    user::{AdminRole, CreateUser, SubscriptionTier, User, UserRole},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthContext, error::ApiError};

#[derive(Debug, Clone, Deserialize)]
pub struct UserListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_users(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<UserListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    ctx.require_admin(AdminRole::Sales)?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);
    let users = User::list(&state.db.pool, limit, offset).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn verify_provider(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(provider_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    ctx.require_admin(AdminRole::Admin)?;
    let user = User::set_verified(&state.db.pool, provider_id, true)
        .await?
        .ok_or_else(|| ApiError::NotFound("provider not found".to_string()))?;
    if let Err(e) = state
        .notifications
        .notify(
            user.id,
            NotificationKind::ProviderVerified,
            "Profil ověřen",
            "Váš profil byl ověřen administrátorem.",
        )
        .await
    {
        warn!(provider_id = %user.id, "failed to notify verified provider: {}", e);
    }
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn unverify_provider(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(provider_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    ctx.require_admin(AdminRole::Admin)?;
    let user = User::set_verified(&state.db.pool, provider_id, false)
        .await?
        .ok_or_else(|| ApiError::NotFound("provider not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct SetTier {
    pub tier: SubscriptionTier,
}

pub async fn set_provider_tier(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(provider_id): Path<Uuid>,
    ResponseJson(payload): ResponseJson<SetTier>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    ctx.require_admin(AdminRole::Admin)?;
    let user = User::set_subscription_tier(&state.db.pool, provider_id, payload.tier)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

/// Payload for sales-authored seed providers. These accounts have no
/// credentials and can never log in.
#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateSeedProvider {
    pub display_name: String,
    pub email: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SeedProviderCreated {
    pub user: User,
    pub profile: ProviderProfile,
}

pub async fn create_seed_provider(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<CreateSeedProvider>,
) -> Result<ResponseJson<ApiResponse<SeedProviderCreated>>, ApiError> {
    ctx.require_admin(AdminRole::Sales)?;
    if payload.display_name.trim().is_empty() {
        return Err(ApiError::Validation("display name is required".to_string()));
    }
    let email = payload
        .email
        .unwrap_or_else(|| format!("seed-{}@fachmani.cz", Uuid::new_v4()));
    let user = User::create(
        &state.db.pool,
        Uuid::new_v4(),
        &CreateUser {
            email,
            password_digest: None,
            display_name: payload.display_name.trim().to_string(),
            role: UserRole::Provider,
        },
    )
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            ApiError::Conflict("email is already registered".to_string())
        } else {
            ApiError::Database(e)
        }
    })?;
    let profile = ProviderProfile::upsert(
        &state.db.pool,
        user.id,
        &UpsertProviderProfile {
            headline: payload.headline,
            bio: payload.bio,
            city: payload.city,
            phone: payload.phone,
        },
        true,
    )
    .await?;
    if !payload.category_ids.is_empty() {
        ProviderProfile::replace_categories(&state.db.pool, user.id, &payload.category_ids)
            .await?;
    }
    Ok(ResponseJson(ApiResponse::success(SeedProviderCreated {
        user,
        profile,
    })))
}

pub async fn get_settings(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<ResponseJson<ApiResponse<AppSettings>>, ApiError> {
    ctx.require_admin(AdminRole::Admin)?;
    let settings = AppSettings::get(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

/// Settings changes are reserved for the master admin.
pub async fn update_settings(
    State(state): State<AppState>,
    ctx: AuthContext,
    ResponseJson(payload): ResponseJson<UpdateAppSettings>,
) -> Result<ResponseJson<ApiResponse<AppSettings>>, ApiError> {
    ctx.require_admin(AdminRole::MasterAdmin)?;
    if payload.free_offers_per_month < 1
        || payload.request_expiry_days < 1
        || payload.max_images_per_request < 0
    {
        return Err(ApiError::Validation("settings out of range".to_string()));
    }
    let settings = AppSettings::update(&state.db.pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub async fn mark_invoice_paid(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Invoice>>, ApiError> {
    ctx.require_admin(AdminRole::Admin)?;
    let invoice = Invoice::mark_paid(&state.db.pool, invoice_id)
        .await?
        .ok_or_else(|| ApiError::Conflict("invoice not found or not open".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/users", get(list_users))
            .route("/providers/{provider_id}/verify", post(verify_provider))
            .route("/providers/{provider_id}/unverify", post(unverify_provider))
            .route("/providers/{provider_id}/tier", put(set_provider_tier))
            .route("/seed-providers", post(create_seed_provider))
            .route("/settings", get(get_settings).put(update_settings))
            .route("/invoices/{invoice_id}/paid", post(mark_invoice_paid)),
    )
}
