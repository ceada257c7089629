//! Bearer-token extraction and role gates.

use std::str::FromStr;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use db::models::user::{AdminRole, UserRole};
use utils::jwt;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Authenticated caller, decoded from the `Authorization: Bearer` header.
/// Handlers take this as an extractor; a missing or invalid token rejects
/// the request before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
    pub admin_role: Option<AdminRole>,
    pub verified: bool,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let claims = jwt::verify(token, &state.jwt_secret)?;
        let role = UserRole::from_str(&claims.role)
            .map_err(|_| ApiError::Unauthorized("unknown role in token".to_string()))?;
        let admin_role = claims
            .admin_role
            .as_deref()
            .map(AdminRole::from_str)
            .transpose()
            .map_err(|_| ApiError::Unauthorized("unknown admin role in token".to_string()))?;
        Ok(Self {
            user_id: claims.sub,
            role,
            admin_role,
            verified: claims.verified,
        })
    }
}

/// For routes that are public but personalize their response when a token
/// is present. No header means anonymous; a malformed or expired token is
/// still rejected.
impl OptionalFromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .is_none()
        {
            return Ok(None);
        }
        <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

impl AuthContext {
    pub fn require_provider(&self) -> Result<(), ApiError> {
        if self.role == UserRole::Provider {
            Ok(())
        } else {
            Err(ApiError::Forbidden("provider account required".to_string()))
        }
    }

    pub fn require_customer(&self) -> Result<(), ApiError> {
        if self.role == UserRole::Customer {
            Ok(())
        } else {
            Err(ApiError::Forbidden("customer account required".to_string()))
        }
    }

    /// Admin gate with a minimum capability. master_admin passes every
    /// gate, sales only its own.
    pub fn require_admin(&self, min: AdminRole) -> Result<(), ApiError> {
        match self.admin_role {
            Some(role) if self.role == UserRole::Admin && role.at_least(min) => Ok(()),
            _ => Err(ApiError::Forbidden(format!(
                "requires {min} privileges or higher"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: UserRole, admin_role: Option<AdminRole>) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            admin_role,
            verified: false,
        }
    }

    #[test]
    fn admin_gate_respects_the_hierarchy() {
        let sales = context(UserRole::Admin, Some(AdminRole::Sales));
        assert!(sales.require_admin(AdminRole::Sales).is_ok());
        assert!(sales.require_admin(AdminRole::Admin).is_err());

        let master = context(UserRole::Admin, Some(AdminRole::MasterAdmin));
        assert!(master.require_admin(AdminRole::Sales).is_ok());
        assert!(master.require_admin(AdminRole::MasterAdmin).is_ok());
    }

    #[test]
    fn admin_role_without_admin_base_role_is_rejected() {
        let odd = context(UserRole::Customer, Some(AdminRole::MasterAdmin));
        assert!(odd.require_admin(AdminRole::Sales).is_err());
    }

    #[test]
    fn base_role_gates() {
        assert!(context(UserRole::Provider, None).require_provider().is_ok());
        assert!(context(UserRole::Customer, None).require_provider().is_err());
        assert!(context(UserRole::Customer, None).require_customer().is_ok());
    }
}
