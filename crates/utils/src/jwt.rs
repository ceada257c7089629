//! Bearer-token session material. Claims stay stringly typed here so the
//! crate does not depend on db enums; the server converts via strum.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session lifetime. Matches what the original app's hosted auth used.
const TOKEN_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token encoding failed: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    Decode(jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    /// Base role: customer | provider | admin.
    pub role: String,
    /// Elevated admin capability, when present: sales | admin | master_admin.
    pub admin_role: Option<String>,
    pub verified: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: Uuid, role: String, admin_role: Option<String>, verified: bool) -> Self {
        let now = Utc::now();
        Self {
            sub,
            role,
            admin_role,
            verified,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        }
    }
}

pub fn sign(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(JwtError::Encode)
}

pub fn verify(token: &str, secret: &str) -> Result<Claims, JwtError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(JwtError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let claims = Claims::new(Uuid::new_v4(), "provider".to_string(), None, true);
        let token = sign(&claims, "test-secret").unwrap();
        let decoded = verify(&token, "test-secret").unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.role, "provider");
        assert!(decoded.verified);
    }

    #[test]
    fn rejects_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), "customer".to_string(), None, false);
        let token = sign(&claims, "secret-a").unwrap();
        assert!(verify(&token, "secret-b").is_err());
    }
}
