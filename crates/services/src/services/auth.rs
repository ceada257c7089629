//! Registration, login and token issuance.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use db::{
    DBService,
    models::user::{CreateUser, User, UserRole},
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::jwt::{self, Claims, JwtError};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;
const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("email is already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("token error: {0}")]
    Jwt(#[from] JwtError),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct RegisterUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct AuthToken {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    db: DBService,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(db: DBService, jwt_secret: String) -> Self {
        Self { db, jwt_secret }
    }

    /// Register a customer or provider account. Admin accounts are
    /// provisioned out of band, never through this endpoint.
    pub async fn register(&self, data: &RegisterUser) -> Result<AuthToken, AuthError> {
        if data.role == UserRole::Admin {
            return Err(AuthError::Validation(
                "admin accounts cannot self-register".to_string(),
            ));
        }
        if !data.email.contains('@') || data.email.len() < 5 {
            return Err(AuthError::Validation("invalid email address".to_string()));
        }
        if data.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if data.display_name.trim().is_empty() {
            return Err(AuthError::Validation("display name is required".to_string()));
        }

        let user = User::create(
            &self.db.pool,
            Uuid::new_v4(),
            &CreateUser {
                email: data.email.trim().to_lowercase(),
                password_digest: Some(hash_password(&data.password)),
                display_name: data.display_name.trim().to_string(),
                role: data.role,
            },
        )
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AuthError::EmailTaken
            } else {
                AuthError::Database(e)
            }
        })?;

        info!(user_id = %user.id, role = %user.role, "user registered");
        self.issue_token(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthToken, AuthError> {
        let user = User::find_by_email(&self.db.pool, &email.trim().to_lowercase())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        // Seed providers carry no digest and can never log in.
        let digest = user
            .password_digest
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, digest) {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue_token(user)
    }

    fn issue_token(&self, user: User) -> Result<AuthToken, AuthError> {
        let claims = Claims::new(
            user.id,
            user.role.to_string(),
            user.admin_role.map(|r| r.to_string()),
            user.verified,
        );
        let token = jwt::sign(&claims, &self.jwt_secret)?;
        Ok(AuthToken { token, user })
    }
}

/// `salt$digest`, both base64, digest = SHA-256(salt || password).
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize();
    format!("{}${}", BASE64.encode(salt), BASE64.encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (BASE64.decode(salt_b64), BASE64.decode(digest_b64)) else {
        return false;
    };
    let digest = Sha256::new()
        .chain_update(&salt)
        .chain_update(password.as_bytes())
        .finalize();
    // Constant-time: the comparison must not leak how far a guess matched.
    digest.as_slice().ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_data(email: &str, role: UserRole) -> RegisterUser {
        RegisterUser {
            email: email.to_string(),
            password: "velmi-tajne-heslo".to_string(),
            display_name: "Test".to_string(),
            role,
        }
    }

    #[test]
    fn password_round_trip() {
        let stored = hash_password("správné heslo");
        assert!(verify_password("správné heslo", &stored));
        assert!(!verify_password("špatné heslo", &stored));
        assert!(!verify_password("x", "garbage-without-separator"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("stejné"), hash_password("stejné"));
    }

    #[test]
    fn truncated_digest_never_verifies() {
        let stored = hash_password("heslo-heslo");
        let (salt, digest) = stored.split_once('$').unwrap();
        let truncated = format!("{salt}${}", &digest[..digest.len() - 4]);
        assert!(!verify_password("heslo-heslo", &truncated));
    }

    #[tokio::test]
    async fn register_then_login() {
        let db = DBService::new_in_memory().await.unwrap();
        let auth = AuthService::new(db, "test-secret".to_string());
        let registered = auth
            .register(&register_data("Novak@Example.CZ", UserRole::Provider))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "novak@example.cz");

        let logged_in = auth.login("novak@example.cz", "velmi-tajne-heslo").await.unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let err = auth.login("novak@example.cz", "spatne").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let db = DBService::new_in_memory().await.unwrap();
        let auth = AuthService::new(db, "test-secret".to_string());
        auth.register(&register_data("a@example.cz", UserRole::Customer))
            .await
            .unwrap();
        let err = auth
            .register(&register_data("a@example.cz", UserRole::Customer))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn admin_self_registration_is_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let auth = AuthService::new(db, "test-secret".to_string());
        let err = auth
            .register(&register_data("root@example.cz", UserRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let auth = AuthService::new(db, "test-secret".to_string());
        let mut data = register_data("b@example.cz", UserRole::Customer);
        data.password = "krátké".to_string();
        assert!(matches!(
            auth.register(&data).await.unwrap_err(),
            AuthError::Validation(_)
        ));
    }
}
