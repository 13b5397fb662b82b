//! Stateless token auth for the admin surface: HS256 JWTs with a 24-hour
//! expiry, carried in an HTTP-only cookie.

mod password;

pub use password::{hash_password, verify_password};

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

use crate::db::repository;
use crate::error::AppError;

pub const AUTH_COOKIE: &str = "auth_token";
pub const TOKEN_TTL_SECONDS: i64 = 60 * 60 * 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub id: i64,
    pub exp: i64,
}

pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn create_token(&self, id: i64, username: &str) -> Result<String, AppError> {
        let claims = Claims {
            username: username.to_string(),
            id,
            exp: (Utc::now() + Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Auth(format!("Failed to sign token: {e}")))
    }

    /// A malformed token, a bad signature and an expired token are all the
    /// same `None` to the caller; no detail leaks.
    pub fn verify_token(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .ok()
    }

    /// Check credentials and issue a token. Unknown username and wrong
    /// password are indistinguishable to the caller.
    pub async fn login(
        &self,
        db: &SqlitePool,
        username: &str,
        password: &str,
    ) -> Result<(String, Claims), AppError> {
        let admin = repository::find_admin_by_username(db, username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = match verify_password(password, &admin.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                warn!("stored password hash for {} is unreadable: {}", username, e);
                false
            }
        };
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(admin.id, &admin.username)?;
        let claims = self
            .verify_token(&token)
            .ok_or_else(|| AppError::Auth("freshly issued token failed to verify".to_string()))?;
        Ok((token, claims))
    }
}

/// Pull the auth token out of a `Cookie` header, if present.
pub fn token_from_cookie_header(header: Option<&str>) -> Option<String> {
    let header = header?;
    header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("auth_token=").map(str::to_string))
}

/// `Set-Cookie` value carrying a fresh token.
pub fn session_cookie(token: &str) -> String {
    format!("{AUTH_COOKIE}={token}; HttpOnly; SameSite=Lax; Max-Age={TOKEN_TTL_SECONDS}; Path=/")
}

/// `Set-Cookie` value that clears the session.
pub fn clear_session_cookie() -> String {
    format!("{AUTH_COOKIE}=; HttpOnly; SameSite=Lax; Max-Age=0; Path=/")
}
