//! JWT authentication.
//!
//! Tokens are HS256-signed with the configured secret and expire after 24
//! hours. [`AuthUser`] is an axum extractor: adding it to a handler's
//! signature makes the route require a valid `Authorization: Bearer` header
//! (401 when missing, 403 when invalid or expired).

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::UserRole;

use super::error::ApiError;
use super::AppState;

const TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by every token. Serialized field names follow the API's
/// camelCase wire format so existing clients keep working.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: UserRole,
    pub exp: i64,
}

pub fn issue_token(
    user_id: &str,
    role: UserRole,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        user_id: user_id.to_string(),
        role,
        exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// The authenticated caller, as established from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: UserRole,
}

impl AuthUser {
    /// Authorization gate: 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[UserRole]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Insufficient permissions"))
        }
    }

    /// Ownership gate used by instructor resources: admins pass, everyone
    /// else must match the owning ID.
    pub fn require_owner_or_admin(&self, owner_id: &str, message: &str) -> Result<(), ApiError> {
        if self.role == UserRole::Admin || self.user_id == owner_id {
            Ok(())
        } else {
            Err(ApiError::forbidden(message))
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let Some(token) = token else {
            return Err(ApiError::unauthorized("Authentication required"));
        };

        let claims = verify_token(token, &state.config.jwt_secret)
            .map_err(|_| ApiError::forbidden("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            role: claims.role,
        })
    }
}
