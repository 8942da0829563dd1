// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session lifetime for regular logins.
const SESSION_TTL_SECS: usize = 30 * 24 * 60 * 60;
/// Lifetime for password-reset tokens.
const RESET_TOKEN_TTL_SECS: usize = 15 * 60;

/// Who a token speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Cafe,
    Admin,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user or cafe document ID)
    pub sub: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated principal extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject_id: String,
    pub role: Role,
}

impl AuthUser {
    /// Fail with `Unauthorized` unless the principal has `role`.
    pub fn require_role(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get("brewpoints_token") {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(&token, &key, &validation).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let auth_user = AuthUser {
        subject_id: token_data.claims.sub,
        role: token_data.claims.role,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Create a session JWT for a principal.
pub fn create_jwt(subject_id: &str, role: Role, signing_key: &[u8]) -> anyhow::Result<String> {
    create_jwt_with_ttl(subject_id, role, signing_key, SESSION_TTL_SECS)
}

/// Create a short-lived token for the password-reset handoff.
pub fn create_reset_jwt(subject_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    create_jwt_with_ttl(subject_id, Role::User, signing_key, RESET_TOKEN_TTL_SECS)
}

fn create_jwt_with_ttl(
    subject_id: &str,
    role: Role,
    signing_key: &[u8],
    ttl_secs: usize,
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: subject_id.to_string(),
        role,
        iat: now,
        exp: now + ttl_secs,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_round_trip() {
        let key = b"test_jwt_key_32_bytes_minimum!!";
        let token = create_jwt("cafe-42", Role::Cafe, key).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(key),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, "cafe-42");
        assert_eq!(decoded.claims.role, Role::Cafe);
    }

    #[test]
    fn test_jwt_wrong_key_rejected() {
        let token = create_jwt("u1", Role::User, b"correct_key_32_bytes_minimum!!!").unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"wrong_key_32_bytes_minimum!!!!!"),
            &Validation::new(Algorithm::HS256),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_require_role() {
        let user = AuthUser {
            subject_id: "u1".to_string(),
            role: Role::User,
        };
        assert!(user.require_role(Role::User).is_ok());
        assert!(user.require_role(Role::Admin).is_err());
    }
}
