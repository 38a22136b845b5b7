//! Bearer-token authentication.
//!
//! Token *issuance* is an external collaborator; this module only verifies
//! HS256 bearer tokens and turns their claims into a [`Principal`] that is
//! passed explicitly into every workflow call. `issue_token` exists for the
//! dev CLI and the test suites.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn protected_handler(
//!     RequireAuth(principal): RequireAuth,
//! ) -> impl IntoResponse {
//!     format!("hello, user {}", principal.user_id)
//! }
//! ```

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vendora_core::{Principal, Role, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (subject).
    pub sub: String,
    /// Role name (`customer` or `admin`).
    pub role: String,
    /// Expiration timestamp (seconds).
    pub exp: i64,
    /// Issued-at timestamp (seconds).
    pub iat: i64,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

/// Verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and extract the caller identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the signature is invalid, the token is
    /// expired, or the claims don't parse.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let user_id = data
            .claims
            .sub
            .parse::<i32>()
            .map_err(|_| AuthError::InvalidClaims(format!("non-numeric sub: {}", data.claims.sub)))?;
        let role = data
            .claims
            .role
            .parse::<Role>()
            .map_err(AuthError::InvalidClaims)?;

        Ok(Principal {
            user_id: UserId::new(user_id),
            role,
        })
    }
}

/// Mint a token for local development and tests.
///
/// # Errors
///
/// Returns `AuthError::InvalidToken` if encoding fails.
pub fn issue_token(
    secret: &SecretString,
    user_id: UserId,
    role: Role,
    ttl_minutes: i64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Extract the bearer token from the Authorization header and verify it.
fn principal_from_parts(parts: &Parts, state: &AppState) -> Result<Principal, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    let token = header.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)?;
    Ok(state.verifier().verify(token)?)
}

/// Extractor that requires an authenticated caller.
pub struct RequireAuth(pub Principal);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(principal_from_parts(parts, state)?))
    }
}

/// Extractor that requires an authenticated caller with the admin role.
pub struct RequireAdmin(pub Principal);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = principal_from_parts(parts, state)?;
        if !principal.is_admin() {
            return Err(AppError::Unauthorized("admin role required".to_owned()));
        }
        Ok(Self(principal))
    }
}
