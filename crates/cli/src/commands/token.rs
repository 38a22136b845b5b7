//! Mint a development bearer token.
//!
//! Token issuance is an external collaborator in production; this command
//! exists so local runs and manual testing can authenticate against the
//! API. Requires the same `VENDORA_JWT_SECRET` the server was started with.

use secrecy::SecretString;
use thiserror::Error;

use vendora_api::middleware::auth::{AuthError, issue_token};
use vendora_core::{Role, UserId};

use super::MissingEnvVar;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Token error: {0}")]
    Auth(#[from] AuthError),
}

/// Mint and print a token.
#[allow(clippy::print_stdout)] // the token is the command's output
pub fn run(user_id: i32, role: &str, ttl_minutes: i64) -> Result<(), TokenError> {
    dotenvy::dotenv().ok();
    let secret = std::env::var("VENDORA_JWT_SECRET")
        .map_err(|_| MissingEnvVar("VENDORA_JWT_SECRET"))?;

    let role: Role = role.parse().map_err(TokenError::InvalidRole)?;
    let token = issue_token(
        &SecretString::from(secret),
        UserId::new(user_id),
        role,
        ttl_minutes,
    )?;

    println!("{token}");
    Ok(())
}
