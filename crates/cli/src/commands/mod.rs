//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod token;

/// Read the database URL from `VENDORA_DATABASE_URL`, falling back to the
/// generic `DATABASE_URL`.
pub(crate) fn database_url() -> Result<String, MissingEnvVar> {
    dotenvy::dotenv().ok();
    std::env::var("VENDORA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MissingEnvVar("VENDORA_DATABASE_URL"))
}

/// A required environment variable is unset.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);
