//! Vendora CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! vendora-cli migrate
//!
//! # Seed the database with a demo catalog
//! vendora-cli seed
//!
//! # Mint a dev bearer token
//! vendora-cli token --user-id 1 --role admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database with a demo catalog
//! - `token` - Mint a local development JWT

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vendora-cli")]
#[command(author, version, about = "Vendora CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with a demo catalog
    Seed,
    /// Mint a local development bearer token
    Token {
        /// Numeric user id to embed in the token
        #[arg(short, long)]
        user_id: i32,

        /// Role claim (`customer` or `admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,

        /// Token lifetime in minutes
        #[arg(short, long, default_value_t = 1440)]
        ttl_minutes: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Token {
            user_id,
            role,
            ttl_minutes,
        } => commands::token::run(user_id, &role, ttl_minutes)?,
    }
    Ok(())
}
