//! Copperleaf CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! cl-cli migrate
//!
//! # Seed a demo catalog (creates the owner account if needed)
//! cl-cli seed -e owner@example.com -p 'a strong password' \
//!     -f crates/cli/seed/products.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the catalog from a JSON file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cl-cli")]
#[command(author, version, about = "Copperleaf CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a JSON file
    Seed {
        /// Email of the product owner account (created if missing)
        #[arg(short, long)]
        email: String,

        /// Password for the owner account when it has to be created
        #[arg(short, long)]
        password: String,

        /// Path to the JSON file of products
        #[arg(short, long, default_value = "crates/cli/seed/products.json")]
        file: PathBuf,
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
        Commands::Seed {
            email,
            password,
            file,
        } => {
            commands::seed::run(&file, &email, &password).await?;
        }
    }
    Ok(())
}
