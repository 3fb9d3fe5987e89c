//! Catalog seeding command.
//!
//! Reads a JSON array of products, ensures the owner account exists, and
//! inserts each product through the same validation path the storefront
//! uses.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use copperleaf_core::{
    CurrencyCode, Email, EmailError, NewProduct, Price, ProductValidationError,
};
use copperleaf_storefront::db::{ProductRepository, RepositoryError, UserRepository};
use copperleaf_storefront::services::auth::{AuthError, AuthService};

use super::ConnectError;

/// One product entry in the seed file.
#[derive(Debug, Deserialize)]
struct SeedProduct {
    title: String,
    price: Decimal,
    description: String,
    image_url: String,
}

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Seed file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid owner email: {0}")]
    Email(#[from] EmailError),

    #[error("Owner account error: {0}")]
    Auth(#[from] AuthError),

    #[error("Seed entry '{title}' is invalid: {source}")]
    InvalidEntry {
        title: String,
        #[source]
        source: ProductValidationError,
    },

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Seed the catalog from `file`, owned by `email`.
///
/// The owner account is created with `password` if it does not exist
/// yet; an existing account is reused (the password argument is then
/// ignored).
///
/// # Errors
///
/// Returns an error if the file is unreadable, an entry fails
/// validation, or any insert fails. Entries before the failure stay
/// inserted.
pub async fn run(file: &Path, email: &str, password: &str) -> Result<(), SeedError> {
    let pool = super::connect().await?;

    let auth = AuthService::new(&pool);
    let owner = match auth.register_with_password(email, password).await {
        Ok(user) => {
            tracing::info!(%user.id, "created owner account");
            user
        }
        Err(AuthError::UserAlreadyExists) => {
            let users = UserRepository::new(&pool);
            users
                .get_by_email(&Email::parse(email)?)
                .await?
                .ok_or(AuthError::UserAlreadyExists)?
        }
        Err(e) => return Err(e.into()),
    };

    let raw = std::fs::read_to_string(file)?;
    let entries: Vec<SeedProduct> = serde_json::from_str(&raw)?;

    let products = ProductRepository::new(&pool);
    let mut inserted = 0usize;
    for entry in entries {
        let input = NewProduct {
            title: entry.title.clone(),
            price: Price::new(entry.price, CurrencyCode::USD),
            description: entry.description,
            image_url: entry.image_url,
        };
        input.validate().map_err(|source| SeedError::InvalidEntry {
            title: entry.title,
            source,
        })?;

        products.create(owner.id, &input).await?;
        inserted += 1;
    }

    tracing::info!(inserted, "catalog seeded");
    Ok(())
}
