//! Catalog product and its validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Price, ProductId, UserId};

/// A catalog product.
///
/// Products are mutable catalog rows. Orders never reference them live;
/// at checkout their fields are copied into a
/// [`ProductSnapshot`](crate::order::ProductSnapshot) so later edits or
/// deletion cannot alter placed orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Unit price. Always positive.
    pub price: Price,
    /// Long-form description.
    pub description: String,
    /// Reference to the product image in the object store.
    pub image_url: String,
    /// The user who listed this product.
    pub owner_id: UserId,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Validation errors for product input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductValidationError {
    /// Title is missing or too short.
    #[error("title must be at least {} characters", NewProduct::MIN_TITLE_LENGTH)]
    TitleTooShort,
    /// Price is zero or negative.
    #[error("price must be greater than zero")]
    NonPositivePrice,
    /// Description is outside the accepted length range.
    #[error(
        "description must be between {} and {} characters",
        NewProduct::MIN_DESCRIPTION_LENGTH,
        NewProduct::MAX_DESCRIPTION_LENGTH
    )]
    DescriptionLength,
    /// Image reference is missing.
    #[error("image URL is required")]
    MissingImage,
}

/// Product input prior to persistence.
///
/// Checked with [`NewProduct::validate`] before any store mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Long-form description.
    pub description: String,
    /// Reference to the product image in the object store.
    pub image_url: String,
}

impl NewProduct {
    /// Minimum title length.
    pub const MIN_TITLE_LENGTH: usize = 3;
    /// Minimum description length.
    pub const MIN_DESCRIPTION_LENGTH: usize = 5;
    /// Maximum description length.
    pub const MAX_DESCRIPTION_LENGTH: usize = 400;

    /// Validate the input.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule: title length, price positivity,
    /// description length, image presence.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.title.trim().chars().count() < Self::MIN_TITLE_LENGTH {
            return Err(ProductValidationError::TitleTooShort);
        }
        if !self.price.is_positive() {
            return Err(ProductValidationError::NonPositivePrice);
        }
        let description_len = self.description.trim().chars().count();
        if !(Self::MIN_DESCRIPTION_LENGTH..=Self::MAX_DESCRIPTION_LENGTH)
            .contains(&description_len)
        {
            return Err(ProductValidationError::DescriptionLength);
        }
        if self.image_url.trim().is_empty() {
            return Err(ProductValidationError::MissingImage);
        }
        Ok(())
    }
}
