//! Product management handlers.
//!
//! Signed-in users manage their own listings: create, edit, delete.
//! Input is validated before any store mutation; validation failures
//! re-render the form with the submitted values intact. Images are
//! referenced by URL; upload handling lives outside this service.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use copperleaf_core::{CurrencyCode, NewProduct, Price, ProductId};

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::products::ProductView;

/// Product form data (create and edit share it).
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
}

/// Values redisplayed in the form after a validation failure.
#[derive(Debug, Clone, Default)]
pub struct ProductFormValues {
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
}

impl From<&ProductForm> for ProductFormValues {
    fn from(form: &ProductForm) -> Self {
        Self {
            title: form.title.clone(),
            price: form.price.clone(),
            description: form.description.clone(),
            image_url: form.image_url.clone(),
        }
    }
}

/// Owned-products listing template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub products: Vec<ProductView>,
    pub authenticated: bool,
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    /// `None` for create, the product id for edit.
    pub editing_id: Option<i32>,
    pub values: ProductFormValues,
    pub error: Option<String>,
    pub authenticated: bool,
}

/// Parse and validate form input into a `NewProduct`.
fn parse_form(form: &ProductForm) -> std::result::Result<NewProduct, String> {
    let amount = form
        .price
        .trim()
        .parse::<Decimal>()
        .map_err(|_| "price must be a number".to_owned())?;

    let input = NewProduct {
        title: form.title.trim().to_owned(),
        price: Price::new(amount, CurrencyCode::USD),
        description: form.description.trim().to_owned(),
        image_url: form.image_url.trim().to_owned(),
    };
    input.validate().map_err(|e| e.to_string())?;
    Ok(input)
}

/// Re-render the form with the submitted values and an error, 422 style.
fn form_with_error(
    editing_id: Option<i32>,
    form: &ProductForm,
    message: String,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        ProductFormTemplate {
            editing_id,
            values: ProductFormValues::from(form),
            error: Some(message),
            authenticated: true,
        },
    )
        .into_response()
}

/// List the signed-in user's products.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let repo = ProductRepository::new(state.pool());
    let products = repo.list_by_owner(current.id).await?;

    Ok(AdminProductsTemplate {
        products: products.iter().map(ProductView::from).collect(),
        authenticated: true,
    })
}

/// Display the new-product form.
pub async fn new_form(RequireAuth(_current): RequireAuth) -> impl IntoResponse {
    ProductFormTemplate {
        editing_id: None,
        values: ProductFormValues::default(),
        error: None,
        authenticated: true,
    }
}

/// Create a product.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match parse_form(&form) {
        Ok(input) => input,
        Err(message) => return Ok(form_with_error(None, &form, message)),
    };

    let repo = ProductRepository::new(state.pool());
    repo.create(current.id, &input).await?;

    Ok(Redirect::to("/admin/products").into_response())
}

/// Display the edit form for an owned product.
pub async fn edit_form(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get(ProductId::new(id))
        .await?
        .filter(|p| p.owner_id == current.id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductFormTemplate {
        editing_id: Some(id),
        values: ProductFormValues {
            title: product.title,
            price: product.price.amount.to_string(),
            description: product.description,
            image_url: product.image_url,
        },
        error: None,
        authenticated: true,
    })
}

/// Update an owned product.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match parse_form(&form) {
        Ok(input) => input,
        Err(message) => return Ok(form_with_error(Some(id), &form, message)),
    };

    let repo = ProductRepository::new(state.pool());
    match repo.update(ProductId::new(id), current.id, &input).await {
        Ok(_) => Ok(Redirect::to("/admin/products").into_response()),
        Err(RepositoryError::NotFound) => {
            Err(AppError::NotFound(format!("product {id}")))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete an owned product.
///
/// Existing orders keep their snapshots; carts still referencing the
/// product will surface it as unavailable.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let repo = ProductRepository::new(state.pool());
    let deleted = repo.delete(ProductId::new(id), current.id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    Ok(Redirect::to("/admin/products"))
}
