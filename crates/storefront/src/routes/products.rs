//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use copperleaf_core::{Product, ProductId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Products shown per catalog page.
pub const ITEMS_PER_PAGE: u32 = 12;

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Pagination state for listing templates.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub previous_page: u32,
    pub next_page: u32,
}

impl Pagination {
    /// Compute pagination from a total row count and a 1-based page.
    #[must_use]
    pub fn compute(total_items: i64, current_page: u32, per_page: u32) -> Self {
        let last_page = u32::try_from((total_items.max(0) as u64).div_ceil(u64::from(per_page)))
            .unwrap_or(u32::MAX)
            .max(1);
        let current_page = current_page.clamp(1, last_page);

        Self {
            current_page,
            last_page,
            has_previous_page: current_page > 1,
            has_next_page: current_page < last_page,
            previous_page: current_page.saturating_sub(1).max(1),
            next_page: current_page.saturating_add(1).min(last_page),
        }
    }
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ProductsIndexTemplate {
    pub page_title: &'static str,
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
    pub authenticated: bool,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_detail.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
    pub authenticated: bool,
}

/// Shared implementation for the two paginated listings.
pub async fn listing(
    state: &AppState,
    page_title: &'static str,
    query: PaginationQuery,
    authenticated: bool,
) -> Result<ProductsIndexTemplate> {
    let repo = ProductRepository::new(state.pool());
    let requested_page = query.page.unwrap_or(1).max(1);

    let total_items = repo.count().await?;
    let pagination = Pagination::compute(total_items, requested_page, ITEMS_PER_PAGE);
    let products = repo
        .list_page(pagination.current_page, ITEMS_PER_PAGE)
        .await?;

    Ok(ProductsIndexTemplate {
        page_title,
        products: products.iter().map(ProductView::from).collect(),
        pagination,
        authenticated,
    })
}

/// Display the product listing page.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    listing(&state, "Products", query, user.is_some()).await
}

/// Display a product detail page.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductShowTemplate {
        product: ProductView::from(&product),
        authenticated: user.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_covers_partial_last_pages() {
        let p = Pagination::compute(25, 1, 12);
        assert_eq!(p.last_page, 3);
        assert!(p.has_next_page);
        assert!(!p.has_previous_page);

        let p = Pagination::compute(25, 3, 12);
        assert!(!p.has_next_page);
        assert!(p.has_previous_page);
        assert_eq!(p.previous_page, 2);
    }

    #[test]
    fn pagination_clamps_out_of_range_pages() {
        let p = Pagination::compute(5, 99, 12);
        assert_eq!(p.current_page, 1);
        assert_eq!(p.last_page, 1);

        let p = Pagination::compute(0, 1, 12);
        assert_eq!(p.last_page, 1);
        assert!(!p.has_next_page);
    }
}
