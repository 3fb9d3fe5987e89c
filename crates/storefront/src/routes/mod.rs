//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Shop front page (paginated)
//! GET  /health                   - Health check
//!
//! # Products
//! GET  /products                 - Product listing (paginated)
//! GET  /products/{id}            - Product detail
//!
//! # Cart (requires auth for mutations)
//! GET  /cart                     - Cart page
//! POST /cart                     - Add to cart
//! POST /cart/delete              - Remove item from cart
//!
//! # Checkout (requires auth)
//! GET  /checkout                 - Review cart, create payment session
//! GET  /checkout/success         - Payment return URL; materializes the order
//! GET  /checkout/cancel          - Payment abandoned; back to the cart
//!
//! # Orders (requires auth)
//! GET  /orders                   - Order history
//! GET  /orders/{id}/invoice      - Printable invoice document
//!
//! # Auth
//! GET  /login                    - Login page
//! POST /login                    - Login action
//! GET  /signup                   - Registration page
//! POST /signup                   - Registration action
//! POST /logout                   - Logout action
//! GET  /reset-password           - Request password reset page
//! POST /reset-password           - Send reset email
//! GET  /reset-password/{token}   - New password form
//! POST /new-password             - Complete password reset
//!
//! # Product management (requires auth; own products only)
//! GET  /admin/products           - Owned products
//! GET  /admin/products/new       - New product form
//! POST /admin/products           - Create product
//! GET  /admin/products/{id}/edit - Edit product form
//! POST /admin/products/{id}      - Update product
//! POST /admin/products/{id}/delete - Delete product
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .route(
            "/reset-password",
            get(auth::reset_page).post(auth::request_reset),
        )
        .route("/reset-password/{token}", get(auth::new_password_page))
        .route("/new-password", post(auth::new_password))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add))
        .route("/delete", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}/invoice", get(orders::invoice))
}

/// Create the product-management routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::index).post(admin::create),
        )
        .route("/products/new", get(admin::new_form))
        .route("/products/{id}", post(admin::update))
        .route("/products/{id}/edit", get(admin::edit_form))
        .route("/products/{id}/delete", post(admin::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Shop front page
        .route("/", get(home::home))
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout routes
        .nest("/checkout", checkout_routes())
        // Order routes
        .nest("/orders", order_routes())
        // Product management
        .nest("/admin", admin_routes())
        // Auth routes at the top level
        .merge(auth_routes())
}
