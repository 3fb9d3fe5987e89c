//! Application services for the storefront.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod invoice;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService};
pub use invoice::{Invoice, InvoiceLine};
