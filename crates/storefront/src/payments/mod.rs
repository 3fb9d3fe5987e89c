//! Checkout-session provider client.
//!
//! The storefront never handles card data: it sends a priced line-item
//! list to the provider, receives an opaque session id plus a redirect
//! URL, and sends the customer there. On return, the session status is
//! looked up again server-side; order materialization is gated on the
//! provider reporting the session complete.

mod error;

pub use error::PaymentError;

use core::fmt;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use copperleaf_core::Product;

use crate::config::PaymentConfig;

/// One priced line sent to the provider.
///
/// Amounts are in the currency's minor unit; conversion from decimal
/// prices happens here, at the provider boundary, and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentLineItem {
    /// Product title shown on the provider's payment page.
    pub name: String,
    /// Product description shown on the provider's payment page.
    pub description: String,
    /// Unit amount in minor units (e.g., cents).
    pub unit_amount: i64,
    /// Lowercase ISO 4217 currency code.
    pub currency: String,
    /// Units purchased.
    pub quantity: u32,
}

impl PaymentLineItem {
    /// Build a line item from a product and quantity.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            name: product.title.clone(),
            description: product.description.clone(),
            unit_amount: product.price.minor_units(),
            currency: product.price.currency_code.lowercase(),
            quantity,
        }
    }
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    /// Opaque provider session id.
    pub id: String,
    /// Where to send the customer to pay.
    pub redirect_url: String,
}

/// Status of a checkout session as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSessionStatus {
    /// The customer has not completed payment.
    Open,
    /// Payment completed; the session can back an order.
    Complete,
    /// The session lapsed without payment.
    Expired,
}

impl fmt::Display for PaymentSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Complete => "complete",
            Self::Expired => "expired",
        })
    }
}

/// A provider of hosted checkout sessions.
///
/// The production implementation is [`HttpPaymentClient`]; tests use
/// stubs so gating logic can be exercised offline.
pub trait PaymentProvider {
    /// Create a checkout session for the given line items.
    async fn create_session(
        &self,
        line_items: &[PaymentLineItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<PaymentSession, PaymentError>;

    /// Look up the current status of a session.
    async fn session_status(
        &self,
        session_id: &str,
    ) -> Result<PaymentSessionStatus, PaymentError>;
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    mode: &'static str,
    line_items: &'a [PaymentLineItem],
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct SessionStatusResponse {
    status: String,
}

/// HTTP client for a Stripe-shaped checkout-session API.
#[derive(Clone)]
pub struct HttpPaymentClient {
    client: Client,
    base_url: String,
    secret_key: SecretString,
}

impl fmt::Debug for HttpPaymentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPaymentClient")
            .field("base_url", &self.base_url)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpPaymentClient {
    /// Create a new client from configuration.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            secret_key: config.secret_key.clone(),
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(PaymentError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }
}

impl PaymentProvider for HttpPaymentClient {
    #[instrument(skip(self, line_items), fields(lines = line_items.len()))]
    async fn create_session(
        &self,
        line_items: &[PaymentLineItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<PaymentSession, PaymentError> {
        let request = CreateSessionRequest {
            mode: "payment",
            line_items,
            success_url,
            cancel_url,
        };

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(self.secret_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let body: SessionResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::Response(e.to_string()))?;

        Ok(PaymentSession {
            id: body.id,
            redirect_url: body.url,
        })
    }

    #[instrument(skip(self))]
    async fn session_status(
        &self,
        session_id: &str,
    ) -> Result<PaymentSessionStatus, PaymentError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.base_url
            ))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let body: SessionStatusResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::Response(e.to_string()))?;

        parse_status(&body.status)
    }
}

/// Parse a provider status string.
fn parse_status(raw: &str) -> Result<PaymentSessionStatus, PaymentError> {
    match raw {
        "open" => Ok(PaymentSessionStatus::Open),
        "complete" => Ok(PaymentSessionStatus::Complete),
        "expired" => Ok(PaymentSessionStatus::Expired),
        other => Err(PaymentError::Response(format!(
            "unknown session status: {other}"
        ))),
    }
}
