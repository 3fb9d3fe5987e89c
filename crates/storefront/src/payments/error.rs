//! Payment-provider errors.

use thiserror::Error;

/// Errors that can occur when talking to the checkout-session provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("payment request failed: {0}")]
    Request(String),

    /// Failed to parse the provider response.
    #[error("payment response error: {0}")]
    Response(String),

    /// The provider returned an error status.
    #[error("payment API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Provider error body, truncated.
        message: String,
    },
}
