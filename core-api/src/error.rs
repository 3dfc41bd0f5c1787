//! Error types for the catalog API client

use thiserror::Error;

/// Catalog API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API refused the credential. The stored token has been removed.
    #[error("Not authorized, redirecting to {redirect_to}")]
    Unauthorized { redirect_to: String },

    /// Any other non-2xx answer
    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// The payment processor declined the card
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// The processor needs a step this client cannot perform
    #[error("Payment requires further action")]
    PaymentRequiresAction,

    /// The request never completed
    #[error("Network error: {0}")]
    Transport(String),

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    Decode(String),

    /// Reading or clearing the stored credential failed
    #[error(transparent)]
    Credentials(#[from] core_auth::AuthError),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for catalog API operations
pub type Result<T> = std::result::Result<T, ApiError>;
