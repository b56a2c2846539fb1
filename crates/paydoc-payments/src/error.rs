//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error (network, auth, rejected parameters)
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Intent id is not a well-formed PaymentIntent id
    #[error("Invalid payment intent id: {0}")]
    InvalidIntentId(String),

    /// Intent id is well-formed but unknown to the gateway
    #[error("Payment intent not found: {0}")]
    IntentNotFound(String),

    /// The gateway created an intent but handed back no client secret
    #[error("Payment intent {0} has no client secret")]
    MissingClientSecret(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Stripe(_) | Self::MissingClientSecret(_) => {
                "Payment processing failed. Please try again."
            }
            Self::InvalidIntentId(_) | Self::IntentNotFound(_) => "Payment could not be found.",
            Self::Config(_) => "Service configuration error.",
        }
    }
}
