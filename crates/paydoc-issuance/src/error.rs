//! Issuance Error Types
//!
//! Every way a request can fail, so the HTTP layer maps kinds to statuses
//! in one place instead of catching everything as a generic failure.

use paydoc_payments::{IntentStatus, PaymentError};
use paydoc_pdf::RenderError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, IssueError>;

/// Issuance errors
#[derive(Error, Debug)]
pub enum IssueError {
    /// The payment processor call failed
    #[error("Payment collaborator failed: {0}")]
    Collaborator(#[from] PaymentError),

    /// The intent exists but has not been paid
    #[error("Payment not succeeded for intent {intent_id} (status: {status})")]
    PaymentNotSucceeded {
        intent_id: String,
        status: IntentStatus,
    },

    /// The once-per-intent policy already issued a document for this intent
    #[error("Document already issued for intent {intent_id}")]
    AlreadyIssued { intent_id: String },

    /// Rendering failed or the artifact was missing afterwards
    #[error("Render failure: {0}")]
    Render(String),

    /// Anything else
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl From<RenderError> for IssueError {
    fn from(err: RenderError) -> Self {
        Self::Render(err.to_string())
    }
}

impl IssueError {
    /// Fixed phrase safe to show to the caller
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::PaymentNotSucceeded { .. } => "Payment required",
            Self::AlreadyIssued { .. } => "Document already issued for this payment",
            Self::Render(_) => "Failed to generate PDF",
            Self::Collaborator(_) | Self::Unexpected(_) => "Internal server error",
        }
    }

    /// Machine-readable code for API responses
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PaymentNotSucceeded { .. } => "PAYMENT_REQUIRED",
            Self::AlreadyIssued { .. } => "ALREADY_ISSUED",
            Self::Render(_) => "RENDER_ERROR",
            Self::Collaborator(_) | Self::Unexpected(_) => "INTERNAL_ERROR",
        }
    }
}
