//! Charge Intents
//!
//! The gateway-neutral view of a payment: what we ask the processor to
//! create, and what we read back when checking whether it was paid.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle status of a charge intent, using Stripe's wire names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    RequiresCapture,
    Canceled,
    /// A status this build does not know about
    #[serde(untagged)]
    Other(String),
}

impl IntentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Processing => "processing",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only a succeeded intent unlocks a document.
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed price charged for one document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Amount in the smallest currency unit (cents for USD)
    pub amount: i64,

    /// Lowercase ISO 4217 code, e.g. "usd"
    pub currency: String,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            amount: 500, // $5.00
            currency: "usd".into(),
        }
    }
}

/// A charge intent as seen by this service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChargeIntent {
    /// Processor-assigned id (`pi_...` for Stripe)
    pub id: String,

    /// Secret handed to the client to confirm the payment
    pub client_secret: Option<String>,

    pub status: IntentStatus,

    pub amount: i64,

    pub currency: String,

    pub created_at: DateTime<Utc>,
}

/// Payment processor strategy
///
/// Implemented by [`crate::StripeGateway`] for production and by
/// [`crate::MemoryGateway`] for tests and local runs.
#[async_trait]
pub trait ChargeGateway: Send + Sync {
    /// Create a new charge intent for the given price
    async fn create_intent(&self, pricing: &Pricing) -> Result<ChargeIntent>;

    /// Look up an existing intent by id
    async fn retrieve_intent(&self, intent_id: &str) -> Result<ChargeIntent>;

    /// Backend name for health output and logs
    fn name(&self) -> &str;
}
