//! Charge Initiator
//!
//! Starts a payment: one intent per call, for the configured price.

use std::sync::Arc;

use paydoc_payments::{ChargeGateway, PaymentError, Pricing};

use crate::error::Result;

/// What the caller needs to finish paying
#[derive(Clone, Debug)]
pub struct InitiatedCharge {
    pub intent_id: String,
    pub client_secret: String,
}

pub struct ChargeInitiator {
    gateway: Arc<dyn ChargeGateway>,
    pricing: Pricing,
}

impl ChargeInitiator {
    pub fn new(gateway: Arc<dyn ChargeGateway>, pricing: Pricing) -> Self {
        Self { gateway, pricing }
    }

    /// Create a charge intent and return its client secret
    pub async fn initiate(&self) -> Result<InitiatedCharge> {
        tracing::info!(
            amount = self.pricing.amount,
            currency = %self.pricing.currency,
            "Creating payment intent"
        );

        let intent = self
            .gateway
            .create_intent(&self.pricing)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error creating payment intent"))?;

        let Some(client_secret) = intent.client_secret.filter(|s| !s.is_empty()) else {
            tracing::error!(intent_id = %intent.id, "Payment intent returned without client secret");
            return Err(PaymentError::MissingClientSecret(intent.id).into());
        };

        tracing::info!(intent_id = %intent.id, "Payment intent created");
        Ok(InitiatedCharge {
            intent_id: intent.id,
            client_secret,
        })
    }
}
