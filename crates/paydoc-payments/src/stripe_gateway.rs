//! Stripe PaymentIntents Integration
//!
//! Implements the "Stripe Elements (Embedded)" flow: we create a
//! PaymentIntent server-side, hand its client secret to the browser, and
//! Stripe.js confirms the card payment directly with Stripe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stripe::{
    Client, CreatePaymentIntent, Currency, PaymentIntent, PaymentIntentId, StripeError,
};

use crate::error::{PaymentError, Result};
use crate::intent::{ChargeGateway, ChargeIntent, IntentStatus, Pricing};

/// Stripe client wrapper
pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway from a secret key
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }
}

#[async_trait]
impl ChargeGateway for StripeGateway {
    async fn create_intent(&self, pricing: &Pricing) -> Result<ChargeIntent> {
        let currency = parse_currency(&pricing.currency)?;
        let params = CreatePaymentIntent::new(pricing.amount, currency);

        let intent = PaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        tracing::debug!(intent_id = %intent.id, "Stripe payment intent created");
        Ok(to_charge_intent(intent))
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ChargeIntent> {
        let id: PaymentIntentId = intent_id
            .parse()
            .map_err(|_| PaymentError::InvalidIntentId(intent_id.to_string()))?;

        let intent = PaymentIntent::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| match e {
                StripeError::Stripe(ref req) if req.http_status == 404 => {
                    PaymentError::IntentNotFound(intent_id.to_string())
                }
                other => PaymentError::Stripe(other.to_string()),
            })?;

        Ok(to_charge_intent(intent))
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

/// Stripe's `Currency` deserializes from the lowercase ISO code.
fn parse_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_lowercase()))
        .map_err(|_| PaymentError::Config(format!("unsupported currency: {code}")))
}

fn currency_code(currency: Currency) -> String {
    serde_json::to_value(currency)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn to_charge_intent(intent: PaymentIntent) -> ChargeIntent {
    ChargeIntent {
        id: intent.id.to_string(),
        client_secret: intent.client_secret,
        status: IntentStatus::parse(intent.status.as_str()),
        amount: intent.amount,
        currency: currency_code(intent.currency),
        created_at: DateTime::<Utc>::from_timestamp(intent.created, 0).unwrap_or_default(),
    }
}
