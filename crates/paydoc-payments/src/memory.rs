//! In-Memory Charge Gateway
//!
//! For tests and local demo runs. Intents live in a map and only change
//! status when [`MemoryGateway::set_status`] or [`MemoryGateway::confirm`]
//! is called, which stands in for the customer completing payment with the
//! processor.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PaymentError, Result};
use crate::intent::{ChargeGateway, ChargeIntent, IntentStatus, Pricing};

/// In-memory gateway
pub struct MemoryGateway {
    intents: RwLock<HashMap<String, ChargeIntent>>,
    /// When set, every call fails as if the processor were unreachable
    outage: bool,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
            outage: false,
        }
    }

    /// A gateway whose every call fails
    pub fn unavailable() -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
            outage: true,
        }
    }

    /// Move an existing intent to a new status
    pub async fn set_status(&self, intent_id: &str, status: IntentStatus) -> Result<()> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| PaymentError::IntentNotFound(intent_id.to_string()))?;
        intent.status = status;
        Ok(())
    }

    /// Mark the intent owning `client_secret` as paid, the way the browser
    /// confirms a card payment with the secret alone
    pub async fn confirm(&self, client_secret: &str) -> Result<ChargeIntent> {
        self.check_outage()?;

        let mut intents = self.intents.write().await;
        let intent = intents
            .values_mut()
            .find(|i| i.client_secret.as_deref() == Some(client_secret))
            .ok_or_else(|| PaymentError::IntentNotFound("<client secret>".into()))?;
        intent.status = IntentStatus::Succeeded;
        Ok(intent.clone())
    }

    /// Number of intents created so far
    pub async fn len(&self) -> usize {
        self.intents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.intents.read().await.is_empty()
    }

    fn check_outage(&self) -> Result<()> {
        if self.outage {
            return Err(PaymentError::Stripe("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChargeGateway for MemoryGateway {
    async fn create_intent(&self, pricing: &Pricing) -> Result<ChargeIntent> {
        self.check_outage()?;

        if pricing.amount <= 0 {
            return Err(PaymentError::Stripe(format!(
                "invalid amount: {}",
                pricing.amount
            )));
        }

        let id = format!("pi_{}", uuid::Uuid::new_v4().simple());
        let secret = format!("{id}_secret_{}", uuid::Uuid::new_v4().simple());
        let intent = ChargeIntent {
            id: id.clone(),
            client_secret: Some(secret),
            status: IntentStatus::RequiresPaymentMethod,
            amount: pricing.amount,
            currency: pricing.currency.clone(),
            created_at: Utc::now(),
        };

        self.intents.write().await.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ChargeIntent> {
        self.check_outage()?;

        if !intent_id.starts_with("pi_") {
            return Err(PaymentError::InvalidIntentId(intent_id.to_string()));
        }

        self.intents
            .read()
            .await
            .get(intent_id)
            .cloned()
            .ok_or_else(|| PaymentError::IntentNotFound(intent_id.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
