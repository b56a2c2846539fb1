//! Application State

use std::sync::Arc;

use paydoc_issuance::{ChargeInitiator, DocumentIssuer};
use paydoc_payments::MemoryGateway;

use crate::config::AppConfig;
use crate::rate_limit::AdmissionCheck;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration
    pub config: Arc<AppConfig>,

    /// Starts payments
    pub initiator: Arc<ChargeInitiator>,

    /// Releases documents for paid intents
    pub issuer: Arc<DocumentIssuer>,

    /// Per-route, per-caller request quota
    pub limiter: Arc<dyn AdmissionCheck>,

    /// Set only on the memory backend, where payments are confirmed locally
    pub demo_gateway: Option<Arc<MemoryGateway>>,
}
