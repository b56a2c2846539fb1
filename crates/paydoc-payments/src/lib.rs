//! # paydoc-payments
//!
//! Charge intent gateway for paydoc.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐  create   ┌──────────┐  client_secret  ┌──────────┐
//! │  paydoc  │──────────▶│  Stripe  │────────────────▶│  Browser │
//! │  server  │◀──────────│          │◀────────────────│ Stripe.js│
//! └──────────┘ retrieve  └──────────┘    confirm      └──────────┘
//! ```
//!
//! The server never sees card data. It creates a PaymentIntent for a fixed
//! price, gives the browser the client secret, and later retrieves the
//! intent by id to check whether it reached `succeeded`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paydoc_payments::{ChargeGateway, Pricing, StripeGateway};
//!
//! let gateway = StripeGateway::new("sk_test_xxx");
//!
//! let intent = gateway.create_intent(&Pricing::default()).await?;
//! // Send intent.client_secret to the browser
//!
//! let intent = gateway.retrieve_intent(&intent.id).await?;
//! if intent.status.is_paid() { /* release the goods */ }
//! ```

mod error;
mod intent;
mod memory;
mod stripe_gateway;

pub use error::{PaymentError, Result};
pub use intent::{ChargeGateway, ChargeIntent, IntentStatus, Pricing};
pub use memory::MemoryGateway;
pub use stripe_gateway::StripeGateway;
