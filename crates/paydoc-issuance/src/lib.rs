//! # paydoc-issuance
//!
//! The two-step workflow behind paydoc:
//!
//! 1. [`ChargeInitiator`] creates a charge intent and returns its client secret.
//! 2. [`DocumentIssuer`] re-checks the intent and, only once it has
//!    succeeded, renders and stores a document.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use paydoc_issuance::{ArtifactStore, DocumentIssuer};
//! use paydoc_payments::StripeGateway;
//! use paydoc_pdf::PdfRenderer;
//!
//! let issuer = DocumentIssuer::new(
//!     Arc::new(StripeGateway::new("sk_test_xxx")),
//!     Arc::new(PdfRenderer::default()),
//!     ArtifactStore::new("/tmp/paydoc", false),
//! );
//! let artifact = issuer.issue(&fields, "pi_123").await?;
//! ```

mod artifact;
mod error;
mod initiator;
mod issuer;
mod policy;

pub use artifact::{ARTIFACT_SUFFIX, Artifact, ArtifactStore};
pub use error::{IssueError, Result};
pub use initiator::{ChargeInitiator, InitiatedCharge};
pub use issuer::DocumentIssuer;
pub use policy::{Claim, IssuanceLedger, IssuancePolicy};
