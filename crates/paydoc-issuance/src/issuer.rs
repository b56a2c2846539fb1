//! Document Issuer
//!
//! Releases a rendered document only after the payment processor confirms
//! the referenced intent has succeeded.
//!
//! ```text
//! retrieve intent ──▶ status == succeeded? ──no──▶ PaymentNotSucceeded
//!                              │ yes
//!                     policy allows? ──no──▶ AlreadyIssued
//!                              │ yes
//!                  render ──▶ persist ──▶ verify ──▶ Artifact
//! ```

use std::sync::Arc;

use paydoc_payments::ChargeGateway;
use paydoc_pdf::{DocumentFields, DocumentRenderer};

use crate::artifact::{Artifact, ArtifactStore};
use crate::error::{IssueError, Result};
use crate::policy::{IssuanceLedger, IssuancePolicy};

pub struct DocumentIssuer {
    gateway: Arc<dyn ChargeGateway>,
    renderer: Arc<dyn DocumentRenderer>,
    store: ArtifactStore,
    policy: IssuancePolicy,
    ledger: Arc<IssuanceLedger>,
}

impl DocumentIssuer {
    pub fn new(
        gateway: Arc<dyn ChargeGateway>,
        renderer: Arc<dyn DocumentRenderer>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            gateway,
            renderer,
            store,
            policy: IssuancePolicy::default(),
            ledger: Arc::new(IssuanceLedger::new()),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: IssuancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check payment for `intent_id`, then render `fields` into a new artifact.
    ///
    /// Rendering runs on its own task and always finishes. If the caller
    /// stops waiting, the claim on the intent is released and the finished
    /// artifact removes its file when the task drops it.
    pub async fn issue(&self, fields: &DocumentFields, intent_id: &str) -> Result<Artifact> {
        tracing::info!(intent_id = %intent_id, fields = fields.len(), "Generating PDF");

        let intent = self
            .gateway
            .retrieve_intent(intent_id)
            .await
            .inspect_err(|e| {
                tracing::error!(intent_id = %intent_id, error = %e, "Error retrieving payment intent");
            })?;

        if !intent.status.is_paid() {
            tracing::warn!(
                intent_id = %intent_id,
                status = %intent.status,
                "Payment not successful for intent"
            );
            return Err(IssueError::PaymentNotSucceeded {
                intent_id: intent_id.to_string(),
                status: intent.status,
            });
        }

        let claim = match self.policy {
            IssuancePolicy::Unlimited => None,
            IssuancePolicy::OncePerIntent => {
                let Some(claim) = self.ledger.claim(intent_id) else {
                    tracing::warn!(intent_id = %intent_id, "Document already issued for intent");
                    return Err(IssueError::AlreadyIssued {
                        intent_id: intent_id.to_string(),
                    });
                };
                Some(claim)
            }
        };

        let task = tokio::spawn(render(
            Arc::clone(&self.renderer),
            self.store.clone(),
            fields.clone(),
        ));
        let result = task
            .await
            .unwrap_or_else(|e| Err(IssueError::Unexpected(format!("render task failed: {e}"))));

        match result {
            Ok(artifact) => {
                if let Some(claim) = claim {
                    claim.commit();
                }
                tracing::info!(intent_id = %intent_id, artifact = %artifact.name(), "PDF generated successfully");
                Ok(artifact)
            }
            Err(e) => {
                tracing::error!(intent_id = %intent_id, error = %e, "Failed to generate PDF");
                Err(e)
            }
        }
    }
}

async fn render(
    renderer: Arc<dyn DocumentRenderer>,
    store: ArtifactStore,
    fields: DocumentFields,
) -> Result<Artifact> {
    let name = ArtifactStore::fresh_name();
    let bytes = renderer.render(&fields)?;
    store.persist(name, bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use paydoc_payments::{IntentStatus, MemoryGateway, Pricing};
    use paydoc_pdf::{PdfRenderer, RenderError, read_text_lines};

    struct BrokenRenderer;

    struct PanickingRenderer;

    impl DocumentRenderer for PanickingRenderer {
        fn render(&self, _fields: &DocumentFields) -> paydoc_pdf::Result<Vec<u8>> {
            panic!("renderer bug")
        }
    }

    impl DocumentRenderer for BrokenRenderer {
        fn render(&self, _fields: &DocumentFields) -> paydoc_pdf::Result<Vec<u8>> {
            Err(RenderError::Pdf("boom".into()))
        }
    }

    struct Fixture {
        gateway: Arc<MemoryGateway>,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                gateway: Arc::new(MemoryGateway::new()),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn issuer(&self, retain: bool) -> DocumentIssuer {
            DocumentIssuer::new(
                self.gateway.clone(),
                Arc::new(PdfRenderer::default()),
                ArtifactStore::new(self.dir.path(), retain),
            )
        }

        async fn intent(&self, status: IntentStatus) -> String {
            let intent = self.gateway.create_intent(&Pricing::default()).await.unwrap();
            self.gateway.set_status(&intent.id, status).await.unwrap();
            intent.id
        }

        fn files_on_disk(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }
    }

    fn acme() -> DocumentFields {
        serde_json::from_str(r#"{"Company Name": "Acme", "Tax ID": "123"}"#).unwrap()
    }

    #[tokio::test]
    async fn test_succeeded_intent_yields_document() {
        let fx = Fixture::new();
        let id = fx.intent(IntentStatus::Succeeded).await;

        let artifact = fx.issuer(false).issue(&acme(), &id).await.unwrap();

        let pages = read_text_lines(artifact.bytes()).unwrap();
        assert_eq!(
            pages[0],
            ["Business Information", "Company Name: Acme", "Tax ID: 123"]
        );
        assert!(artifact.path().exists());
    }

    #[tokio::test]
    async fn test_unpaid_statuses_are_payment_required() {
        let fx = Fixture::new();
        let issuer = fx.issuer(true);

        for status in [
            IntentStatus::RequiresPaymentMethod,
            IntentStatus::Processing,
            IntentStatus::RequiresCapture,
            IntentStatus::Canceled,
        ] {
            let id = fx.intent(status.clone()).await;
            let err = issuer.issue(&acme(), &id).await.unwrap_err();
            match err {
                IssueError::PaymentNotSucceeded { intent_id, status: got } => {
                    assert_eq!(intent_id, id);
                    assert_eq!(got, status);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(fx.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_unknown_intent_is_collaborator_error() {
        let fx = Fixture::new();
        let err = fx.issuer(true).issue(&acme(), "pi_unknown").await.unwrap_err();
        assert!(matches!(err, IssueError::Collaborator(_)));
        assert_eq!(fx.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_unlimited_policy_issues_distinct_artifacts() {
        let fx = Fixture::new();
        let id = fx.intent(IntentStatus::Succeeded).await;
        let issuer = fx.issuer(true);

        let a = issuer.issue(&acme(), &id).await.unwrap();
        let b = issuer.issue(&acme(), &id).await.unwrap();

        assert_ne!(a.name(), b.name());
        assert_eq!(fx.files_on_disk(), 2);
    }

    #[tokio::test]
    async fn test_once_per_intent_policy_rejects_reuse() {
        let fx = Fixture::new();
        let id = fx.intent(IntentStatus::Succeeded).await;
        let issuer = fx.issuer(false).with_policy(IssuancePolicy::OncePerIntent);

        let first = issuer.issue(&acme(), &id).await;
        assert!(first.is_ok());

        let second = issuer.issue(&acme(), &id).await.unwrap_err();
        assert!(matches!(second, IssueError::AlreadyIssued { .. }));

        let other = fx.intent(IntentStatus::Succeeded).await;
        assert!(issuer.issue(&acme(), &other).await.is_ok());
    }

    #[tokio::test]
    async fn test_render_failure_releases_claim() {
        let fx = Fixture::new();
        let id = fx.intent(IntentStatus::Succeeded).await;
        let issuer = DocumentIssuer::new(
            fx.gateway.clone(),
            Arc::new(BrokenRenderer),
            ArtifactStore::new(fx.dir.path(), true),
        )
        .with_policy(IssuancePolicy::OncePerIntent);

        let err = issuer.issue(&acme(), &id).await.unwrap_err();
        assert!(matches!(err, IssueError::Render(_)));
        assert_eq!(err.user_message(), "Failed to generate PDF");
        assert!(!issuer.ledger.contains(&id));
        assert_eq!(fx.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_artifact_removed_after_drop() {
        let fx = Fixture::new();
        let id = fx.intent(IntentStatus::Succeeded).await;

        let artifact = fx.issuer(false).issue(&acme(), &id).await.unwrap();
        assert_eq!(fx.files_on_disk(), 1);
        drop(artifact);
        assert_eq!(fx.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_request_releases_claim_and_file() {
        let fx = Fixture::new();
        let id = fx.intent(IntentStatus::Succeeded).await;
        let issuer = fx.issuer(false).with_policy(IssuancePolicy::OncePerIntent);

        // Stop waiting as soon as the issuer first yields.
        let abandoned = tokio::time::timeout(Duration::ZERO, issuer.issue(&acme(), &id)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!issuer.ledger.contains(&id));
        assert_eq!(fx.files_on_disk(), 0);

        let retry = issuer.issue(&acme(), &id).await.unwrap();
        assert!(retry.path().exists());
        assert!(issuer.ledger.contains(&id));
    }

    #[tokio::test]
    async fn test_render_panic_is_unexpected_and_releases_claim() {
        let fx = Fixture::new();
        let id = fx.intent(IntentStatus::Succeeded).await;
        let issuer = DocumentIssuer::new(
            fx.gateway.clone(),
            Arc::new(PanickingRenderer),
            ArtifactStore::new(fx.dir.path(), false),
        )
        .with_policy(IssuancePolicy::OncePerIntent);

        let err = issuer.issue(&acme(), &id).await.unwrap_err();
        assert!(matches!(err, IssueError::Unexpected(_)));
        assert!(!issuer.ledger.contains(&id));
    }
}
