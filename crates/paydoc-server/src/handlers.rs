//! HTTP Handlers

use std::any::Any;

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use paydoc_issuance::IssueError;
use paydoc_pdf::DocumentFields;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payment_backend: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Intent status that blocked the request, for payment-required errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            status: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePdfParams {
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub payment_intent_id: String,
    pub status: String,
}

/// An [`IssueError`] on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError {
    err: IssueError,
    code: &'static str,
}

impl ApiError {
    /// A failure while starting a payment
    pub fn intent_creation(err: IssueError) -> Self {
        Self {
            err,
            code: "PAYMENT_INTENT_ERROR",
        }
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        let code = err.code();
        Self { err, code }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.err {
            IssueError::PaymentNotSucceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            IssueError::AlreadyIssued { .. } => StatusCode::CONFLICT,
            IssueError::Collaborator(_) | IssueError::Render(_) | IssueError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut body = ErrorResponse::new(self.err.user_message(), self.code);
        if let IssueError::PaymentNotSucceeded { status, .. } = &self.err {
            body.status = Some(status.to_string());
        }
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payment_backend: state.config.backend.name(),
    })
}

/// Start a payment and hand the client secret to the caller
pub async fn create_payment_intent(
    State(state): State<AppState>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let charge = state
        .initiator
        .initiate()
        .await
        .map_err(ApiError::intent_creation)?;

    Ok(Json(PaymentIntentResponse {
        client_secret: charge.client_secret,
    }))
}

/// Stream the rendered PDF once the referenced payment has succeeded
pub async fn generate_pdf(
    State(state): State<AppState>,
    Query(params): Query<GeneratePdfParams>,
    Json(fields): Json<DocumentFields>,
) -> Result<Response, ApiError> {
    let mut artifact = state
        .issuer
        .issue(&fields, &params.payment_intent_id)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.name());
    let body = artifact.take_bytes();

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Pay an intent on the in-memory backend using only its client secret
///
/// Mounted only when the memory backend is active.
pub async fn confirm_demo_payment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    let Some(gateway) = state.demo_gateway.as_ref() else {
        return Err(IssueError::Unexpected("demo confirmation without memory backend".into()).into());
    };

    let intent = gateway
        .confirm(&request.client_secret)
        .await
        .map_err(IssueError::from)?;
    tracing::info!(payment_intent_id = %intent.id, "Demo payment confirmed");

    Ok(Json(ConfirmPaymentResponse {
        payment_intent_id: intent.id,
        status: intent.status.to_string(),
    }))
}

/// Turn a handler panic into the generic internal error body
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error", "INTERNAL_ERROR")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::Request,
    };
    use paydoc_issuance::{ArtifactStore, ChargeInitiator, DocumentIssuer, IssuancePolicy};
    use paydoc_payments::{ChargeGateway, IntentStatus, MemoryGateway, Pricing};
    use paydoc_pdf::{PdfRenderer, read_text_lines};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::rate_limit::{KeyedLimiter, RateLimit};
    use crate::{CREATE_INTENT_ROUTE, GENERATE_PDF_ROUTE, router};

    struct Harness {
        gateway: Arc<MemoryGateway>,
        dir: tempfile::TempDir,
        app: Router,
    }

    impl Harness {
        fn new() -> Self {
            Self::with(MemoryGateway::new(), RateLimit::per_minute(100), IssuancePolicy::Unlimited)
        }

        fn with(gateway: MemoryGateway, limit: RateLimit, policy: IssuancePolicy) -> Self {
            let gateway = Arc::new(gateway);
            let dir = tempfile::tempdir().unwrap();
            let config = AppConfig::from_lookup(|key| match key {
                "PAYMENT_BACKEND" => Some("memory".into()),
                _ => None,
            })
            .unwrap();

            let state = AppState {
                config: Arc::new(config),
                initiator: Arc::new(ChargeInitiator::new(gateway.clone(), Pricing::default())),
                issuer: Arc::new(
                    DocumentIssuer::new(
                        gateway.clone(),
                        Arc::new(PdfRenderer::default()),
                        ArtifactStore::new(dir.path(), false),
                    )
                    .with_policy(policy),
                ),
                limiter: Arc::new(
                    KeyedLimiter::new()
                        .with_limit(CREATE_INTENT_ROUTE, limit)
                        .with_limit(GENERATE_PDF_ROUTE, limit),
                ),
                demo_gateway: Some(gateway.clone()),
            };

            Self {
                gateway,
                dir,
                app: router(state),
            }
        }

        async fn paid_intent(&self) -> String {
            let intent = self.gateway.create_intent(&Pricing::default()).await.unwrap();
            self.gateway
                .set_status(&intent.id, IntentStatus::Succeeded)
                .await
                .unwrap();
            intent.id
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.app.clone().oneshot(request).await.unwrap()
        }

        fn files_on_disk(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }
    }

    fn create_intent() -> Request<Body> {
        Request::post("/create-payment-intent/")
            .body(Body::empty())
            .unwrap()
    }

    fn generate(intent_id: &str, body: &str) -> Request<Body> {
        Request::post(format!("/generate-pdf/?payment_intent_id={intent_id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const ACME: &str = r#"{"Company Name": "Acme", "Tax ID": "123"}"#;

    #[tokio::test]
    async fn test_create_payment_intent_returns_secret() {
        let harness = Harness::new();

        let response = harness.send(create_intent()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        let secret = body["client_secret"].as_str().unwrap();
        assert!(!secret.is_empty());
        assert_eq!(harness.gateway.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_payment_intent_outage_is_500_without_secret() {
        let harness = Harness::with(
            MemoryGateway::unavailable(),
            RateLimit::per_minute(100),
            IssuancePolicy::Unlimited,
        );

        let response = harness.send(create_intent()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], "PAYMENT_INTENT_ERROR");
        assert!(body.get("client_secret").is_none());
    }

    #[tokio::test]
    async fn test_generate_pdf_for_paid_intent() {
        let harness = Harness::new();
        let id = harness.paid_intent().await;

        let response = harness.send(generate(&id, ACME)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");

        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\""));
        assert!(disposition.ends_with("_Business_Info.pdf\""));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let pages = read_text_lines(&bytes).unwrap();
        assert_eq!(
            pages[0],
            ["Business Information", "Company Name: Acme", "Tax ID: 123"]
        );
        assert_eq!(harness.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_generate_pdf_unpaid_is_402() {
        let harness = Harness::new();
        let intent = harness.gateway.create_intent(&Pricing::default()).await.unwrap();

        let response = harness.send(generate(&intent.id, ACME)).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json(response).await;
        assert_eq!(body["error"], "Payment required");
        assert_eq!(body["code"], "PAYMENT_REQUIRED");
        assert_eq!(body["status"], "requires_payment_method");
        assert_eq!(harness.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_generate_pdf_unknown_intent_is_500() {
        let harness = Harness::new();

        let response = harness.send(generate("pi_does_not_exist", ACME)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(body.get("status").is_none());
        assert_eq!(harness.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_demo_confirmation_unlocks_generate_pdf() {
        let harness = Harness::new();

        let secret = json(harness.send(create_intent()).await).await["client_secret"]
            .as_str()
            .unwrap()
            .to_string();

        let confirm = Request::post("/demo/confirm-payment/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"client_secret": "{secret}"}}"#)))
            .unwrap();
        let response = harness.send(confirm).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "succeeded");
        let id = body["payment_intent_id"].as_str().unwrap().to_string();
        assert!(secret.starts_with(&id));

        let response = harness.send(generate(&id, ACME)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_demo_confirmation_with_unknown_secret_is_500() {
        let harness = Harness::new();

        let confirm = Request::post("/demo/confirm-payment/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"client_secret": "pi_x_secret_y"}"#))
            .unwrap();
        let response = harness.send(confirm).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_generate_pdf_rejects_bad_requests_before_lookup() {
        let harness = Harness::new();
        let id = harness.paid_intent().await;

        let missing_param = Request::post("/generate-pdf/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(ACME))
            .unwrap();
        assert!(harness.send(missing_param).await.status().is_client_error());

        let not_an_object = harness.send(generate(&id, "[1, 2, 3]")).await;
        assert!(not_an_object.status().is_client_error());
        assert_eq!(harness.files_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_once_per_intent_policy_conflicts_on_reuse() {
        let harness = Harness::with(
            MemoryGateway::new(),
            RateLimit::per_minute(100),
            IssuancePolicy::OncePerIntent,
        );
        let id = harness.paid_intent().await;

        assert_eq!(harness.send(generate(&id, ACME)).await.status(), StatusCode::OK);

        let response = harness.send(generate(&id, ACME)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json(response).await["code"], "ALREADY_ISSUED");
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429() {
        let harness = Harness::with(
            MemoryGateway::new(),
            RateLimit::per_minute(2),
            IssuancePolicy::Unlimited,
        );

        for _ in 0..2 {
            assert_eq!(harness.send(create_intent()).await.status(), StatusCode::OK);
        }

        let response = harness.send(create_intent()).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(json(response).await["code"], "RATE_LIMITED");
        assert_eq!(harness.gateway.len().await, 2);

        let id = harness.paid_intent().await;
        assert_eq!(harness.send(generate(&id, ACME)).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let harness = Harness::with(
            MemoryGateway::new(),
            RateLimit::per_minute(1),
            IssuancePolicy::Unlimited,
        );

        for _ in 0..3 {
            let response = harness
                .send(Request::get("/health").body(Body::empty()).unwrap())
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = json(response).await;
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["payment_backend"], "memory");
        }
    }

    #[test]
    fn test_handle_panic_hides_detail() {
        let response = handle_panic(Box::new("secret detail".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
