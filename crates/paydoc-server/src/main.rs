//! paydoc HTTP Server
//!
//! Axum server for a pay-then-download flow: create a charge intent, then
//! download a generated PDF once that intent has succeeded.

mod config;
mod handlers;
mod logging;
mod rate_limit;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use paydoc_issuance::{ArtifactStore, ChargeInitiator, DocumentIssuer};
use paydoc_payments::{ChargeGateway, MemoryGateway, StripeGateway};
use paydoc_pdf::PdfRenderer;

use crate::config::{AppConfig, PaymentBackend};
use crate::handlers::{
    confirm_demo_payment, create_payment_intent, generate_pdf, handle_panic, health_check,
};
use crate::rate_limit::{KeyedLimiter, RouteGuard, enforce};
use crate::state::AppState;

/// Rate-limit key for `POST /create-payment-intent/`
pub const CREATE_INTENT_ROUTE: &str = "create-payment-intent";
/// Rate-limit key for `POST /generate-pdf/`
pub const GENERATE_PDF_ROUTE: &str = "generate-pdf";

/// How often idle callers are dropped from the limiter
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("{}: {e}", e.user_message()))?;
    logging::init(&config.log)?;

    let (gateway, demo_gateway): (Arc<dyn ChargeGateway>, Option<Arc<MemoryGateway>>) =
        match &config.backend {
            PaymentBackend::Stripe { secret_key } => {
                (Arc::new(StripeGateway::new(secret_key)), None)
            }
            PaymentBackend::Memory => {
                tracing::warn!("Using in-memory payment gateway; nothing will be charged");
                let memory = Arc::new(MemoryGateway::new());
                (memory.clone(), Some(memory))
            }
        };

    let store = ArtifactStore::new(&config.artifact_dir, config.retain_artifacts);
    store
        .prepare()
        .await
        .with_context(|| format!("creating {}", store.dir().display()))?;

    let limiter = Arc::new(
        KeyedLimiter::new()
            .with_limit(CREATE_INTENT_ROUTE, config.create_intent_limit)
            .with_limit(GENERATE_PDF_ROUTE, config.generate_pdf_limit),
    );

    let sweeper = limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.sweep();
        }
    });

    let state = AppState {
        initiator: Arc::new(ChargeInitiator::new(gateway.clone(), config.pricing.clone())),
        issuer: Arc::new(
            DocumentIssuer::new(gateway, Arc::new(PdfRenderer::default()), store)
                .with_policy(config.issuance_policy),
        ),
        limiter,
        demo_gateway,
        config: Arc::new(config),
    };

    let addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(
        addr = %addr,
        backend = state.config.backend.name(),
        amount = state.config.pricing.amount,
        currency = %state.config.pricing.currency,
        policy = state.config.issuance_policy.as_str(),
        artifacts = %state.config.artifact_dir.display(),
        "paydoc server running"
    );
    tracing::info!("  POST /create-payment-intent/  limit {}", state.config.create_intent_limit);
    tracing::info!("  POST /generate-pdf/           limit {}", state.config.generate_pdf_limit);
    tracing::info!("  GET  /health");
    if state.demo_gateway.is_some() {
        tracing::info!("  POST /demo/confirm-payment/");
    }

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("paydoc server stopped");
    Ok(())
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let limiter = state.limiter.clone();
    let guard = |route: &'static str| RouteGuard::new(route, limiter.clone());

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/create-payment-intent/",
            post(create_payment_intent).route_layer(middleware::from_fn_with_state(
                guard(CREATE_INTENT_ROUTE),
                enforce,
            )),
        )
        .route(
            "/generate-pdf/",
            post(generate_pdf).route_layer(middleware::from_fn_with_state(
                guard(GENERATE_PDF_ROUTE),
                enforce,
            )),
        );

    if state.demo_gateway.is_some() {
        app = app.route("/demo/confirm-payment/", post(confirm_demo_payment));
    }

    app.layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
