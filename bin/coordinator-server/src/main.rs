//! # Configuration
//!
//! The server is configured through:
//! - Base configuration file (`base_config.ron`)
//! - Environment variables prefixed with `SETTLEMENT_` (override base config)
//!
//! ## Base Configuration
//!
//! The default configuration is loaded from `base_config.ron`:
//!
//! ```ron
//! Config(
//!     app: AppConfig(
//!         listen: "localhost:59159",
//!         cors_allowed_origins: ["*"],
//!     ),
//!     risk: RiskConfig(
//!         block_threshold: 0.8,
//!         score_scale: "unit",
//!     ),
//!     collaborators: CollaboratorsConfig(
//!         fraud_oracle_url: "http://localhost:9101",
//!         payment_gateway_url: "http://localhost:9102",
//!         notification_url: "http://localhost:9103",
//!         timeout: "10s",
//!     ),
//! )
//! ```
//!
//! ## Environment Variable Overrides
//!
//! Use double underscores (`__`) to override nested configuration fields:
//!
//! ```bash
//! # Override app config
//! export SETTLEMENT_APP__LISTEN="0.0.0.0:59159"
//!
//! # Configure CORS allowed origins
//! # For specific origins (recommended)
//! export SETTLEMENT_APP__CORS_ALLOWED_ORIGINS='["http://localhost:3000"]'
//!
//! # Override risk gate config
//! export SETTLEMENT_RISK__BLOCK_THRESHOLD="0.9"
//! export SETTLEMENT_RISK__SCORE_SCALE="percent"
//!
//! # Override collaborator endpoints
//! export SETTLEMENT_COLLABORATORS__FRAUD_ORACLE_URL="http://fraud.internal:8080"
//! export SETTLEMENT_COLLABORATORS__PAYMENT_GATEWAY_URL="http://payments.internal:8080"
//! export SETTLEMENT_COLLABORATORS__NOTIFICATION_URL="http://notify.internal:8080"
//! export SETTLEMENT_COLLABORATORS__TIMEOUT="30s"
//!
//! # Run the server
//! cargo run --bin settlement-coordinator-server
//! ```
//!
//! ## CORS Configuration
//!
//! The `cors_allowed_origins` field controls cross-origin resource sharing:
//! - **Empty array `[]`**: CORS is disabled
//! - **Specific origins**: Only listed origins are allowed (recommended for production)
//! - **Wildcard `["*"]`**: All origins are allowed (permissive mode, default for development)
//!
//! When specific origins are configured, the server allows:
//! - Methods: GET, POST, PUT, DELETE, OPTIONS
//! - Headers: Content-Type, Authorization
//! - Credentials: Enabled
//!
//! # Logging
//!
//! Logging is controlled via the `RUST_LOG` environment variable. Defaults to `info` level.
//!
//! The server logs:
//! - **HTTP requests**: Method, path, status code, and duration for all incoming requests
//! - **Client errors (4xx)**: Logged at `WARN` level with error details
//! - **Server errors (5xx)**: Logged at `ERROR` level with error details
//! - **Not found (404)**: Logged at `INFO` level

use core::str::FromStr;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use settlement_coordinator_server::{
    App,
    collaborators::{HttpFraudOracle, HttpNotifier, HttpPaymentGateway},
    config,
};
use settlement_coordinator_engine::{
    FraudOracle, IdGenerator, NotificationService, PaymentGateway, RiskGateConfig, ScoreScale,
    SettlementEngine, UuidGenerator,
};
use settlement_coordinator_store::SettlementStore;
use tokio::{net::TcpListener, task};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Subscriber, subscriber};
use tracing_subscriber::{EnvFilter, Registry, fmt::format::FmtSpan, layer::SubscriberExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = task::spawn_blocking(config::get_configuration).await??;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    subscriber::set_global_default(make_tracing_subscriber(env_filter))?;

    let app = {
        let client = reqwest::Client::builder().timeout(config.collaborators.timeout).build()?;

        let oracle: Arc<dyn FraudOracle> = Arc::new(
            HttpFraudOracle::builder()
                .client(client.clone())
                .base_url(config.collaborators.fraud_oracle_url)
                .build(),
        );

        let payments: Arc<dyn PaymentGateway> = Arc::new(
            HttpPaymentGateway::builder()
                .client(client.clone())
                .base_url(config.collaborators.payment_gateway_url)
                .build(),
        );

        let notifier: Arc<dyn NotificationService> = Arc::new(
            HttpNotifier::builder()
                .client(client)
                .base_url(config.collaborators.notification_url)
                .build(),
        );

        let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);

        let score_scale = parse_score_scale(&config.risk.score_scale)?;
        let risk_config = RiskGateConfig::builder()
            .block_threshold(config.risk.block_threshold)
            .score_scale(score_scale)
            .build();

        let engine = SettlementEngine::builder()
            .store(SettlementStore::new())
            .oracle(oracle)
            .risk_config(risk_config)
            .payments(payments)
            .notifier(notifier)
            .ids(ids)
            .build();

        App::builder().engine(engine.into()).build()
    };

    let axum_handle = {
        let router = settlement_coordinator_server::create_router(app);
        let cors = create_cors_layer(&config.app.cors_allowed_origins)?;
        let router = router.layer(TraceLayer::new_for_http()).layer(cors);

        let listener = TcpListener::bind(&config.app.listen)
            .await
            .inspect(|_| tracing::info!("server listening at {}", config.app.listen))?;

        tokio::spawn(async { axum::serve(listener, router).await })
    };

    axum_handle.await??;

    Ok(())
}

fn parse_score_scale(raw: &str) -> anyhow::Result<ScoreScale> {
    match raw {
        "unit" => Ok(ScoreScale::Unit),
        "percent" => Ok(ScoreScale::Percent),
        other => anyhow::bail!("unknown score scale {other:?}, expected \"unit\" or \"percent\""),
    }
}

fn create_cors_layer<S>(allowed_origins: &[S]) -> anyhow::Result<CorsLayer>
where
    S: AsRef<str>,
{
    if allowed_origins.iter().map(AsRef::as_ref).any(|s| s == "*") {
        return Ok(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .map(AsRef::as_ref)
        .map(FromStr::from_str)
        .collect::<Result<_, _>>()?;

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(cors)
}

fn make_tracing_subscriber(env_filter: EnvFilter) -> impl Subscriber {
    Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_line_number(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
        )
        .with(env_filter)
}
