//! BillSync server binary.
//!
//! Wires configuration, the Postgres store, and the Stripe gateway into
//! the Axum router and serves the API.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use billsync::adapters::http::billing::{billing_router, BillingAppState};
use billsync::adapters::postgres::PostgresSubscriptionStore;
use billsync::adapters::stripe::{StripeConfig, StripeGateway};
use billsync::config::AppConfig;
use billsync::domain::billing::TierResolver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    if config.is_production() && config.payment.is_test_mode() {
        tracing::warn!("Running in production with a Stripe test key");
    }

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!().run(&pool).await?;
    }

    let gateway = StripeGateway::new(StripeConfig::new(
        config.payment.stripe_api_key.clone(),
        config.payment.stripe_webhook_secret.clone(),
    ));

    let state = BillingAppState {
        subscription_store: Arc::new(PostgresSubscriptionStore::new(pool)),
        payment_provider: Arc::new(gateway),
        tier_resolver: Arc::new(TierResolver::new(config.payment.tier_mappings())),
        portal_return_url: config.payment.portal_return_url.clone(),
    };

    let app = Router::new()
        .nest("/api", billing_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .with_state(state);

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "BillSync listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
