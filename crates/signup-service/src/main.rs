//! Signup Service - Entry point.

use anyhow::Context;
use identity_client::IdentityClient;
use signup_service::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    captcha,
    config::{Config, LogConfig},
    notification::{NotificationDispatcher, SmsNotificationSender},
    registration::{
        CacheTransactionStore, IdentityOrchestrator, NumericChallenge, RegistrationService,
        ServiceSettings,
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use transaction_cache::TtlCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.log);

    info!("Starting Signup Service");

    let cache = TtlCache::with_sweeper(config.transaction.sweep_interval);
    let store = CacheTransactionStore::new(cache);

    let identity_client = IdentityClient::with_endpoints(
        &config.identity.base_url,
        config.identity_endpoints(),
        config.identity.timeout,
    )
    .context("Failed to create identity client")?;
    info!(base_url = %identity_client.base_url(), "Identity backend configured");

    let notifications = NotificationDispatcher::new(
        Arc::new(SmsNotificationSender::new(identity_client.clone())),
        config.notification.clone(),
    );
    let captcha = captcha::from_config(&config.captcha).context("Failed to set up captcha")?;

    let service = RegistrationService::new(
        Arc::new(store),
        Arc::from(captcha),
        Arc::new(NumericChallenge::new(config.challenge.length)),
        IdentityOrchestrator::new(identity_client, &config.identity),
        notifications,
        ServiceSettings::from_config(&config),
    );

    let state = AppState::new(service, config.cookie.secure);
    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);
    let app = create_router_with_rate_limit(state, rate_limit);

    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .context("Invalid server.listen_addr")?,
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    info!("Shutting down...");
    Ok(())
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
