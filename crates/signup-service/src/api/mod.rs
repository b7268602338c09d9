//! HTTP API for the signup service.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use crate::registration::RegistrationService;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RegistrationService>,
    /// Add the Secure attribute to session cookies
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(service: RegistrationService, cookie_secure: bool) -> Self {
        Self {
            service: Arc::new(service),
            cookie_secure,
        }
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(60))
}

/// Create the API router with a custom rate limit.
///
/// The limit applies to the signup routes only; `/health` is never throttled.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let signup = Router::new()
        .route(
            "/v1/signup/registration/generate-challenge",
            post(handlers::generate_challenge),
        )
        .route(
            "/v1/signup/registration/verify-challenge",
            post(handlers::verify_challenge),
        )
        .route("/v1/signup/registration/register", post(handlers::register))
        .route(
            "/v1/signup/registration/status",
            get(handlers::registration_status),
        )
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(signup)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
