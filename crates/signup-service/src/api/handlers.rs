//! HTTP request handlers.

use super::types::{
    ChallengeResponse, GenerateChallengeRequest, HealthResponse, RegisterRequest, StatusResponse,
    VerifyChallengeRequest,
};
use super::AppState;
use crate::error::SignupError;
use crate::session::{read_cookie, SessionCookie, TRANSACTION_ID, VERIFIED_TRANSACTION_ID};
use axum::{
    extract::State,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Issue a challenge for a new transaction or reissue one.
pub async fn generate_challenge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateChallengeRequest>,
) -> Result<Response, SignupError> {
    let token = cookie_token(&headers, TRANSACTION_ID);
    info!(regenerate = request.regenerate, "Challenge request received");

    let outcome = state
        .service
        .generate_challenge(request.into(), token.as_deref())
        .await?;

    with_cookies(
        ChallengeResponse {
            status: outcome.body,
        },
        &outcome.cookies,
        state.cookie_secure,
    )
}

/// Verify a challenge and rotate the session token.
pub async fn verify_challenge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyChallengeRequest>,
) -> Result<Response, SignupError> {
    let token = cookie_token(&headers, TRANSACTION_ID);

    let outcome = state
        .service
        .verify_challenge(request.into(), token.as_deref())
        .await?;

    with_cookies(
        ChallengeResponse {
            status: outcome.body,
        },
        &outcome.cookies,
        state.cookie_secure,
    )
}

/// Submit a registration for a verified transaction.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<StatusResponse>, SignupError> {
    let token = cookie_token(&headers, VERIFIED_TRANSACTION_ID);

    let status = state
        .service
        .register(request.into(), token.as_deref())
        .await?;

    Ok(Json(StatusResponse { status }))
}

/// Poll the provisioning status of a submitted registration.
pub async fn registration_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, SignupError> {
    let token = cookie_token(&headers, VERIFIED_TRANSACTION_ID);

    let status = state.service.registration_status(token.as_deref()).await?;

    Ok(Json(StatusResponse { status }))
}

fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| read_cookie(header, name))
}

fn with_cookies<T: Serialize>(
    body: T,
    cookies: &[SessionCookie],
    secure: bool,
) -> Result<Response, SignupError> {
    let mut response = Json(body).into_response();

    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie.header_value(secure))
            .map_err(|e| SignupError::Internal(format!("Invalid cookie value: {}", e)))?;
        response.headers_mut().append(SET_COOKIE, value);
    }

    Ok(response)
}
