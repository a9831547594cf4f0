//! Per-request HTTP Basic authentication.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use picvault_core::models::User;
use picvault_core::AppError;
use std::sync::Arc;

/// The caller, authenticated from the `Authorization: Basic` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) = basic_credentials(&parts.headers)?;
        let user = state
            .authenticator
            .authenticate(&username, &password)
            .await?;
        Ok(AuthenticatedUser(user))
    }
}

/// Extract `(username, password)` from a Basic authorization header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), AppError> {
    let rejected = |msg: &str| AppError::AuthRejected(msg.to_string());

    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| rejected("Missing Authorization header"))?
        .to_str()
        .map_err(|_| rejected("Malformed Authorization header"))?;

    let (scheme, encoded) = value
        .split_once(' ')
        .ok_or_else(|| rejected("Malformed Authorization header"))?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(rejected("Only Basic authorization is supported"));
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| rejected("Malformed Basic credentials"))?;
    let decoded = String::from_utf8(decoded).map_err(|_| rejected("Malformed Basic credentials"))?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| rejected("Malformed Basic credentials"))?;

    Ok((username.to_string(), password.to_string()))
}
