use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Register a user (HTTP 201 with the new user).
#[tracing::instrument(skip(state, body), fields(operation = "register_user"))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Json(request) = body?;

    let user = state
        .authenticator
        .users()
        .create(request.username.trim(), &request.password)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}
