use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct ArchiveHealth {
    pending: usize,
    in_flight: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<ArchiveHealth>,
}

/// Liveness probe - process is running.
pub async fn liveness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let archive = state.archive_channel.as_ref().map(|channel| ArchiveHealth {
        pending: channel.pending(),
        in_flight: channel.in_flight(),
    });

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "alive",
            archive,
        }),
    )
}
