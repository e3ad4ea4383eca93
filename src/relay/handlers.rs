//! Relay endpoint handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::models::*;
use super::RelayState;
use crate::mock::mock_project;
use crate::types::{GenerationRequest, StatusRecord, SubmitReply};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn unavailable() -> ApiError {
    api_error(StatusCode::SERVICE_UNAVAILABLE, "Backend service unavailable")
}

/// POST /api/generate
///
/// Forwards a named project to the backend. When the backend cannot be
/// reached the relay answers with a locally generated project instead.
pub async fn generate(State(state): State<RelayState>, body: Bytes) -> Result<Response, ApiError> {
    let body: GenerateBody = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "unreadable generate body");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })?;

    let (name, description) = body.fields().ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "Name and description are required",
        )
    })?;

    let request = GenerationRequest::project(name, description).into_prompt();
    match state.client.submit(&request).await {
        Ok(SubmitReply::Accepted(ack)) => Ok(Json(GenerateResponse {
            request_id: ack.job_id,
            status: ack.status,
            message: ack.message,
        })
        .into_response()),
        Ok(SubmitReply::Mock(project)) => Ok(Json(project).into_response()),
        Err(e) => {
            warn!(error = %e, "backend not available, using mock data");
            Ok(Json(mock_project(name, description)).into_response())
        }
    }
}

/// GET /api/status/:id
pub async fn status(
    State(state): State<RelayState>,
    Path(id): Path<String>,
) -> Result<Json<StatusRecord>, ApiError> {
    if id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Request ID is required"));
    }
    state.client.status(&id).await.map(Json).map_err(|e| {
        warn!(request_id = %id, error = %e, "backend not available for status check");
        unavailable()
    })
}

/// GET /api/files
pub async fn files(State(state): State<RelayState>) -> Result<Json<FilesResponse>, ApiError> {
    state
        .client
        .list_files()
        .await
        .map(|files| Json(FilesResponse { files }))
        .map_err(|e| {
            warn!(error = %e, "backend not available for files");
            unavailable()
        })
}
