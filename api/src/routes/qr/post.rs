use axum::{Json, extract::State};
use chrono::Utc;
use db::repositories::VerifierSecretRepository;
use serde::Serialize;

use crate::response::ApiResponse;
use crate::routes::common::{ErrorResponse, engine_error_response};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct RotateResponse {
    pub active_version: i32,
}

/// POST /api/qr/cleanup
///
/// Deletes QR sessions past the retention window. The same job runs on a
/// timer inside the server; this endpoint lets an operator trigger it.
pub async fn cleanup_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CleanupResponse>>, ErrorResponse> {
    let deleted = state
        .engine()
        .sessions
        .cleanup_expired(Utc::now())
        .await
        .map_err(|e| engine_error_response(&e))?;

    Ok(Json(ApiResponse::success(
        CleanupResponse { deleted },
        format!("Deleted {deleted} expired QR sessions"),
    )))
}

/// POST /api/qr/keys/rotate
///
/// Activates a fresh signing key. Sessions signed under the previous key keep
/// verifying until they expire.
pub async fn rotate_signing_key(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RotateResponse>>, ErrorResponse> {
    let repo = VerifierSecretRepository::new(state.db_clone());
    let active_version = state
        .signer()
        .rotate(&repo, Utc::now())
        .await
        .map_err(|e| engine_error_response(&e))?;

    Ok(Json(ApiResponse::success(
        RotateResponse { active_version },
        "Signing key rotated",
    )))
}
