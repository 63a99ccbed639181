use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use services::SessionResponse;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{ErrorResponse, engine_error_response};
use crate::state::AppState;

/// POST /api/events/{event_id}/qr/sessions
///
/// Mints a new QR session. The caller must own the event or hold an elevated
/// role.
///
/// ### Responses
/// - `201 Created` with the session, including `qr_payload` to render as-is
/// - `403 Forbidden` (`forbidden`) if the caller may not manage this event
/// - `404 Not Found` (`not_found`) if the event does not exist
/// - `409 Conflict` (`event_closed`) if the event is completed or cancelled
/// - `503 Service Unavailable` (`store_unavailable`)
pub async fn create_session(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ErrorResponse> {
    let session = state
        .engine()
        .sessions
        .generate(event_id, claims.sub, Utc::now())
        .await
        .map_err(|e| engine_error_response(&e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(session, "QR session created")),
    ))
}

/// POST /api/events/{event_id}/qr/sessions/refresh
///
/// Retires every active session of the event and mints a replacement.
/// Same authorization and error mapping as [`create_session`].
pub async fn refresh_session(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ErrorResponse> {
    let session = state
        .engine()
        .sessions
        .refresh(event_id, claims.sub, Utc::now())
        .await
        .map_err(|e| engine_error_response(&e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(session, "QR session refreshed")),
    ))
}
