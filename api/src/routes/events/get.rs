use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use services::SessionResponse;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{ErrorBody, ErrorResponse, engine_error_response};
use crate::state::AppState;

/// GET /api/events/{event_id}/qr/sessions/active
///
/// Newest usable session, for displays that poll on the refresh interval.
/// `404` with code `no_active_session` when every session has expired or
/// been used. `403` unless the caller owns the event or holds an elevated
/// role.
pub async fn get_active_session(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<Json<ApiResponse<SessionResponse>>, ErrorResponse> {
    let active = state
        .engine()
        .sessions
        .get_active(event_id, claims.sub, Utc::now())
        .await
        .map_err(|e| engine_error_response(&e))?;

    match active {
        Some(session) => Ok(Json(ApiResponse::success(session, "Active QR session"))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failure(
                ErrorBody {
                    code: "no_active_session".into(),
                },
                "No active QR session for this event",
            )),
        )),
    }
}
