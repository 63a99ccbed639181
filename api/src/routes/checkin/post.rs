use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderValue, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use services::{Outcome, ScanAttempt};

use super::common::{CheckinRequest, CheckinResponse, RejectionBody, rejection_status};
use crate::auth::{AuthUser, ClientIp};
use crate::response::ApiResponse;
use crate::routes::common::engine_error_response;
use crate::state::AppState;

/// POST /api/checkin
///
/// Validates a scanned QR session for the authenticated user and records
/// attendance.
///
/// ### Request Body
/// ```json
/// {
///   "session_id": "3f1c9a52-6d2e-4a51-9a8e-0c7f1b2d4e6a",
///   "signature": "9b1f...",
///   "geo": { "latitude": 10.0, "longitude": 106.0, "accuracy_meters": 12.5 },
///   "device_info": { "fingerprint": "abc", "user_agent": "Mozilla/5.0" }
/// }
/// ```
///
/// ### Responses
/// - `200 OK` with the attendance record
/// - `404` `not_found`, `422` `bad_signature`, `410` `expired`,
///   `409` `already_used`, `403` `out_of_range` / `late`,
///   `429` `rate_limited` (with `Retry-After`)
/// - `503` `store_unavailable`; the scan was not accepted
pub async fn check_in(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    ClientIp(client_ip): ClientIp,
    Json(body): Json<CheckinRequest>,
) -> Response {
    let attempt = ScanAttempt {
        session_id: body.session_id,
        signature: body.signature,
        user_id: claims.sub,
        geo: body.geo,
        device: body.device_info,
        client_ip: client_ip.map(|ip| ip.to_string()),
    };

    let outcome = match state.engine().validator.validate(&attempt, Utc::now()).await {
        Ok(outcome) => outcome,
        Err(e) => return engine_error_response(&e).into_response(),
    };

    let (status, message) = rejection_status(&outcome);
    match outcome {
        Outcome::Accepted(record) => (
            status,
            Json(ApiResponse::success(CheckinResponse::from(record), message)),
        )
            .into_response(),
        rejected => {
            let retry_after_seconds = match rejected {
                Outcome::RejectedRateLimited { retry_after_seconds } => Some(retry_after_seconds),
                _ => None,
            };
            let body = RejectionBody {
                reason: rejected.reason().to_string(),
                retry_after_seconds,
            };

            let mut response = (status, Json(ApiResponse::failure(body, message))).into_response();
            if let Some(secs) = retry_after_seconds {
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(secs));
            }
            response
        }
    }
}

