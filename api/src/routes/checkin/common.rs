use axum::http::StatusCode;
use db::models::attendance_record::Model as AttendanceRecord;
use serde::{Deserialize, Serialize};
use services::{DeviceInfo, GeoFix, Outcome};

/// Body a scan client submits after decoding a QR code.
#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    pub session_id: String,
    pub signature: String,
    #[serde(default)]
    pub geo: Option<GeoFix>,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub attendance_id: i64,
    pub event_id: i64,
    pub status: String,
    pub check_in_method: String,
    pub checked_in_at: String,
}

impl From<AttendanceRecord> for CheckinResponse {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            attendance_id: r.id,
            event_id: r.event_id,
            status: r.status.to_string(),
            check_in_method: r.check_in_method.to_string(),
            checked_in_at: r.checked_in_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct RejectionBody {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Status code and human message for a rejected scan. Each reason keeps its
/// own code in the body even where statuses coincide.
pub fn rejection_status(outcome: &Outcome) -> (StatusCode, &'static str) {
    match outcome {
        Outcome::Accepted(_) => (StatusCode::OK, "Check-in recorded"),
        Outcome::RejectedNotFound => (StatusCode::NOT_FOUND, "QR session not found"),
        Outcome::RejectedBadSignature => (StatusCode::UNPROCESSABLE_ENTITY, "QR code signature is invalid"),
        Outcome::RejectedExpired => (StatusCode::GONE, "QR code has expired"),
        Outcome::RejectedUsed => (StatusCode::CONFLICT, "QR code has already been used"),
        Outcome::RejectedOutOfRange => (StatusCode::FORBIDDEN, "Check-in location is outside the allowed area"),
        Outcome::RejectedLate => (StatusCode::FORBIDDEN, "Late check-in is not allowed for this event"),
        Outcome::RejectedRateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "Too many check-in attempts"),
    }
}
