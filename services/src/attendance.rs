use chrono::{DateTime, Utc};
use db::models::attendance_record::{ActiveModel, AttendanceStatus, CheckInMethod};
use sea_orm::{ActiveValue::NotSet, Set};

/// Attendance row produced by an accepted scan.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub event_id: i64,
    pub user_id: i64,
    pub session_id: String,
    pub status: AttendanceStatus,
    pub method: CheckInMethod,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_meters: Option<f64>,
    pub device_fingerprint: Option<String>,
    pub client_ip: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

impl From<NewAttendance> for ActiveModel {
    fn from(a: NewAttendance) -> Self {
        ActiveModel {
            id: NotSet,
            event_id: Set(a.event_id),
            user_id: Set(a.user_id),
            session_id: Set(a.session_id),
            status: Set(a.status),
            check_in_method: Set(a.method),
            latitude: Set(a.latitude),
            longitude: Set(a.longitude),
            accuracy_meters: Set(a.accuracy_meters),
            device_fingerprint: Set(a.device_fingerprint),
            client_ip: Set(a.client_ip),
            checked_in_at: Set(a.checked_in_at),
        }
    }
}
