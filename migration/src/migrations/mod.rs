pub mod m202510010001_create_users;
pub mod m202510010002_create_events;
pub mod m202510010003_create_qr_sessions;
pub mod m202510010004_create_attendance_records;
pub mod m202510010005_create_rate_limits;
pub mod m202510010006_create_verifier_secrets;
pub mod m202510010007_create_checkin_audit_log;
