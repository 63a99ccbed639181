//! Concrete repositories, one per table the check-in engine touches.
//!
//! Each repository owns a cloned `DatabaseConnection` and exposes only the
//! queries the engine needs. Every mutation that guards an invariant is a
//! single conditional statement so that concurrent callers cannot both win.

pub mod attendance_record_repository;
pub mod checkin_audit_repository;
pub mod event_repository;
pub mod qr_session_repository;
pub mod rate_limit_repository;
pub mod user_repository;
pub mod verifier_secret_repository;

pub use attendance_record_repository::AttendanceRecordRepository;
pub use checkin_audit_repository::CheckinAuditRepository;
pub use event_repository::EventRepository;
pub use qr_session_repository::{Consumed, MarkUsed, QrSessionRepository};
pub use rate_limit_repository::RateLimitRepository;
pub use user_repository::UserRepository;
pub use verifier_secret_repository::VerifierSecretRepository;
