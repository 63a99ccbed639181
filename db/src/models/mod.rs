pub mod attendance_record;
pub mod checkin_audit;
pub mod event;
pub mod qr_session;
pub mod rate_limit;
pub mod user;
pub mod verifier_secret;

pub use attendance_record::Entity as AttendanceRecord;
pub use checkin_audit::Entity as CheckinAudit;
pub use event::Entity as Event;
pub use qr_session::Entity as QrSession;
pub use rate_limit::Entity as RateLimit;
pub use user::Entity as User;
pub use verifier_secret::Entity as VerifierSecret;
