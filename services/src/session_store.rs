//! Persistence seam for QR sessions.
//!
//! The lifecycle manager and the validator only talk to [`SessionStore`]; the
//! SQL-backed implementation lives on [`QrSessionRepository`].

use crate::attendance::NewAttendance;
use crate::error::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use db::models::qr_session::{ActiveModel, Model as QrSession};
use db::repositories::{Consumed, MarkUsed, QrSessionRepository};
use sea_orm::Set;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: QrSession) -> Result<QrSession, EngineError>;

    async fn get_by_id(&self, session_id: &str) -> Result<Option<QrSession>, EngineError>;

    /// Unused sessions of `event_id` that expire after `now`, newest first.
    async fn list_active(&self, event_id: i64, now: DateTime<Utc>) -> Result<Vec<QrSession>, EngineError>;

    /// Atomic single-use transition. Exactly one concurrent caller gets `Marked`.
    async fn mark_used(&self, session_id: &str, user_id: i64, now: DateTime<Utc>) -> Result<MarkUsed, EngineError>;

    /// `mark_used` and the attendance insert as one unit: either both land or
    /// neither does. The session, user and time come from `attendance`.
    async fn commit_checkin(&self, attendance: NewAttendance) -> Result<Consumed, EngineError>;

    async fn force_expire(&self, session_id: &str, now: DateTime<Utc>) -> Result<bool, EngineError>;

    async fn force_expire_active(&self, event_id: i64, now: DateTime<Utc>) -> Result<u64, EngineError>;

    /// Deletes sessions whose expiry is more than `retention` before `now`.
    async fn purge_expired_older_than(&self, retention: Duration, now: DateTime<Utc>) -> Result<u64, EngineError>;
}

#[async_trait]
impl SessionStore for QrSessionRepository {
    async fn create(&self, session: QrSession) -> Result<QrSession, EngineError> {
        let active = ActiveModel {
            session_id: Set(session.session_id),
            event_id: Set(session.event_id),
            created_by: Set(session.created_by),
            nonce: Set(session.nonce),
            signature: Set(session.signature),
            issued_at: Set(session.issued_at),
            signed_expires_at: Set(session.signed_expires_at),
            expires_at: Set(session.expires_at),
            used_at: Set(session.used_at),
            used_by_user_id: Set(session.used_by_user_id),
        };
        Ok(QrSessionRepository::create(self, active).await?)
    }

    async fn get_by_id(&self, session_id: &str) -> Result<Option<QrSession>, EngineError> {
        Ok(self.find_by_id(session_id).await?)
    }

    async fn list_active(&self, event_id: i64, now: DateTime<Utc>) -> Result<Vec<QrSession>, EngineError> {
        Ok(QrSessionRepository::list_active(self, event_id, now).await?)
    }

    async fn mark_used(&self, session_id: &str, user_id: i64, now: DateTime<Utc>) -> Result<MarkUsed, EngineError> {
        Ok(QrSessionRepository::mark_used(self, session_id, user_id, now).await?)
    }

    async fn commit_checkin(&self, attendance: NewAttendance) -> Result<Consumed, EngineError> {
        let session_id = attendance.session_id.clone();
        let (user_id, now) = (attendance.user_id, attendance.checked_in_at);
        Ok(self
            .consume_with_attendance(&session_id, user_id, now, attendance.into())
            .await?)
    }

    async fn force_expire(&self, session_id: &str, now: DateTime<Utc>) -> Result<bool, EngineError> {
        Ok(QrSessionRepository::force_expire(self, session_id, now).await?)
    }

    async fn force_expire_active(&self, event_id: i64, now: DateTime<Utc>) -> Result<u64, EngineError> {
        Ok(QrSessionRepository::force_expire_active(self, event_id, now).await?)
    }

    async fn purge_expired_older_than(&self, retention: Duration, now: DateTime<Utc>) -> Result<u64, EngineError> {
        Ok(self.purge_expired_before(now - retention).await?)
    }
}
