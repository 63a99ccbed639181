use crate::models::attendance_record;
use crate::models::qr_session::{ActiveModel, Column, Entity, Model};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};

/// Result of the compare-and-set in [`QrSessionRepository::mark_used`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkUsed {
    Marked,
    AlreadyUsed,
    Expired,
    NotFound,
}

/// Result of [`QrSessionRepository::consume_with_attendance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Consumed {
    Recorded(attendance_record::Model),
    Refused(MarkUsed),
}

#[derive(Clone)]
pub struct QrSessionRepository {
    db: DatabaseConnection,
}

impl QrSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, active_model: ActiveModel) -> Result<Model, DbErr> {
        active_model.insert(&self.db).await
    }

    pub async fn find_by_id(&self, session_id: &str) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(session_id.to_owned())
            .one(&self.db)
            .await
    }

    /// Unused, unexpired sessions of an event, newest first.
    pub async fn list_active(
        &self,
        event_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::ExpiresAt.gt(now))
            .filter(Column::UsedAt.is_null())
            .order_by_desc(Column::IssuedAt)
            .order_by_desc(Column::ExpiresAt)
            .all(&self.db)
            .await
    }

    /// Consumes a session for `user_id`.
    ///
    /// The update only matches a row that is still unused and unexpired, so of
    /// any number of racing callers exactly one observes `Marked`. The follow-up
    /// read only classifies why the update matched nothing.
    pub async fn mark_used(
        &self,
        session_id: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<MarkUsed, DbErr> {
        Self::mark_used_on(&self.db, session_id, user_id, now).await
    }

    /// Consumes the session and inserts its attendance row in one
    /// transaction. If the insert fails the session stays unused.
    pub async fn consume_with_attendance(
        &self,
        session_id: &str,
        user_id: i64,
        now: DateTime<Utc>,
        attendance: attendance_record::ActiveModel,
    ) -> Result<Consumed, DbErr> {
        let txn = self.db.begin().await?;

        let marked = Self::mark_used_on(&txn, session_id, user_id, now).await?;
        if marked != MarkUsed::Marked {
            txn.rollback().await?;
            return Ok(Consumed::Refused(marked));
        }

        let record = attendance.insert(&txn).await?;
        txn.commit().await?;
        Ok(Consumed::Recorded(record))
    }

    async fn mark_used_on<C: ConnectionTrait>(
        conn: &C,
        session_id: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<MarkUsed, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::UsedAt, Expr::value(now))
            .col_expr(Column::UsedByUserId, Expr::value(user_id))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::UsedAt.is_null())
            .filter(Column::ExpiresAt.gt(now))
            .exec(conn)
            .await?;

        if res.rows_affected == 1 {
            return Ok(MarkUsed::Marked);
        }

        let existing = Entity::find_by_id(session_id.to_owned()).one(conn).await?;
        Ok(match existing {
            None => MarkUsed::NotFound,
            Some(session) if session.is_used() => MarkUsed::AlreadyUsed,
            Some(_) => MarkUsed::Expired,
        })
    }

    /// Pulls `expires_at` back to `now`. Returns false if the session was
    /// missing or already past expiry.
    pub async fn force_expire(&self, session_id: &str, now: DateTime<Utc>) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::ExpiresAt, Expr::value(now))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::ExpiresAt.gt(now))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Force-expires every active session of an event. Rows are kept for audit.
    pub async fn force_expire_active(
        &self,
        event_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::ExpiresAt, Expr::value(now))
            .filter(Column::EventId.eq(event_id))
            .filter(Column::ExpiresAt.gt(now))
            .filter(Column::UsedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Deletes sessions that expired strictly before `cutoff`.
    pub async fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbErr> {
        let res = Entity::delete_many()
            .filter(Column::ExpiresAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use crate::test_utils::{seed_event, seed_user, setup_test_db};
    use chrono::{Duration, TimeZone};
    use sea_orm::Set;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap()
    }

    async fn insert(repo: &QrSessionRepository, id: &str, event_id: i64, issued: DateTime<Utc>) {
        repo.create(ActiveModel {
            session_id: Set(id.to_owned()),
            event_id: Set(event_id),
            created_by: Set(1),
            nonce: Set("00112233445566778899aabbccddeeff".into()),
            signature: Set("ab".repeat(32)),
            issued_at: Set(issued),
            signed_expires_at: Set(issued + Duration::seconds(30)),
            expires_at: Set(issued + Duration::seconds(30)),
            used_at: Set(None),
            used_by_user_id: Set(None),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn mark_used_succeeds_once() {
        let db = setup_test_db().await;
        let owner = seed_user(&db, "owner", UserRole::Organizer).await;
        let event = seed_event(&db, owner.id, t0()).await;
        let repo = QrSessionRepository::new(db.clone());
        insert(&repo, "s-1", event.id, t0()).await;

        let now = t0() + Duration::seconds(5);
        assert_eq!(repo.mark_used("s-1", 11, now).await.unwrap(), MarkUsed::Marked);
        assert_eq!(repo.mark_used("s-1", 12, now).await.unwrap(), MarkUsed::AlreadyUsed);

        let row = repo.find_by_id("s-1").await.unwrap().unwrap();
        assert_eq!(row.used_by_user_id, Some(11));
    }

    #[tokio::test]
    async fn mark_used_reports_expired_and_missing() {
        let db = setup_test_db().await;
        let owner = seed_user(&db, "owner", UserRole::Organizer).await;
        let event = seed_event(&db, owner.id, t0()).await;
        let repo = QrSessionRepository::new(db.clone());
        insert(&repo, "s-1", event.id, t0()).await;

        let at_expiry = t0() + Duration::seconds(30);
        assert_eq!(repo.mark_used("s-1", 11, at_expiry).await.unwrap(), MarkUsed::Expired);
        assert_eq!(repo.mark_used("nope", 11, t0()).await.unwrap(), MarkUsed::NotFound);
    }

    fn attendance_row(session_id: &str, user_id: i64, event_id: i64) -> attendance_record::ActiveModel {
        use attendance_record::{AttendanceStatus, CheckInMethod};
        attendance_record::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            event_id: Set(event_id),
            user_id: Set(user_id),
            session_id: Set(session_id.to_owned()),
            status: Set(AttendanceStatus::Present),
            check_in_method: Set(CheckInMethod::Wifi),
            latitude: Set(None),
            longitude: Set(None),
            accuracy_meters: Set(None),
            device_fingerprint: Set(None),
            client_ip: Set(None),
            checked_in_at: Set(t0() + Duration::seconds(5)),
        }
    }

    #[tokio::test]
    async fn consume_records_attendance_once() {
        let db = setup_test_db().await;
        let owner = seed_user(&db, "owner", UserRole::Organizer).await;
        let attendee = seed_user(&db, "attendee", UserRole::Participant).await;
        let event = seed_event(&db, owner.id, t0()).await;
        let repo = QrSessionRepository::new(db.clone());
        insert(&repo, "s-1", event.id, t0()).await;

        let now = t0() + Duration::seconds(5);
        let first = repo
            .consume_with_attendance("s-1", attendee.id, now, attendance_row("s-1", attendee.id, event.id))
            .await
            .unwrap();
        assert!(matches!(first, Consumed::Recorded(ref r) if r.user_id == attendee.id));

        let second = repo
            .consume_with_attendance("s-1", attendee.id, now, attendance_row("s-1", attendee.id, event.id))
            .await
            .unwrap();
        assert_eq!(second, Consumed::Refused(MarkUsed::AlreadyUsed));
    }

    #[tokio::test]
    async fn failed_attendance_insert_leaves_session_unused() {
        let db = setup_test_db().await;
        let owner = seed_user(&db, "owner", UserRole::Organizer).await;
        let event = seed_event(&db, owner.id, t0()).await;
        let repo = QrSessionRepository::new(db.clone());
        insert(&repo, "s-1", event.id, t0()).await;

        let now = t0() + Duration::seconds(5);
        let missing_user = 4242;
        assert!(repo
            .consume_with_attendance("s-1", missing_user, now, attendance_row("s-1", missing_user, event.id))
            .await
            .is_err());

        let row = repo.find_by_id("s-1").await.unwrap().unwrap();
        assert!(row.used_at.is_none());
        assert!(row.used_by_user_id.is_none());
    }

    #[tokio::test]
    async fn list_active_is_newest_first_and_skips_retired() {
        let db = setup_test_db().await;
        let owner = seed_user(&db, "owner", UserRole::Organizer).await;
        let event = seed_event(&db, owner.id, t0()).await;
        let repo = QrSessionRepository::new(db.clone());
        insert(&repo, "old", event.id, t0()).await;
        insert(&repo, "new", event.id, t0() + Duration::seconds(10)).await;
        insert(&repo, "gone", event.id, t0() + Duration::seconds(11)).await;
        assert!(repo.force_expire("gone", t0() + Duration::seconds(12)).await.unwrap());

        let now = t0() + Duration::seconds(15);
        let active: Vec<String> = repo
            .list_active(event.id, now)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(active, vec!["new".to_string(), "old".to_string()]);

        assert_eq!(repo.force_expire_active(event.id, now).await.unwrap(), 2);
        assert!(repo.list_active(event.id, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_only_touches_rows_past_cutoff() {
        let db = setup_test_db().await;
        let owner = seed_user(&db, "owner", UserRole::Organizer).await;
        let event = seed_event(&db, owner.id, t0()).await;
        let repo = QrSessionRepository::new(db.clone());
        insert(&repo, "a", event.id, t0()).await;
        insert(&repo, "b", event.id, t0() + Duration::hours(2)).await;

        let cutoff = t0() + Duration::hours(1);
        assert_eq!(repo.purge_expired_before(cutoff).await.unwrap(), 1);
        assert_eq!(repo.purge_expired_before(cutoff).await.unwrap(), 0);
        assert!(repo.find_by_id("b").await.unwrap().is_some());
    }
}
