use crate::models::rate_limit::{ActiveModel, Column, Entity, Model};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};

/// Atomic building blocks for the sliding-window limiter. Each method is one
/// statement; the limiter in `services` sequences them.
#[derive(Clone)]
pub struct RateLimitRepository {
    db: DatabaseConnection,
}

impl RateLimitRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn key(identifier: &str, action_type: &str) -> Condition {
        Condition::all()
            .add(Column::Identifier.eq(identifier))
            .add(Column::ActionType.eq(action_type))
    }

    pub async fn find(&self, identifier: &str, action_type: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Self::key(identifier, action_type))
            .one(&self.db)
            .await
    }

    /// Opens a window with a count of one. Returns false if a row already exists.
    pub async fn insert_if_absent(
        &self,
        identifier: &str,
        action_type: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let row = ActiveModel {
            id: NotSet,
            identifier: Set(identifier.to_owned()),
            action_type: Set(action_type.to_owned()),
            attempt_count: Set(1),
            window_start: Set(now),
            blocked_until: Set(None),
        };

        let inserted = Entity::insert(row)
            .on_conflict(
                OnConflict::columns([Column::Identifier, Column::ActionType])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match inserted {
            Ok(rows) => Ok(rows == 1),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Restarts the window if it began at or before `window_cutoff`.
    pub async fn reset_if_elapsed(
        &self,
        identifier: &str,
        action_type: &str,
        window_cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::AttemptCount, Expr::value(1))
            .col_expr(Column::WindowStart, Expr::value(now))
            .col_expr(Column::BlockedUntil, Expr::value(Option::<DateTime<Utc>>::None))
            .filter(Self::key(identifier, action_type))
            .filter(Column::WindowStart.lte(window_cutoff))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Increments the counter only while it is below `limit`. This is the
    /// compare-and-set that keeps two attempts at the boundary from both passing.
    pub async fn increment_below(
        &self,
        identifier: &str,
        action_type: &str,
        limit: i32,
    ) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(
                Column::AttemptCount,
                Expr::col(Column::AttemptCount).add(1),
            )
            .filter(Self::key(identifier, action_type))
            .filter(Column::AttemptCount.lt(limit))
            .filter(Column::BlockedUntil.is_null())
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    pub async fn block_until(
        &self,
        identifier: &str,
        action_type: &str,
        until: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::BlockedUntil, Expr::value(until))
            .filter(Self::key(identifier, action_type))
            .filter(Column::BlockedUntil.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
