use crate::models::verifier_secret::{ActiveModel, Column, Entity, Model};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct VerifierSecretRepository {
    db: DatabaseConnection,
}

impl VerifierSecretRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All key versions, newest first.
    pub async fn list_all(&self) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .order_by_desc(Column::RotationVersion)
            .all(&self.db)
            .await
    }

    /// Retires the current active key and stores `secret_hex` as the next
    /// version, in one transaction.
    pub async fn rotate(&self, secret_hex: &str, now: DateTime<Utc>) -> Result<Model, DbErr> {
        let txn = self.db.begin().await?;

        let latest = Entity::find()
            .order_by_desc(Column::RotationVersion)
            .one(&txn)
            .await?;
        let next_version = latest.map(|k| k.rotation_version + 1).unwrap_or(1);

        Entity::update_many()
            .col_expr(Column::RetiredAt, Expr::value(now))
            .filter(Column::RetiredAt.is_null())
            .exec(&txn)
            .await?;

        let created = ActiveModel {
            rotation_version: Set(next_version),
            secret_hex: Set(secret_hex.to_owned()),
            created_at: Set(now),
            retired_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(created)
    }
}
