use crate::models::checkin_audit::{ActiveModel, Column, Entity, Model};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder,
};

#[derive(Clone)]
pub struct CheckinAuditRepository {
    db: DatabaseConnection,
}

impl CheckinAuditRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, active_model: ActiveModel) -> Result<Model, DbErr> {
        active_model.insert(&self.db).await
    }

    pub async fn list_for_session(&self, session_id: &str) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
    }

    pub async fn list_for_actor(&self, actor_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::ActorId.eq(actor_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
    }
}
